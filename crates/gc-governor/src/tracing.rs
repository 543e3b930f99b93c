//! GC control tracing support.
//!
//! When the `tracing` feature is enabled, this module provides structured
//! spans and events for registration, waits, no-GC regions and collections.
//! Without the feature every helper compiles to nothing.

#[cfg(feature = "tracing")]
pub mod internal {
    use tracing::{span, Level};

    use crate::latency::LatencyMode;
    use crate::metrics::CollectionId;
    use crate::notification::{FullGcPhase, WaitOutcome};
    use crate::region::AbnormalExit;
    use crate::CollectionMode;

    /// Guard returned by span helpers.
    pub type SpanGuard = span::EnteredSpan;

    /// Log a full-GC notification registration.
    pub fn log_registered(max_generation: i32, max_bytes: i64, replaced: bool) {
        tracing::debug!(max_generation, max_bytes, replaced, "full_gc_registered");
    }

    /// Log a cancellation request.
    pub fn log_cancelled(had_registration: bool) {
        tracing::debug!(had_registration, "full_gc_cancelled");
    }

    /// Create a span covering one blocking wait.
    pub fn trace_wait(phase: FullGcPhase, timeout_millis: i32) -> SpanGuard {
        span!(
            Level::DEBUG,
            "full_gc_wait",
            phase = ?phase,
            timeout_millis
        )
        .entered()
    }

    /// Log how a wait resolved.
    pub fn log_wait_outcome(outcome: WaitOutcome) {
        tracing::debug!(outcome = ?outcome, "wait_resolved");
    }

    /// Log a phase signal and whether a registration received it.
    pub fn log_phase_signalled(phase: FullGcPhase, delivered: bool) {
        tracing::debug!(phase = ?phase, delivered, "phase_signalled");
    }

    /// Log admission of a no-GC region.
    pub fn log_region_started(
        total_bytes: i64,
        loh_bytes: Option<i64>,
        disallow_full_gc: bool,
        prior: LatencyMode,
    ) {
        tracing::debug!(
            total_bytes,
            loh_bytes = ?loh_bytes,
            disallow_full_gc,
            prior = ?prior,
            "no_gc_region_started"
        );
    }

    /// Log a region request that could not be committed.
    pub fn log_region_refused(total_bytes: i64, committable_bytes: i64) {
        tracing::debug!(total_bytes, committable_bytes, "no_gc_region_refused");
    }

    /// Log a normal region exit.
    pub fn log_region_ended(restored: LatencyMode) {
        tracing::debug!(restored = ?restored, "no_gc_region_ended");
    }

    /// Log a region torn down before `end` was called.
    pub fn log_region_exited_abnormally(cause: AbnormalExit, restored: LatencyMode) {
        tracing::warn!(cause = ?cause, restored = ?restored, "no_gc_region_aborted");
    }

    /// Log a latency mode assignment.
    pub fn log_latency_mode_changed(from: LatencyMode, to: LatencyMode) {
        tracing::debug!(from = ?from, to = ?to, "latency_mode_changed");
    }

    /// Create a span for one collection.
    pub fn trace_collection(generation: u8, mode: CollectionMode, id: CollectionId) -> SpanGuard {
        span!(
            Level::DEBUG,
            "gc_collect",
            generation,
            mode = ?mode,
            collection_id = id.0
        )
        .entered()
    }

    /// Log a collection deferred by the latency mode.
    pub fn log_collection_deferred(generation: u8, latency: LatencyMode) {
        tracing::debug!(generation, latency = ?latency, "collection_deferred");
    }

    /// Log authority shutdown.
    pub fn log_shutdown(woken_waiters: usize) {
        tracing::debug!(woken_waiters, "runtime_authority_shutdown");
    }
}

#[cfg(not(feature = "tracing"))]
#[allow(clippy::missing_const_for_fn)]
pub mod internal {
    use crate::latency::LatencyMode;
    use crate::metrics::CollectionId;
    use crate::notification::{FullGcPhase, WaitOutcome};
    use crate::region::AbnormalExit;
    use crate::CollectionMode;

    /// Stub guard when tracing is disabled.
    #[derive(Debug)]
    pub struct SpanGuard;

    /// Stub function when tracing is disabled.
    #[inline]
    pub fn log_registered(_max_generation: i32, _max_bytes: i64, _replaced: bool) {}

    /// Stub function when tracing is disabled.
    #[inline]
    pub fn log_cancelled(_had_registration: bool) {}

    /// Stub function when tracing is disabled.
    #[inline]
    pub fn trace_wait(_phase: FullGcPhase, _timeout_millis: i32) -> SpanGuard {
        SpanGuard
    }

    /// Stub function when tracing is disabled.
    #[inline]
    pub fn log_wait_outcome(_outcome: WaitOutcome) {}

    /// Stub function when tracing is disabled.
    #[inline]
    pub fn log_phase_signalled(_phase: FullGcPhase, _delivered: bool) {}

    /// Stub function when tracing is disabled.
    #[inline]
    pub fn log_region_started(
        _total_bytes: i64,
        _loh_bytes: Option<i64>,
        _disallow_full_gc: bool,
        _prior: LatencyMode,
    ) {
    }

    /// Stub function when tracing is disabled.
    #[inline]
    pub fn log_region_refused(_total_bytes: i64, _committable_bytes: i64) {}

    /// Stub function when tracing is disabled.
    #[inline]
    pub fn log_region_ended(_restored: LatencyMode) {}

    /// Stub function when tracing is disabled.
    #[inline]
    pub fn log_region_exited_abnormally(_cause: AbnormalExit, _restored: LatencyMode) {}

    /// Stub function when tracing is disabled.
    #[inline]
    pub fn log_latency_mode_changed(_from: LatencyMode, _to: LatencyMode) {}

    /// Stub function when tracing is disabled.
    #[inline]
    pub fn trace_collection(_generation: u8, _mode: CollectionMode, _id: CollectionId) -> SpanGuard {
        SpanGuard
    }

    /// Stub function when tracing is disabled.
    #[inline]
    pub fn log_collection_deferred(_generation: u8, _latency: LatencyMode) {}

    /// Stub function when tracing is disabled.
    #[inline]
    pub fn log_shutdown(_woken_waiters: usize) {}
}

pub use internal::*;
