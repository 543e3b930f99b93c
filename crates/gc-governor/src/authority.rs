//! The runtime authority.
//!
//! Owns the notification registry, the no-GC region controller (and with it
//! the latency mode), the generation table and the collection counters.
//! Each part has its own lock and no code path holds two at once.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::generation::{Generation, GenerationTable, TrackedRef};
use crate::latency::LatencyMode;
use crate::metrics::{CollectionCounters, CollectionReport};
use crate::notification::{FullGcNotifications, WaitOutcome};
use crate::region::{AbnormalExit, AllocationKind, NoGcRegionRequest, NoGcRegions};

/// How insistently a collection is requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CollectionMode {
    /// Runtime decides; deferred under `LowLatency`.
    #[default]
    Default,
    /// Always performed.
    Forced,
    /// Deferred under `LowLatency` and `SustainedLowLatency`.
    Optimized,
}

/// Process-level GC control surface, explicitly owned.
///
/// Construct one per runtime (or per test) and share it through `Arc`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
/// use gc_governor::{RuntimeAuthority, WaitOutcome};
///
/// let authority = Arc::new(RuntimeAuthority::default());
/// authority.register_for_full_gc_notification(2, 0).unwrap();
///
/// let canceller = {
///     let authority = Arc::clone(&authority);
///     thread::spawn(move || authority.cancel_full_gc_notification())
/// };
/// let outcome = authority.wait_for_full_gc_approach(-1).unwrap();
/// canceller.join().unwrap();
/// assert_eq!(outcome, WaitOutcome::Canceled);
/// ```
#[derive(Debug)]
pub struct RuntimeAuthority {
    config: RuntimeConfig,
    notifications: FullGcNotifications,
    regions: NoGcRegions,
    generations: GenerationTable,
    counters: CollectionCounters,
    allocated_since_full: AtomicU64,
}

impl Default for RuntimeAuthority {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl RuntimeAuthority {
    /// Create an authority with `config`.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            regions: NoGcRegions::new(&config),
            config,
            notifications: FullGcNotifications::new(),
            generations: GenerationTable::new(),
            counters: CollectionCounters::new(),
            allocated_since_full: AtomicU64::new(0),
        }
    }

    /// The configuration this authority was built with.
    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The notification registry, for collector-side signalling.
    #[must_use]
    pub const fn notifications(&self) -> &FullGcNotifications {
        &self.notifications
    }

    /// The no-GC region controller.
    #[must_use]
    pub const fn regions(&self) -> &NoGcRegions {
        &self.regions
    }

    // ------------------------------------------------------------------
    // Full-GC notifications
    // ------------------------------------------------------------------

    /// Register for full-GC notifications, replacing any prior registration.
    ///
    /// # Errors
    ///
    /// Out-of-range thresholds; [`GcError::ShutDown`](crate::GcError::ShutDown).
    pub fn register_for_full_gc_notification(
        &self,
        max_generation: i32,
        max_bytes: i64,
    ) -> Result<()> {
        self.notifications.register(max_generation, max_bytes)
    }

    /// Block until a full collection approaches.
    ///
    /// # Errors
    ///
    /// See [`FullGcNotifications::wait`].
    pub fn wait_for_full_gc_approach(&self, timeout_millis: i32) -> Result<WaitOutcome> {
        self.notifications.wait_for_approach(timeout_millis)
    }

    /// Block until a full collection completes.
    ///
    /// # Errors
    ///
    /// See [`FullGcNotifications::wait`].
    pub fn wait_for_full_gc_complete(&self, timeout_millis: i32) -> Result<WaitOutcome> {
        self.notifications.wait_for_complete(timeout_millis)
    }

    /// Cancel the live registration and wake its waiters.
    pub fn cancel_full_gc_notification(&self) {
        self.notifications.cancel();
    }

    // ------------------------------------------------------------------
    // No-GC regions and latency mode
    // ------------------------------------------------------------------

    /// Try to enter a no-GC region.
    ///
    /// # Errors
    ///
    /// See [`NoGcRegions::try_start`].
    pub fn try_start_no_gc_region(&self, request: NoGcRegionRequest) -> Result<bool> {
        self.regions.try_start(request)
    }

    /// Leave the live no-GC region.
    ///
    /// # Errors
    ///
    /// See [`NoGcRegions::end`].
    pub fn end_no_gc_region(&self) -> Result<()> {
        self.regions.end()
    }

    /// Current latency mode.
    #[must_use]
    pub fn latency_mode(&self) -> LatencyMode {
        self.regions.latency_mode()
    }

    /// Assign the latency mode.
    ///
    /// # Errors
    ///
    /// See [`NoGcRegions::set_latency_mode`].
    pub fn set_latency_mode(&self, mode: LatencyMode) -> Result<()> {
        self.regions.set_latency_mode(mode)
    }

    // ------------------------------------------------------------------
    // Collector-facing bookkeeping
    // ------------------------------------------------------------------

    /// Account for an allocation.
    ///
    /// Charges the live no-GC region (ending it on overrun) and advances
    /// the full-collection budget, raising an approach notification once the
    /// remaining budget is within the registration's byte threshold.
    pub fn record_allocation(&self, bytes: u64, kind: AllocationKind) -> Option<AbnormalExit> {
        let aborted = self.regions.record_allocation(bytes, kind);

        let since_full = self
            .allocated_since_full
            .fetch_add(bytes, Ordering::Relaxed)
            .saturating_add(bytes);
        let since_full = i64::try_from(since_full).unwrap_or(i64::MAX);
        let remaining = self.config.full_collection_budget.saturating_sub(since_full);
        self.notifications.observe_remaining_budget(remaining);

        aborted
    }

    /// Run the bookkeeping of a collection of `generation` and every younger one.
    ///
    /// A collection that counts as full for the live registration raises
    /// [`FullGcPhase::Approach`](crate::FullGcPhase::Approach) before and
    /// [`FullGcPhase::Complete`](crate::FullGcPhase::Complete) after.
    /// Inside a no-GC region the collection ends the region.
    ///
    /// # Errors
    ///
    /// [`GcError::FullCollectionDisallowed`](crate::GcError::FullCollectionDisallowed)
    /// for a full collection inside a region that disallows it.
    pub fn collect(&self, generation: Generation, mode: CollectionMode) -> Result<CollectionReport> {
        let id = self.counters.next_id();
        let _span = crate::tracing::trace_collection(generation.value(), mode, id);
        let start = Instant::now();

        let latency = self.latency_mode();
        if generation.is_max() && latency.defers_full_collection(mode) {
            crate::tracing::log_collection_deferred(generation.value(), latency);
            let report = CollectionReport {
                id,
                generation,
                mode,
                performed: false,
                notified: false,
                referents_pruned: 0,
                referents_promoted: 0,
                duration: start.elapsed(),
            };
            self.counters.record(report);
            return Ok(report);
        }

        self.regions.on_collection(generation)?;

        let notified = self.notifications.is_full_for_registration(generation);
        if notified {
            self.notifications.signal_approach();
        }
        let aging = self.generations.age(generation);
        if generation.is_max() {
            self.allocated_since_full.store(0, Ordering::Relaxed);
            self.notifications.reset_budget_cycle();
        }
        if notified {
            self.notifications.signal_complete();
        }

        let report = CollectionReport {
            id,
            generation,
            mode,
            performed: true,
            notified,
            referents_pruned: aging.pruned,
            referents_promoted: aging.promoted,
            duration: start.elapsed(),
        };
        self.counters.record(report);
        Ok(report)
    }

    /// Full forced collection.
    ///
    /// # Errors
    ///
    /// See [`collect`](Self::collect).
    pub fn collect_full(&self) -> Result<CollectionReport> {
        self.collect(Generation::OLD, CollectionMode::Forced)
    }

    /// Number of performed collections that covered `generation`.
    #[must_use]
    pub fn collection_count(&self, generation: Generation) -> usize {
        self.counters.count(generation)
    }

    /// Report of the most recent `collect` call.
    #[must_use]
    pub fn last_collection(&self) -> Option<CollectionReport> {
        self.counters.last()
    }

    /// Number of collections the latency mode deferred.
    #[must_use]
    pub fn deferred_collections(&self) -> usize {
        self.counters.deferred()
    }

    /// Bytes recorded since the last full collection.
    #[must_use]
    pub fn allocated_since_full_collection(&self) -> u64 {
        self.allocated_since_full.load(Ordering::Relaxed)
    }

    // ------------------------------------------------------------------
    // Generation queries
    // ------------------------------------------------------------------

    /// Start tracking `referent` for generation queries.
    pub fn track<T: Any + Send + Sync>(&self, referent: &Arc<T>) -> TrackedRef {
        self.generations.track(referent)
    }

    /// Generation of a tracked referent.
    ///
    /// # Errors
    ///
    /// See [`GenerationTable::generation_of`].
    pub fn generation_of(&self, tracked: &TrackedRef) -> Result<Generation> {
        self.generations.generation_of(tracked)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Shut the notification registry down, failing in-flight waits.
    ///
    /// Returns the number of waiters woken. Idempotent.
    pub fn shutdown(&self) -> usize {
        self.notifications.shutdown()
    }
}
