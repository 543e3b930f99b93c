//! Runtime authority configuration.
//!
//! All limits are tunable; the defaults model a 64-bit workstation runtime.

use crate::latency::LatencyMode;

/// Largest total budget a no-GC region may ever request (256 MiB).
pub const DEFAULT_MAX_NO_GC_REGION_BYTES: i64 = 256 * 1024 * 1024;
/// Budget the runtime can actually commit for a no-GC region (64 MiB).
pub const DEFAULT_COMMITTABLE_BYTES: i64 = 64 * 1024 * 1024;
/// Bytes allocated between full collections (32 MiB).
pub const DEFAULT_FULL_COLLECTION_BUDGET: i64 = 32 * 1024 * 1024;

/// Configuration for a [`RuntimeAuthority`](crate::RuntimeAuthority).
///
/// # Example
///
/// ```
/// use gc_governor::{LatencyMode, RuntimeConfig};
///
/// let config = RuntimeConfig::default()
///     .with_initial_latency_mode(LatencyMode::Batch)
///     .with_committable_bytes(1024 * 1024);
/// assert_eq!(config.initial_latency_mode, LatencyMode::Batch);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Latency mode the authority starts in.
    ///
    /// `NoGCRegion` is only entered through a region; as an initial mode it
    /// is replaced by `Interactive`.
    ///
    /// Default: `Interactive`
    pub initial_latency_mode: LatencyMode,

    /// Upper bound for a no-GC region's total budget.
    ///
    /// Requests above this are rejected as out of range.
    ///
    /// Default: 256 MiB
    pub max_no_gc_region_bytes: i64,

    /// Budget the runtime can commit up front for a no-GC region.
    ///
    /// Requests within `max_no_gc_region_bytes` but above this are refused
    /// (`try_start_no_gc_region` returns `Ok(false)`).
    ///
    /// Default: 64 MiB
    pub committable_bytes: i64,

    /// Bytes allocated since the last full collection at which the next one is due.
    ///
    /// Drives the allocation-based approach notification.
    ///
    /// Default: 32 MiB
    pub full_collection_budget: i64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            initial_latency_mode: LatencyMode::Interactive,
            max_no_gc_region_bytes: DEFAULT_MAX_NO_GC_REGION_BYTES,
            committable_bytes: DEFAULT_COMMITTABLE_BYTES,
            full_collection_budget: DEFAULT_FULL_COLLECTION_BUDGET,
        }
    }
}

impl RuntimeConfig {
    /// Set the starting latency mode.
    ///
    /// `NoGCRegion` is replaced by the default mode.
    #[must_use]
    pub const fn with_initial_latency_mode(mut self, mode: LatencyMode) -> Self {
        self.initial_latency_mode = match mode {
            LatencyMode::NoGCRegion => LatencyMode::Interactive,
            other => other,
        };
        self
    }

    /// Set the largest admissible no-GC region budget.
    #[must_use]
    pub const fn with_max_no_gc_region_bytes(mut self, bytes: i64) -> Self {
        self.max_no_gc_region_bytes = bytes;
        self
    }

    /// Set the committable no-GC region budget.
    #[must_use]
    pub const fn with_committable_bytes(mut self, bytes: i64) -> Self {
        self.committable_bytes = bytes;
        self
    }

    /// Set the allocation budget between full collections.
    #[must_use]
    pub const fn with_full_collection_budget(mut self, bytes: i64) -> Self {
        self.full_collection_budget = bytes;
        self
    }
}
