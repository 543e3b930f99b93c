//! No-GC region admission control.
//!
//! A region reserves an allocation budget during which the collector stays
//! out of the way. The controller owns the latency mode while a region is
//! live: the mode reads `NoGCRegion` exactly when a region is active, and
//! both live under one lock so no caller can observe one without the other.
//!
//! State machine:
//!
//! ```text
//!          try_start (admitted)
//!   Idle ------------------------> Active
//!    ^                               |
//!    +------- end / abnormal exit ---+
//! ```
//!
//! `try_start` in `Active` and `end` in `Idle` are errors, never transitions.

use std::fmt;

use parking_lot::Mutex;

use crate::config::RuntimeConfig;
use crate::error::{GcError, Result};
use crate::generation::Generation;
use crate::latency::LatencyMode;

/// Parameters for a no-GC region.
///
/// # Example
///
/// ```
/// use gc_governor::NoGcRegionRequest;
///
/// let request = NoGcRegionRequest::new(4096)
///     .with_loh_size(1024)
///     .disallow_full_gc(true);
/// assert_eq!(request.total_bytes(), 4096);
/// assert_eq!(request.loh_bytes(), Some(1024));
/// assert!(request.full_gc_disallowed());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoGcRegionRequest {
    total_bytes: i64,
    loh_bytes: Option<i64>,
    disallow_full_gc: bool,
}

impl NoGcRegionRequest {
    /// Request a region with a total allocation budget.
    #[must_use]
    pub const fn new(total_bytes: i64) -> Self {
        Self {
            total_bytes,
            loh_bytes: None,
            disallow_full_gc: false,
        }
    }

    /// Reserve part of the budget for large objects.
    #[must_use]
    pub const fn with_loh_size(mut self, loh_bytes: i64) -> Self {
        self.loh_bytes = Some(loh_bytes);
        self
    }

    /// Refuse induced full collections while the region is live instead of
    /// letting them end it.
    #[must_use]
    pub const fn disallow_full_gc(mut self, disallow: bool) -> Self {
        self.disallow_full_gc = disallow;
        self
    }

    /// Total allocation budget.
    #[must_use]
    pub const fn total_bytes(&self) -> i64 {
        self.total_bytes
    }

    /// Large-object share of the budget, if split out.
    #[must_use]
    pub const fn loh_bytes(&self) -> Option<i64> {
        self.loh_bytes
    }

    /// Whether induced full collections are refused.
    #[must_use]
    pub const fn full_gc_disallowed(&self) -> bool {
        self.disallow_full_gc
    }

    fn validate(&self, max_bytes: i64) -> Result<()> {
        if self.total_bytes <= 0 {
            return Err(GcError::RegionSizeOutOfRange {
                total_bytes: self.total_bytes,
            });
        }
        if let Some(loh_bytes) = self.loh_bytes {
            if !(0..=self.total_bytes).contains(&loh_bytes) {
                return Err(GcError::LohSizeOutOfRange {
                    loh_bytes,
                    total_bytes: self.total_bytes,
                });
            }
        }
        if self.total_bytes > max_bytes {
            return Err(GcError::RegionTooLarge {
                total_bytes: self.total_bytes,
                limit: max_bytes,
            });
        }
        Ok(())
    }
}

/// Which heap an allocation lands in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AllocationKind {
    /// Ordinary object.
    #[default]
    Small,
    /// Large object.
    Large,
}

/// Why a region ended before `end` was called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AbnormalExit {
    /// More was allocated than the region reserved.
    AllocationExceeded,
    /// A collection was induced inside the region.
    InducedCollection,
}

impl fmt::Display for AbnormalExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AllocationExceeded => write!(f, "allocated more than the requested budget"),
            Self::InducedCollection => write!(f, "a collection was induced inside the region"),
        }
    }
}

/// Observable controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionState {
    /// No region.
    Idle,
    /// A region is live.
    Active,
}

#[derive(Debug)]
struct ActiveRegion {
    request: NoGcRegionRequest,
    prior_mode: LatencyMode,
    small_allocated: i64,
    large_allocated: i64,
}

impl ActiveRegion {
    fn charge(&mut self, bytes: i64, kind: AllocationKind) -> bool {
        let total = self.request.total_bytes;
        match (self.request.loh_bytes, kind) {
            (Some(loh), AllocationKind::Large) => {
                self.large_allocated = self.large_allocated.saturating_add(bytes);
                self.large_allocated > loh
            }
            (Some(loh), AllocationKind::Small) => {
                self.small_allocated = self.small_allocated.saturating_add(bytes);
                self.small_allocated > total - loh
            }
            (None, AllocationKind::Small) => {
                self.small_allocated = self.small_allocated.saturating_add(bytes);
                self.allocated() > total
            }
            (None, AllocationKind::Large) => {
                self.large_allocated = self.large_allocated.saturating_add(bytes);
                self.allocated() > total
            }
        }
    }

    const fn allocated(&self) -> i64 {
        self.small_allocated.saturating_add(self.large_allocated)
    }
}

#[derive(Debug)]
struct LatencyState {
    mode: LatencyMode,
    region: Option<ActiveRegion>,
    abnormal_exit: Option<AbnormalExit>,
}

impl LatencyState {
    fn abort(&mut self, cause: AbnormalExit) -> Option<AbnormalExit> {
        let region = self.region.take()?;
        self.mode = region.prior_mode;
        self.abnormal_exit = Some(cause);
        crate::tracing::log_region_exited_abnormally(cause, region.prior_mode);
        Some(cause)
    }
}

/// The no-GC region controller and owner of the latency mode.
#[derive(Debug)]
pub struct NoGcRegions {
    state: Mutex<LatencyState>,
    max_region_bytes: i64,
    committable_bytes: i64,
}

impl Default for NoGcRegions {
    fn default() -> Self {
        Self::new(&RuntimeConfig::default())
    }
}

impl NoGcRegions {
    /// Create an idle controller.
    ///
    /// An initial mode of `NoGCRegion` is not honoured; the controller starts
    /// in the default mode instead.
    #[must_use]
    pub fn new(config: &RuntimeConfig) -> Self {
        let mode = if config.initial_latency_mode.is_assignable() {
            config.initial_latency_mode
        } else {
            LatencyMode::default()
        };
        Self {
            state: Mutex::new(LatencyState {
                mode,
                region: None,
                abnormal_exit: None,
            }),
            max_region_bytes: config.max_no_gc_region_bytes,
            committable_bytes: config.committable_bytes,
        }
    }

    /// Try to enter a no-GC region.
    ///
    /// Returns `Ok(true)` on admission, with the latency mode switched to
    /// `NoGCRegion`, and `Ok(false)` when the budget cannot be committed.
    ///
    /// # Errors
    ///
    /// - [`GcError::RegionSizeOutOfRange`], [`GcError::LohSizeOutOfRange`],
    ///   [`GcError::RegionTooLarge`] for bad budgets.
    /// - [`GcError::RegionAlreadyActive`] while a region is live.
    pub fn try_start(&self, request: NoGcRegionRequest) -> Result<bool> {
        request.validate(self.max_region_bytes)?;

        let mut state = self.state.lock();
        if state.region.is_some() {
            return Err(GcError::RegionAlreadyActive);
        }
        if request.total_bytes > self.committable_bytes {
            drop(state);
            crate::tracing::log_region_refused(request.total_bytes, self.committable_bytes);
            return Ok(false);
        }

        let prior_mode = state.mode;
        state.region = Some(ActiveRegion {
            request,
            prior_mode,
            small_allocated: 0,
            large_allocated: 0,
        });
        state.mode = LatencyMode::NoGCRegion;
        state.abnormal_exit = None;
        drop(state);

        crate::tracing::log_region_started(
            request.total_bytes,
            request.loh_bytes,
            request.disallow_full_gc,
            prior_mode,
        );
        Ok(true)
    }

    /// Leave the region and restore the latency mode it replaced.
    ///
    /// # Errors
    ///
    /// - [`GcError::RegionEndedAbnormally`] once, if the region was torn down
    ///   by an allocation overrun or induced collection since it started.
    /// - [`GcError::RegionNotActive`] otherwise when no region is live.
    pub fn end(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(region) = state.region.take() {
            state.mode = region.prior_mode;
            drop(state);
            crate::tracing::log_region_ended(region.prior_mode);
            return Ok(());
        }
        match state.abnormal_exit.take() {
            Some(cause) => Err(GcError::RegionEndedAbnormally(cause)),
            None => Err(GcError::RegionNotActive),
        }
    }

    /// Current latency mode.
    #[must_use]
    pub fn latency_mode(&self) -> LatencyMode {
        self.state.lock().mode
    }

    /// Assign the latency mode.
    ///
    /// # Errors
    ///
    /// - [`GcError::LatencyModeOutOfRange`] for `NoGCRegion`, which only a
    ///   region may set.
    /// - [`GcError::LatencyModeLocked`] while a region is live.
    pub fn set_latency_mode(&self, mode: LatencyMode) -> Result<()> {
        if !mode.is_assignable() {
            return Err(GcError::LatencyModeOutOfRange { value: mode.into() });
        }
        let mut state = self.state.lock();
        if state.region.is_some() {
            return Err(GcError::LatencyModeLocked);
        }
        let previous = std::mem::replace(&mut state.mode, mode);
        drop(state);
        crate::tracing::log_latency_mode_changed(previous, mode);
        Ok(())
    }

    /// Whether a region is live.
    #[must_use]
    pub fn state(&self) -> RegionState {
        if self.state.lock().region.is_some() {
            RegionState::Active
        } else {
            RegionState::Idle
        }
    }

    /// Whether a region is live.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == RegionState::Active
    }

    /// The live region's request.
    #[must_use]
    pub fn active_request(&self) -> Option<NoGcRegionRequest> {
        self.state.lock().region.as_ref().map(|r| r.request)
    }

    /// Bytes charged against the live region.
    #[must_use]
    pub fn allocated(&self) -> Option<i64> {
        self.state.lock().region.as_ref().map(ActiveRegion::allocated)
    }

    /// Charge an allocation against the live region.
    ///
    /// Exceeding the budget ends the region and returns the cause; the next
    /// [`end`](Self::end) reports it.
    pub fn record_allocation(&self, bytes: u64, kind: AllocationKind) -> Option<AbnormalExit> {
        let bytes = i64::try_from(bytes).unwrap_or(i64::MAX);
        let mut state = self.state.lock();
        let exceeded = state.region.as_mut()?.charge(bytes, kind);
        if exceeded {
            state.abort(AbnormalExit::AllocationExceeded)
        } else {
            None
        }
    }

    /// Account for a collection of `generation` being induced.
    ///
    /// A live region ends with [`AbnormalExit::InducedCollection`], unless it
    /// disallows full collections and `generation` is the oldest.
    ///
    /// # Errors
    ///
    /// [`GcError::FullCollectionDisallowed`] in the latter case; the region
    /// stays live.
    pub fn on_collection(&self, generation: Generation) -> Result<Option<AbnormalExit>> {
        let mut state = self.state.lock();
        let Some(region) = state.region.as_ref() else {
            return Ok(None);
        };
        if region.request.disallow_full_gc && generation.is_max() {
            return Err(GcError::FullCollectionDisallowed);
        }
        Ok(state.abort(AbnormalExit::InducedCollection))
    }
}
