//! Collection counters and reports.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::generation::{Generation, GENERATION_COUNT};
use crate::CollectionMode;

/// Stable identifier for a collection.
///
/// Monotonically increasing per authority, starting at 1. Used to correlate
/// tracing events and reports for a single collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollectionId(pub u64);

/// Summary of one `collect` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionReport {
    /// Identifier of this collection.
    pub id: CollectionId,
    /// Generation that was requested.
    pub generation: Generation,
    /// Mode it was requested with.
    pub mode: CollectionMode,
    /// `false` when the latency mode deferred the collection.
    pub performed: bool,
    /// Whether the collection counted as full for the live registration.
    pub notified: bool,
    /// Tracked referents pruned because they were dropped.
    pub referents_pruned: usize,
    /// Tracked referents moved to an older generation.
    pub referents_promoted: usize,
    /// Wall-clock time spent in bookkeeping.
    pub duration: Duration,
}

/// Per-generation collection counts.
///
/// Collecting generation `g` also collects every younger generation, so it
/// bumps the counters for `0..=g`.
#[derive(Debug)]
pub struct CollectionCounters {
    per_generation: [AtomicUsize; GENERATION_COUNT],
    deferred: AtomicUsize,
    next_id: AtomicU64,
    last: Mutex<Option<CollectionReport>>,
}

impl Default for CollectionCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectionCounters {
    /// Create counters with everything at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            per_generation: std::array::from_fn(|_| AtomicUsize::new(0)),
            deferred: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
            last: Mutex::new(None),
        }
    }

    /// Allocate the next collection id.
    pub fn next_id(&self) -> CollectionId {
        CollectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of collections that covered `generation`.
    #[inline]
    #[must_use]
    pub fn count(&self, generation: Generation) -> usize {
        self.per_generation[generation.index()].load(Ordering::Relaxed)
    }

    /// Number of collections deferred by the latency mode.
    #[inline]
    #[must_use]
    pub fn deferred(&self) -> usize {
        self.deferred.load(Ordering::Relaxed)
    }

    /// The most recent report, performed or deferred.
    #[must_use]
    pub fn last(&self) -> Option<CollectionReport> {
        *self.last.lock()
    }

    /// Record a finished `collect` call.
    pub fn record(&self, report: CollectionReport) {
        if report.performed {
            for counter in &self.per_generation[..=report.generation.index()] {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        } else {
            self.deferred.fetch_add(1, Ordering::Relaxed);
        }
        *self.last.lock() = Some(report);
    }
}
