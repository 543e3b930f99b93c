//! Generations and per-referent generation queries.
//!
//! The table does not trace anything. Referents are tracked through weak
//! handles; a collection prunes the ones that have been dropped and ages
//! the survivors it covered by one generation.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::{GcError, Result};

/// Oldest generation.
pub const MAX_GENERATION: i32 = 2;
/// Number of generations.
pub const GENERATION_COUNT: usize = 3;

/// A validated generation number in `0..=MAX_GENERATION`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u8);

impl Generation {
    /// Generation 0, where tracking starts.
    pub const YOUNG: Self = Self(0);
    /// The oldest generation. Collecting it is a full collection.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub const OLD: Self = Self(MAX_GENERATION as u8);

    /// Validate a raw generation number.
    ///
    /// # Errors
    ///
    /// Returns [`GcError::GenerationOutOfRange`] outside `0..=MAX_GENERATION`.
    pub fn new(value: i32) -> Result<Self> {
        u8::try_from(value)
            .ok()
            .filter(|g| i32::from(*g) <= MAX_GENERATION)
            .map(Self)
            .ok_or(GcError::GenerationOutOfRange {
                value,
                max: MAX_GENERATION,
            })
    }

    /// Raw generation number.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }

    /// Whether this is the oldest generation.
    #[inline]
    #[must_use]
    pub const fn is_max(self) -> bool {
        self.0 == Self::OLD.0
    }

    /// The next older generation, saturating at the oldest.
    #[must_use]
    pub const fn promoted(self) -> Self {
        if self.is_max() {
            self
        } else {
            Self(self.0 + 1)
        }
    }

    /// All generations, youngest first.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..=Self::OLD.0).map(Self)
    }
}

impl From<Generation> for i32 {
    fn from(generation: Generation) -> Self {
        Self::from(generation.0)
    }
}

impl TryFrom<i32> for Generation {
    type Error = GcError;

    fn try_from(value: i32) -> Result<Self> {
        Self::new(value)
    }
}

static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to a referent tracked by a [`GenerationTable`].
///
/// Holds no strong reference; dropping every `Arc` to the referent makes
/// generation queries fail.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackedRef {
    table: u64,
    id: u64,
}

impl TrackedRef {
    /// Identifier unique within the issuing table.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

struct Entry {
    generation: Generation,
    referent: Weak<dyn Any + Send + Sync>,
}

impl Entry {
    fn is_alive(&self) -> bool {
        self.referent.strong_count() > 0
    }
}

/// Outcome of aging the table for one collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgingSummary {
    /// Entries removed because their referent was dropped.
    pub pruned: usize,
    /// Entries moved to an older generation.
    pub promoted: usize,
}

/// Generation bookkeeping for tracked referents.
pub struct GenerationTable {
    id: u64,
    next_ref: AtomicU64,
    entries: Mutex<HashMap<u64, Entry>>,
}

impl std::fmt::Debug for GenerationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationTable")
            .field("id", &self.id)
            .field("tracked", &self.entries.lock().len())
            .finish()
    }
}

impl Default for GenerationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl GenerationTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed),
            next_ref: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Start tracking `referent` in generation 0.
    pub fn track<T: Any + Send + Sync>(&self, referent: &Arc<T>) -> TrackedRef {
        let id = self.next_ref.fetch_add(1, Ordering::Relaxed);
        let weak = Arc::downgrade(referent);
        let weak: Weak<dyn Any + Send + Sync> = weak;
        self.entries.lock().insert(
            id,
            Entry {
                generation: Generation::YOUNG,
                referent: weak,
            },
        );
        TrackedRef { table: self.id, id }
    }

    /// Current generation of a tracked referent.
    ///
    /// # Errors
    ///
    /// [`GcError::ReferentCollected`] once the referent has been dropped,
    /// [`GcError::UnknownReferent`] for a handle issued by another table.
    pub fn generation_of(&self, tracked: &TrackedRef) -> Result<Generation> {
        if tracked.table != self.id {
            return Err(GcError::UnknownReferent { id: tracked.id });
        }
        self.entries
            .lock()
            .get(&tracked.id)
            .filter(|entry| entry.is_alive())
            .map(|entry| entry.generation)
            .ok_or(GcError::ReferentCollected)
    }

    /// Number of entries, including ones whose referent died since the last aging.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Age the table for a collection of `collected` and every younger generation.
    pub fn age(&self, collected: Generation) -> AgingSummary {
        let mut summary = AgingSummary::default();
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| {
            if !entry.is_alive() {
                summary.pruned += 1;
                return false;
            }
            if entry.generation <= collected && !entry.generation.is_max() {
                entry.generation = entry.generation.promoted();
                summary.promoted += 1;
            }
            true
        });
        summary
    }
}
