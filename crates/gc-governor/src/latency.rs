//! Latency modes.

use crate::error::GcError;

/// Runtime-wide policy governing how intrusive collections may be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum LatencyMode {
    /// Throughput first; background collection disabled.
    Batch = 0,
    /// Background collection enabled.
    #[default]
    Interactive = 1,
    /// Full collections are deferred unless forced.
    LowLatency = 2,
    /// Full blocking collections are avoided where possible.
    SustainedLowLatency = 3,
    /// A no-GC region is in progress. Owned by the region controller.
    NoGCRegion = 4,
}

impl LatencyMode {
    /// Whether user code may assign this mode directly.
    #[must_use]
    pub const fn is_assignable(self) -> bool {
        !matches!(self, Self::NoGCRegion)
    }

    /// Whether full collections requested in `mode` should be deferred.
    #[must_use]
    pub(crate) const fn defers_full_collection(self, mode: crate::CollectionMode) -> bool {
        use crate::CollectionMode;
        match (self, mode) {
            (_, CollectionMode::Forced) => false,
            (Self::LowLatency, _) | (Self::SustainedLowLatency, CollectionMode::Optimized) => {
                true
            }
            _ => false,
        }
    }
}

impl TryFrom<i32> for LatencyMode {
    type Error = GcError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Batch),
            1 => Ok(Self::Interactive),
            2 => Ok(Self::LowLatency),
            3 => Ok(Self::SustainedLowLatency),
            4 => Ok(Self::NoGCRegion),
            _ => Err(GcError::LatencyModeOutOfRange { value }),
        }
    }
}

impl From<LatencyMode> for i32 {
    fn from(mode: LatencyMode) -> Self {
        mode as Self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CollectionMode;

    #[test]
    fn test_raw_values() {
        for raw in 0..=4 {
            let mode = LatencyMode::try_from(raw).unwrap();
            assert_eq!(i32::from(mode), raw);
        }
        assert_eq!(
            LatencyMode::try_from(5),
            Err(GcError::LatencyModeOutOfRange { value: 5 })
        );
        assert!(LatencyMode::try_from(-1).is_err());
    }

    #[test]
    fn test_no_gc_region_not_assignable() {
        assert!(!LatencyMode::NoGCRegion.is_assignable());
        assert!(LatencyMode::LowLatency.is_assignable());
    }

    #[test]
    fn test_deferral() {
        assert!(LatencyMode::LowLatency.defers_full_collection(CollectionMode::Default));
        assert!(!LatencyMode::LowLatency.defers_full_collection(CollectionMode::Forced));
        assert!(LatencyMode::SustainedLowLatency.defers_full_collection(CollectionMode::Optimized));
        assert!(!LatencyMode::SustainedLowLatency.defers_full_collection(CollectionMode::Default));
        assert!(!LatencyMode::Interactive.defers_full_collection(CollectionMode::Optimized));
    }
}
