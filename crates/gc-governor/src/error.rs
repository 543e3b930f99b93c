//! Error types for GC control operations.

use thiserror::Error;

use crate::region::AbnormalExit;

/// Coarse classification of a [`GcError`].
///
/// Callers should treat `OutOfRange` and `InvalidState` as programmer errors
/// at the call site; neither is transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An argument was outside its accepted range.
    OutOfRange,
    /// The operation is not valid in the current state.
    InvalidState,
    /// An unexpected runtime fault.
    Unknown,
}

/// Errors raised by the runtime authority.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GcError {
    /// Generation threshold for a full-GC registration was outside `0..=2`.
    #[error("generation threshold {value} is outside 0..={max}")]
    GenerationThresholdOutOfRange {
        /// The rejected value.
        value: i32,
        /// Highest accepted value.
        max: i32,
    },

    /// Byte threshold for a full-GC registration was negative.
    #[error("byte threshold {value} must be non-negative")]
    BytesThresholdOutOfRange {
        /// The rejected value.
        value: i64,
    },

    /// Wait timeout was below `-1`.
    #[error("timeout {millis}ms is invalid; use -1 to wait indefinitely")]
    TimeoutOutOfRange {
        /// The rejected value.
        millis: i32,
    },

    /// Generation number was outside `0..=MAX_GENERATION`.
    #[error("generation {value} is outside 0..={max}")]
    GenerationOutOfRange {
        /// The rejected value.
        value: i32,
        /// Highest accepted value.
        max: i32,
    },

    /// No-GC region size was zero or negative.
    #[error("no-GC region size {total_bytes} must be positive")]
    RegionSizeOutOfRange {
        /// The rejected size.
        total_bytes: i64,
    },

    /// Large-object budget was negative or larger than the total budget.
    #[error("large object budget {loh_bytes} must be within 0..={total_bytes}")]
    LohSizeOutOfRange {
        /// The rejected large-object budget.
        loh_bytes: i64,
        /// The total region budget.
        total_bytes: i64,
    },

    /// No-GC region size exceeds what the runtime ever allows.
    #[error("no-GC region size {total_bytes} exceeds the limit of {limit} bytes")]
    RegionTooLarge {
        /// The rejected size.
        total_bytes: i64,
        /// Configured upper bound.
        limit: i64,
    },

    /// Raw latency mode value is unknown, or the mode cannot be assigned directly.
    #[error("latency mode {value} cannot be assigned")]
    LatencyModeOutOfRange {
        /// The rejected raw value.
        value: i32,
    },

    /// Wait called without an active full-GC registration.
    #[error("no full GC notification is registered")]
    NotRegistered,

    /// `try_start_no_gc_region` called while a region is active.
    #[error("a no-GC region is already in progress")]
    RegionAlreadyActive,

    /// `end_no_gc_region` called while no region is active.
    #[error("no no-GC region is in progress")]
    RegionNotActive,

    /// Latency mode assigned while a no-GC region owns it.
    #[error("latency mode cannot be changed while a no-GC region is in progress")]
    LatencyModeLocked,

    /// The region was exited before `end_no_gc_region` was called.
    #[error("no-GC region ended abnormally: {0}")]
    RegionEndedAbnormally(AbnormalExit),

    /// A full collection was requested inside a region that disallows it.
    #[error("full blocking collections are disallowed in the current no-GC region")]
    FullCollectionDisallowed,

    /// The tracked referent has been dropped.
    #[error("tracked referent has been collected")]
    ReferentCollected,

    /// The handle was not issued by this authority.
    #[error("tracked reference {id} is unknown to this runtime authority")]
    UnknownReferent {
        /// Handle id.
        id: u64,
    },

    /// The authority has been shut down.
    #[error("runtime authority has shut down")]
    ShutDown,
}

impl GcError {
    /// Returns the coarse classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::GenerationThresholdOutOfRange { .. }
            | Self::BytesThresholdOutOfRange { .. }
            | Self::TimeoutOutOfRange { .. }
            | Self::GenerationOutOfRange { .. }
            | Self::RegionSizeOutOfRange { .. }
            | Self::LohSizeOutOfRange { .. }
            | Self::RegionTooLarge { .. }
            | Self::LatencyModeOutOfRange { .. } => ErrorKind::OutOfRange,
            Self::NotRegistered
            | Self::RegionAlreadyActive
            | Self::RegionNotActive
            | Self::LatencyModeLocked
            | Self::RegionEndedAbnormally(_)
            | Self::FullCollectionDisallowed
            | Self::ReferentCollected
            | Self::UnknownReferent { .. } => ErrorKind::InvalidState,
            Self::ShutDown => ErrorKind::Unknown,
        }
    }

    /// Returns `true` for argument errors.
    #[must_use]
    pub const fn is_out_of_range(&self) -> bool {
        matches!(self.kind(), ErrorKind::OutOfRange)
    }

    /// Returns `true` for state errors.
    #[must_use]
    pub const fn is_invalid_state(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidState)
    }
}

/// Result type for GC control operations.
pub type Result<T> = std::result::Result<T, GcError>;
