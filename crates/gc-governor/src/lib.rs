//! GC control for a host runtime.
//!
//! `gc-governor` implements the control surface a managed runtime exposes
//! over its collector: **full-GC notifications** and **no-GC regions**,
//! plus the latency mode both of them touch. It does not collect anything
//! itself; the host's collector reports into it through
//! [`RuntimeAuthority::collect`] and [`RuntimeAuthority::record_allocation`].
//!
//! # Features
//!
//! - **Cancellable waits**: block on the approach or completion of a full
//!   collection with a timeout; another thread can cancel at any point
//!   without a lost wakeup
//! - **No-GC regions**: reserve an allocation budget; the region owns the
//!   latency mode until it is ended or torn down by an overrun
//! - **Explicit ownership**: no hidden globals, one [`RuntimeAuthority`] per
//!   runtime or per test
//!
//! # Quick Start
//!
//! ```
//! use gc_governor::{LatencyMode, NoGcRegionRequest, RuntimeAuthority, WaitOutcome};
//!
//! let authority = RuntimeAuthority::default();
//!
//! // Notifications
//! authority.register_for_full_gc_notification(2, 1024).unwrap();
//! assert_eq!(authority.wait_for_full_gc_approach(0).unwrap(), WaitOutcome::Timeout);
//!
//! // No-GC region
//! assert!(authority.try_start_no_gc_region(NoGcRegionRequest::new(1024)).unwrap());
//! assert_eq!(authority.latency_mode(), LatencyMode::NoGCRegion);
//! authority.end_no_gc_region().unwrap();
//! assert_eq!(authority.latency_mode(), LatencyMode::Interactive);
//! ```
//!
//! # Thread Safety
//!
//! [`RuntimeAuthority`] is `Send + Sync`. Share it through `Arc`; waits block
//! only the calling thread.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod authority;
pub mod config;
mod error;
pub mod generation;
mod latency;
mod metrics;
pub mod notification;
pub mod region;
mod tracing;

// Re-export public API
pub use authority::{CollectionMode, RuntimeAuthority};
pub use config::RuntimeConfig;
pub use error::{ErrorKind, GcError, Result};
pub use generation::{Generation, TrackedRef, MAX_GENERATION};
pub use latency::LatencyMode;
pub use metrics::{CollectionId, CollectionReport};
pub use notification::{FullGcNotifications, FullGcPhase, WaitOutcome, WaitTimeout};
pub use region::{AbnormalExit, AllocationKind, NoGcRegionRequest, NoGcRegions, RegionState};
