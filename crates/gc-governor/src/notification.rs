//! Full-GC notification registry.
//!
//! A caller registers interest in full collections, then blocks on
//! [`FullGcNotifications::wait_for_approach`] or
//! [`FullGcNotifications::wait_for_complete`] until the collector signals
//! the phase, the timeout elapses, or another thread cancels.
//!
//! # Wakeups
//!
//! All registry state lives under one mutex and every transition (phase
//! signal, cancel, re-register, shutdown) is made under that lock and
//! followed by `notify_all`. Waiters re-check the state under the lock
//! before sleeping, so a transition can never slip in between the check and
//! the sleep.
//!
//! # Cancellation
//!
//! Cancellation is latched on the live registration. A wait that starts
//! after `cancel` resolves to [`WaitOutcome::Canceled`] too, until the caller
//! registers again. Phase signals that arrive after a cancel are dropped, so
//! a pending success always predates the cancel.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{GcError, Result};
use crate::generation::{Generation, MAX_GENERATION};

/// Phase of a full collection that can be waited on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FullGcPhase {
    /// A full collection is about to start.
    Approach,
    /// A full collection has finished.
    Complete,
}

/// How a wait resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitOutcome {
    /// The phase was signalled.
    Succeeded,
    /// The timeout elapsed first.
    Timeout,
    /// The notification was cancelled.
    Canceled,
    /// The registration went away underneath the waiter.
    Failed,
}

/// Bounds for a wait, parsed from the millisecond convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTimeout {
    /// Block until a phase signal or cancellation.
    Infinite,
    /// Block for at most this long.
    After(Duration),
}

impl WaitTimeout {
    /// Millisecond value meaning "wait indefinitely".
    pub const INFINITE_MILLIS: i32 = -1;

    /// Parse a millisecond timeout; `-1` is infinite.
    ///
    /// # Errors
    ///
    /// [`GcError::TimeoutOutOfRange`] for anything below `-1`.
    pub fn from_millis(millis: i32) -> Result<Self> {
        match millis {
            Self::INFINITE_MILLIS => Ok(Self::Infinite),
            m if m < Self::INFINITE_MILLIS => Err(GcError::TimeoutOutOfRange { millis }),
            m => Ok(Self::After(Duration::from_millis(u64::from(m.unsigned_abs())))),
        }
    }

    fn deadline(self, now: Instant) -> Option<Instant> {
        match self {
            Self::Infinite => None,
            Self::After(timeout) => now.checked_add(timeout),
        }
    }
}

/// Validated registration thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationThresholds {
    max_generation: Generation,
    max_bytes: i64,
}

impl NotificationThresholds {
    /// Validate both thresholds.
    ///
    /// Each parameter is checked against its own bound; the first violation
    /// found (generation before bytes) is reported.
    ///
    /// # Errors
    ///
    /// [`GcError::GenerationThresholdOutOfRange`] unless
    /// `0 <= max_generation <= 2`, [`GcError::BytesThresholdOutOfRange`]
    /// unless `0 <= max_bytes`.
    pub fn new(max_generation: i32, max_bytes: i64) -> Result<Self> {
        let generation_ok = (0..=MAX_GENERATION).contains(&max_generation);
        let bytes_ok = max_bytes >= 0;
        if !generation_ok {
            return Err(GcError::GenerationThresholdOutOfRange {
                value: max_generation,
                max: MAX_GENERATION,
            });
        }
        if !bytes_ok {
            return Err(GcError::BytesThresholdOutOfRange { value: max_bytes });
        }
        Ok(Self {
            max_generation: Generation::new(max_generation)?,
            max_bytes,
        })
    }

    /// Collections of this generation or older count as full.
    #[must_use]
    pub const fn max_generation(&self) -> Generation {
        self.max_generation
    }

    /// Remaining allocation budget at which an approach is raised.
    #[must_use]
    pub const fn max_bytes(&self) -> i64 {
        self.max_bytes
    }
}

#[derive(Debug)]
struct Registration {
    id: u64,
    thresholds: NotificationThresholds,
    approach_pending: bool,
    complete_pending: bool,
    canceled: bool,
    approach_raised_this_cycle: bool,
}

impl Registration {
    const fn new(id: u64, thresholds: NotificationThresholds) -> Self {
        Self {
            id,
            thresholds,
            approach_pending: false,
            complete_pending: false,
            canceled: false,
            approach_raised_this_cycle: false,
        }
    }

    fn raise(&mut self, phase: FullGcPhase) {
        match phase {
            FullGcPhase::Approach => {
                self.approach_pending = true;
                self.approach_raised_this_cycle = true;
            }
            FullGcPhase::Complete => self.complete_pending = true,
        }
    }

    fn take(&mut self, phase: FullGcPhase) -> bool {
        let slot = match phase {
            FullGcPhase::Approach => &mut self.approach_pending,
            FullGcPhase::Complete => &mut self.complete_pending,
        };
        std::mem::take(slot)
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    registration: Option<Registration>,
    next_id: u64,
    waiters: usize,
    shut_down: bool,
}

impl RegistryState {
    /// Resolve the wait for `registration_id`, or `None` to keep blocking.
    fn poll(&mut self, registration_id: u64, phase: FullGcPhase) -> Option<WaitOutcome> {
        if self.shut_down {
            return Some(WaitOutcome::Failed);
        }
        let Some(registration) = self
            .registration
            .as_mut()
            .filter(|r| r.id == registration_id)
        else {
            return Some(WaitOutcome::Failed);
        };
        if registration.take(phase) {
            return Some(WaitOutcome::Succeeded);
        }
        if registration.canceled {
            return Some(WaitOutcome::Canceled);
        }
        None
    }

    fn live_mut(&mut self) -> Option<&mut Registration> {
        self.registration.as_mut().filter(|r| !r.canceled)
    }
}

/// The full-GC notification registry.
///
/// At most one registration is live; registering again replaces it and any
/// waiter still blocked on the old one resolves to [`WaitOutcome::Failed`].
#[derive(Debug, Default)]
pub struct FullGcNotifications {
    state: Mutex<RegistryState>,
    changed: Condvar,
}

impl FullGcNotifications {
    /// Create an unarmed registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the registry with new thresholds.
    ///
    /// # Errors
    ///
    /// Out-of-range thresholds (see [`NotificationThresholds::new`]) are
    /// rejected before anything changes. [`GcError::ShutDown`] after
    /// [`shutdown`](Self::shutdown).
    pub fn register(&self, max_generation: i32, max_bytes: i64) -> Result<()> {
        let thresholds = NotificationThresholds::new(max_generation, max_bytes)?;
        let mut state = self.state.lock();
        if state.shut_down {
            return Err(GcError::ShutDown);
        }
        state.next_id += 1;
        let id = state.next_id;
        let replaced = state
            .registration
            .replace(Registration::new(id, thresholds))
            .is_some();
        if replaced {
            self.changed.notify_all();
        }
        drop(state);
        crate::tracing::log_registered(max_generation, max_bytes, replaced);
        Ok(())
    }

    /// Cancel the live registration, waking every waiter with
    /// [`WaitOutcome::Canceled`]. Does nothing when nothing is registered.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        let had_registration = match state.registration.as_mut() {
            Some(registration) => {
                registration.canceled = true;
                true
            }
            None => false,
        };
        if had_registration {
            self.changed.notify_all();
        }
        drop(state);
        crate::tracing::log_cancelled(had_registration);
    }

    /// Block until a full collection approaches.
    ///
    /// # Errors
    ///
    /// See [`wait`](Self::wait).
    pub fn wait_for_approach(&self, timeout_millis: i32) -> Result<WaitOutcome> {
        self.wait(FullGcPhase::Approach, timeout_millis)
    }

    /// Block until a full collection completes.
    ///
    /// # Errors
    ///
    /// See [`wait`](Self::wait).
    pub fn wait_for_complete(&self, timeout_millis: i32) -> Result<WaitOutcome> {
        self.wait(FullGcPhase::Complete, timeout_millis)
    }

    /// Block the calling thread until `phase` is signalled, the timeout
    /// elapses, or the notification is cancelled.
    ///
    /// A pending phase signal wins over cancellation and timeout.
    ///
    /// # Errors
    ///
    /// - [`GcError::TimeoutOutOfRange`] for `timeout_millis < -1`, before blocking.
    /// - [`GcError::NotRegistered`] when nothing is registered.
    /// - [`GcError::ShutDown`] after [`shutdown`](Self::shutdown).
    pub fn wait(&self, phase: FullGcPhase, timeout_millis: i32) -> Result<WaitOutcome> {
        let timeout = WaitTimeout::from_millis(timeout_millis)?;
        let _span = crate::tracing::trace_wait(phase, timeout_millis);
        let deadline = timeout.deadline(Instant::now());

        let mut state = self.state.lock();
        if state.shut_down {
            return Err(GcError::ShutDown);
        }
        let registration_id = state
            .registration
            .as_ref()
            .map(|r| r.id)
            .ok_or(GcError::NotRegistered)?;

        state.waiters += 1;
        let outcome = loop {
            if let Some(outcome) = state.poll(registration_id, phase) {
                break outcome;
            }
            match deadline {
                None => self.changed.wait(&mut state),
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        break WaitOutcome::Timeout;
                    }
                    // Spurious and timed-out wakeups both loop back to poll.
                    let _ = self.changed.wait_until(&mut state, deadline);
                }
            }
        };
        state.waiters -= 1;
        drop(state);

        crate::tracing::log_wait_outcome(outcome);
        Ok(outcome)
    }

    /// Signal `phase` to the live registration.
    ///
    /// Returns `false` when nothing is registered or the registration was
    /// cancelled; the signal is dropped in that case.
    pub fn signal(&self, phase: FullGcPhase) -> bool {
        let mut state = self.state.lock();
        let delivered = match state.live_mut() {
            Some(registration) => {
                registration.raise(phase);
                true
            }
            None => false,
        };
        if delivered {
            self.changed.notify_all();
        }
        drop(state);
        crate::tracing::log_phase_signalled(phase, delivered);
        delivered
    }

    /// Signal [`FullGcPhase::Approach`].
    pub fn signal_approach(&self) -> bool {
        self.signal(FullGcPhase::Approach)
    }

    /// Signal [`FullGcPhase::Complete`].
    pub fn signal_complete(&self) -> bool {
        self.signal(FullGcPhase::Complete)
    }

    /// Whether a collection of `generation` counts as full for the live registration.
    #[must_use]
    pub fn is_full_for_registration(&self, generation: Generation) -> bool {
        self.state
            .lock()
            .live_mut()
            .is_some_and(|r| generation >= r.thresholds.max_generation)
    }

    /// Raise an approach when the remaining budget falls within the byte threshold.
    ///
    /// At most one allocation-driven approach is raised per budget cycle;
    /// the cycle resets with [`reset_budget_cycle`](Self::reset_budget_cycle).
    pub fn observe_remaining_budget(&self, remaining_bytes: i64) -> bool {
        let mut state = self.state.lock();
        let raised = match state.live_mut() {
            Some(r) if !r.approach_raised_this_cycle && remaining_bytes <= r.thresholds.max_bytes => {
                r.raise(FullGcPhase::Approach);
                true
            }
            _ => false,
        };
        if raised {
            self.changed.notify_all();
        }
        drop(state);
        if raised {
            crate::tracing::log_phase_signalled(FullGcPhase::Approach, true);
        }
        raised
    }

    /// Start a new allocation budget cycle, after the byte counter it
    /// observes has been reset.
    pub fn reset_budget_cycle(&self) {
        if let Some(registration) = self.state.lock().registration.as_mut() {
            registration.approach_raised_this_cycle = false;
        }
    }

    /// Thresholds of the live registration, cancelled or not.
    #[must_use]
    pub fn thresholds(&self) -> Option<NotificationThresholds> {
        self.state.lock().registration.as_ref().map(|r| r.thresholds)
    }

    /// Whether a registration exists and has not been cancelled.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state.lock().live_mut().is_some()
    }

    /// Number of threads currently blocked in a wait.
    #[must_use]
    pub fn pending_waiters(&self) -> usize {
        self.state.lock().waiters
    }

    /// Tear the registry down. In-flight waits resolve to
    /// [`WaitOutcome::Failed`]; later calls fail with [`GcError::ShutDown`].
    ///
    /// Returns the number of waiters that were blocked.
    pub fn shutdown(&self) -> usize {
        let mut state = self.state.lock();
        if state.shut_down {
            return 0;
        }
        state.shut_down = true;
        state.registration = None;
        let woken = state.waiters;
        self.changed.notify_all();
        drop(state);
        crate::tracing::log_shutdown(woken);
        woken
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }
}
