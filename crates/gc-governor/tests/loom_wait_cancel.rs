//! Loom tests for the wait/cancel handshake.
//!
//! `Registry` below is a standalone model of the protocol the notification
//! registry follows, not the registry itself: state checked under the mutex
//! before sleeping, transitions made under the mutex and followed by
//! `notify_all`. Loom explores every interleaving of the model to show no
//! wakeup is lost.

use loom::sync::{Arc, Condvar, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Canceled,
}

#[derive(Default)]
struct State {
    pending: bool,
    canceled: bool,
}

struct Registry {
    state: Mutex<State>,
    changed: Condvar,
}

impl Registry {
    fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            changed: Condvar::new(),
        }
    }

    fn wait(&self) -> Outcome {
        let mut state = self.state.lock().unwrap();
        loop {
            if state.pending {
                state.pending = false;
                return Outcome::Succeeded;
            }
            if state.canceled {
                return Outcome::Canceled;
            }
            state = self.changed.wait(state).unwrap();
        }
    }

    fn cancel(&self) {
        self.state.lock().unwrap().canceled = true;
        self.changed.notify_all();
    }

    fn signal(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.canceled {
            return false;
        }
        state.pending = true;
        drop(state);
        self.changed.notify_all();
        true
    }
}

/// Cancel racing a blocked or not-yet-blocked waiter always resolves it.
#[test]
#[ignore = "loom test - run with cargo test loom_cancel --release -- --ignored"]
fn test_loom_cancel_wakes_waiter() {
    loom::model(|| {
        let registry = Arc::new(Registry::new());

        let waiter = loom::thread::spawn({
            let registry = Arc::clone(&registry);
            move || registry.wait()
        });

        registry.cancel();
        assert_eq!(waiter.join().unwrap(), Outcome::Canceled);
    });
}

/// A signal delivered before the cancel wins; one dropped after it cannot.
#[test]
#[ignore = "loom test - run with cargo test loom_signal_cancel --release -- --ignored"]
fn test_loom_signal_cancel_race() {
    loom::model(|| {
        let registry = Arc::new(Registry::new());

        let waiter = loom::thread::spawn({
            let registry = Arc::clone(&registry);
            move || registry.wait()
        });
        let signaller = loom::thread::spawn({
            let registry = Arc::clone(&registry);
            move || registry.signal()
        });

        registry.cancel();
        let delivered = signaller.join().unwrap();
        let outcome = waiter.join().unwrap();

        if !delivered {
            assert_eq!(outcome, Outcome::Canceled);
        }
    });
}
