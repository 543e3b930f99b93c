//! Integration tests for the tracing feature.
//!
//! These run the public operations under a subscriber writing into a
//! buffer and check the events that come out.

#![cfg(feature = "tracing")]

use std::io;
use std::sync::Arc;
use std::thread;

use gc_governor::{AllocationKind, NoGcRegionRequest, RuntimeAuthority, WaitOutcome};
use parking_lot::Mutex;

#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn with_captured<R>(f: impl FnOnce() -> R) -> (R, String) {
    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, log.contents())
}

#[test]
fn test_notification_flow_with_tracing() {
    let (_, output) = with_captured(|| {
        let authority = Arc::new(RuntimeAuthority::default());
        authority.register_for_full_gc_notification(2, 0).unwrap();

        let waiter = {
            let authority = Arc::clone(&authority);
            thread::spawn(move || authority.wait_for_full_gc_complete(-1))
        };
        while authority.notifications().pending_waiters() == 0 {
            thread::yield_now();
        }
        authority.collect_full().unwrap();

        assert_eq!(waiter.join().unwrap(), Ok(WaitOutcome::Succeeded));
        authority.cancel_full_gc_notification();
        assert_eq!(authority.shutdown(), 0);
    });

    assert!(output.contains("full_gc_registered"), "{output}");
    assert!(output.contains("max_generation=2"), "{output}");
    assert!(output.contains("phase_signalled"), "{output}");
    assert!(output.contains("full_gc_cancelled"), "{output}");
    assert!(output.contains("runtime_authority_shutdown"), "{output}");
}

#[test]
fn test_region_flow_with_tracing() {
    let (_, output) = with_captured(|| {
        let authority = RuntimeAuthority::default();
        assert!(authority
            .try_start_no_gc_region(NoGcRegionRequest::new(64))
            .unwrap());
        authority.record_allocation(128, AllocationKind::Small);
        assert!(authority.end_no_gc_region().is_err());
    });

    assert!(output.contains("no_gc_region_started"), "{output}");
    assert!(output.contains("total_bytes=64"), "{output}");
    assert!(output.contains("no_gc_region_aborted"), "{output}");
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("AllocationExceeded"), "{output}");
}

#[test]
fn test_deferred_collection_is_logged() {
    let (_, output) = with_captured(|| {
        let authority = RuntimeAuthority::default();
        authority
            .set_latency_mode(gc_governor::LatencyMode::LowLatency)
            .unwrap();
        let report = authority.collect(gc_governor::Generation::OLD, Default::default());
        assert!(!report.unwrap().performed);
    });

    assert!(output.contains("latency_mode_changed"), "{output}");
    assert!(output.contains("collection_deferred"), "{output}");
}
