//! Integration tests for no-GC region admission and latency-mode ownership.

use std::sync::atomic::{AtomicUsize, Ordering};

use gc_governor::{
    AbnormalExit, AllocationKind, ErrorKind, GcError, LatencyMode, NoGcRegionRequest,
    RegionState, RuntimeAuthority, RuntimeConfig,
};

fn request_variants() -> [NoGcRegionRequest; 4] {
    [
        NoGcRegionRequest::new(1024),
        NoGcRegionRequest::new(1024).disallow_full_gc(true),
        NoGcRegionRequest::new(1024).with_loh_size(1024),
        NoGcRegionRequest::new(1024)
            .with_loh_size(1024)
            .disallow_full_gc(true),
    ]
}

#[test]
fn test_end_without_region_fails() {
    let authority = RuntimeAuthority::default();
    let err = authority.end_no_gc_region().unwrap_err();
    assert_eq!(err, GcError::RegionNotActive);
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test]
fn test_second_start_fails_for_every_request_shape() {
    for request in request_variants() {
        let authority = RuntimeAuthority::default();

        assert_eq!(authority.try_start_no_gc_region(request), Ok(true));
        assert_eq!(
            authority.try_start_no_gc_region(request),
            Err(GcError::RegionAlreadyActive)
        );
        assert_eq!(authority.regions().active_request(), Some(request));
    }
}

#[test]
fn test_start_end_cycles_restore_mode() {
    let authority = RuntimeAuthority::default();
    let before = authority.latency_mode();

    for request in request_variants() {
        assert_eq!(authority.try_start_no_gc_region(request), Ok(true));
        assert_eq!(authority.latency_mode(), LatencyMode::NoGCRegion);
        authority.end_no_gc_region().unwrap();
        assert_eq!(authority.latency_mode(), before);
    }
}

#[test]
fn test_restart_after_end_succeeds() {
    let authority = RuntimeAuthority::default();
    let request = NoGcRegionRequest::new(1024);

    assert_eq!(authority.try_start_no_gc_region(request), Ok(true));
    assert!(authority.try_start_no_gc_region(request).is_err());
    authority.end_no_gc_region().unwrap();
    assert_eq!(authority.try_start_no_gc_region(request), Ok(true));
    authority.end_no_gc_region().unwrap();
}

#[test]
fn test_latency_mode_locked_while_region_active() {
    let authority = RuntimeAuthority::default();
    authority
        .try_start_no_gc_region(NoGcRegionRequest::new(1024).disallow_full_gc(true))
        .unwrap();
    assert_eq!(authority.latency_mode(), LatencyMode::NoGCRegion);

    let err = authority
        .set_latency_mode(LatencyMode::LowLatency)
        .unwrap_err();
    assert_eq!(err, GcError::LatencyModeLocked);
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    if authority.latency_mode() == LatencyMode::NoGCRegion {
        authority.end_no_gc_region().unwrap();
    }
    assert_eq!(authority.regions().state(), RegionState::Idle);
}

#[test]
fn test_prior_mode_is_restored_not_default() {
    let config = RuntimeConfig::default().with_initial_latency_mode(LatencyMode::Batch);
    let authority = RuntimeAuthority::new(config);
    authority
        .set_latency_mode(LatencyMode::SustainedLowLatency)
        .unwrap();

    authority
        .try_start_no_gc_region(NoGcRegionRequest::new(64))
        .unwrap();
    authority.end_no_gc_region().unwrap();
    assert_eq!(authority.latency_mode(), LatencyMode::SustainedLowLatency);
}

#[test]
fn test_concurrent_starts_admit_exactly_one() {
    let authority = RuntimeAuthority::default();
    let admitted = AtomicUsize::new(0);
    let rejected = AtomicUsize::new(0);

    crossbeam::scope(|s| {
        for _ in 0..8 {
            s.spawn(|_| {
                match authority.try_start_no_gc_region(NoGcRegionRequest::new(1024)) {
                    Ok(true) => admitted.fetch_add(1, Ordering::SeqCst),
                    Err(GcError::RegionAlreadyActive) => rejected.fetch_add(1, Ordering::SeqCst),
                    other => panic!("unexpected admission result: {other:?}"),
                };
            });
        }
    })
    .unwrap();

    assert_eq!(admitted.load(Ordering::SeqCst), 1);
    assert_eq!(rejected.load(Ordering::SeqCst), 7);
    assert_eq!(authority.latency_mode(), LatencyMode::NoGCRegion);
}

#[test]
fn test_concurrent_ends_release_exactly_once() {
    let authority = RuntimeAuthority::default();
    authority
        .try_start_no_gc_region(NoGcRegionRequest::new(1024))
        .unwrap();
    let ended = AtomicUsize::new(0);

    crossbeam::scope(|s| {
        for _ in 0..8 {
            s.spawn(|_| {
                if authority.end_no_gc_region().is_ok() {
                    ended.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
    })
    .unwrap();

    assert_eq!(ended.load(Ordering::SeqCst), 1);
    assert_eq!(authority.latency_mode(), LatencyMode::Interactive);
}

#[test]
fn test_mode_and_region_never_disagree_under_contention() {
    let authority = RuntimeAuthority::default();

    crossbeam::scope(|s| {
        for _ in 0..4 {
            s.spawn(|_| {
                for _ in 0..200 {
                    if authority
                        .try_start_no_gc_region(NoGcRegionRequest::new(512))
                        .is_ok()
                    {
                        let _ = authority.end_no_gc_region();
                    }
                }
            });
        }
        s.spawn(|_| {
            for _ in 0..200 {
                let _ = authority.set_latency_mode(LatencyMode::Batch);
            }
        });
    })
    .unwrap();

    assert_eq!(authority.regions().state(), RegionState::Idle);
    assert_ne!(authority.latency_mode(), LatencyMode::NoGCRegion);
}

#[test]
fn test_budget_overrun_surfaces_on_end() {
    let authority = RuntimeAuthority::default();
    authority
        .try_start_no_gc_region(NoGcRegionRequest::new(1024))
        .unwrap();

    assert_eq!(authority.record_allocation(512, AllocationKind::Small), None);
    assert_eq!(
        authority.record_allocation(1024, AllocationKind::Small),
        Some(AbnormalExit::AllocationExceeded)
    );
    assert_eq!(authority.latency_mode(), LatencyMode::Interactive);

    let err = authority.end_no_gc_region().unwrap_err();
    assert_eq!(
        err,
        GcError::RegionEndedAbnormally(AbnormalExit::AllocationExceeded)
    );
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test]
fn test_out_of_range_requests() {
    let authority = RuntimeAuthority::default();

    for request in [
        NoGcRegionRequest::new(0),
        NoGcRegionRequest::new(-1),
        NoGcRegionRequest::new(1024).with_loh_size(-1),
        NoGcRegionRequest::new(1024).with_loh_size(1025),
        NoGcRegionRequest::new(i64::MAX),
    ] {
        let err = authority.try_start_no_gc_region(request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutOfRange, "{request:?}");
    }
    assert_eq!(authority.regions().state(), RegionState::Idle);
}

#[test]
fn test_uncommittable_request_returns_false() {
    let config = RuntimeConfig::default().with_committable_bytes(1024);
    let authority = RuntimeAuthority::new(config);

    assert_eq!(
        authority.try_start_no_gc_region(NoGcRegionRequest::new(2048)),
        Ok(false)
    );
    assert_eq!(authority.latency_mode(), LatencyMode::Interactive);
    assert_eq!(authority.end_no_gc_region(), Err(GcError::RegionNotActive));
}

#[test]
fn test_region_mode_only_while_region_active() {
    let config = RuntimeConfig {
        initial_latency_mode: LatencyMode::NoGCRegion,
        ..RuntimeConfig::default()
    };
    let authority = RuntimeAuthority::new(config);
    assert_eq!(authority.regions().state(), RegionState::Idle);
    assert_ne!(authority.latency_mode(), LatencyMode::NoGCRegion);

    authority
        .try_start_no_gc_region(NoGcRegionRequest::new(1024))
        .unwrap();
    assert_eq!(authority.latency_mode(), LatencyMode::NoGCRegion);
    authority.end_no_gc_region().unwrap();

    assert_eq!(authority.regions().state(), RegionState::Idle);
    assert_ne!(authority.latency_mode(), LatencyMode::NoGCRegion);
}
