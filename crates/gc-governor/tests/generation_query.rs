//! Integration tests for per-referent generation queries.

use std::sync::Arc;

use gc_governor::{
    CollectionMode, ErrorKind, GcError, Generation, RuntimeAuthority, MAX_GENERATION,
};

#[derive(Debug)]
struct Version {
    major: u32,
    minor: u32,
}

fn make_some_garbage(authority: &RuntimeAuthority) {
    for i in 0..1000 {
        let garbage = Arc::new(Version { major: i, minor: 0 });
        authority.track(&garbage);
    }
}

#[test]
fn test_generation_query_fails_after_referent_dropped() {
    let authority = RuntimeAuthority::default();

    let version = Arc::new(Version { major: 1, minor: 0 });
    make_some_garbage(&authority);
    let tracked = authority.track(&version);
    let current = authority.generation_of(&tracked).unwrap();
    assert!(i32::from(current) >= 0);
    assert_eq!(version.major + version.minor, 1);

    drop(version);
    authority.collect(current, CollectionMode::Forced).unwrap();

    let err = authority.generation_of(&tracked).unwrap_err();
    assert_eq!(err, GcError::ReferentCollected);
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[test]
fn test_survivors_age_to_max_generation() {
    let authority = RuntimeAuthority::default();
    let version = Arc::new(Version { major: 2, minor: 1 });
    let tracked = authority.track(&version);

    for expected in 1..=MAX_GENERATION + 1 {
        authority.collect_full().unwrap();
        let generation = authority.generation_of(&tracked).unwrap();
        assert_eq!(i32::from(generation), expected.min(MAX_GENERATION));
    }
}

#[test]
fn test_garbage_is_pruned_by_collection() {
    let authority = RuntimeAuthority::default();
    make_some_garbage(&authority);

    let report = authority
        .collect(Generation::YOUNG, CollectionMode::Default)
        .unwrap();
    assert_eq!(report.referents_pruned, 1000);
    assert_eq!(report.referents_promoted, 0);
    assert_eq!(authority.collection_count(Generation::YOUNG), 1);
    assert_eq!(authority.collection_count(Generation::OLD), 0);
}

#[test]
fn test_handles_do_not_cross_authorities() {
    let first = RuntimeAuthority::default();
    let second = RuntimeAuthority::default();
    let version = Arc::new(Version { major: 3, minor: 0 });
    let tracked = first.track(&version);

    assert!(matches!(
        second.generation_of(&tracked),
        Err(GcError::UnknownReferent { .. })
    ));
}

#[test]
fn test_generation_numbers_are_validated() {
    assert!(Generation::new(MAX_GENERATION).is_ok());
    let err = Generation::new(MAX_GENERATION + 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
}
