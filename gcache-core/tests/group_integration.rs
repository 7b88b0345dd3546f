//! End-to-end scenarios across `Group` + `GroupRegistry`, matching the
//! worked example used throughout the core design: a getter backed by
//! `{"Tom":"630","Jack":"589","Sam":"567"}`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use gcache_common::error::{BoxError, StringError};
use gcache_core::{GcacheError, GroupRegistry};

fn scores_getter(calls: Arc<AtomicUsize>) -> Arc<dyn gcache_core::Getter> {
    Arc::new(move |key: &str| -> Result<Vec<u8>, BoxError> {
        calls.fetch_add(1, Ordering::SeqCst);
        match key {
            "Tom" => Ok(b"630".to_vec()),
            "Jack" => Ok(b"589".to_vec()),
            "Sam" => Ok(b"567".to_vec()),
            other => Err(Box::new(StringError(format!("{other} not exist")))),
        }
    })
}

#[test]
fn tom_jack_sam_end_to_end() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = GroupRegistry::new();
    let group = registry
        .new_group("scores", 2048, scores_getter(calls.clone()))
        .expect("fresh registration");

    let tom = group.get("Tom").expect("Tom is in the backing getter");
    assert_eq!(tom.bytes(), b"630");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let tom_again = group.get("Tom").expect("cached");
    assert_eq!(tom_again.bytes(), b"630");
    assert_eq!(calls.load(Ordering::SeqCst), 1, "second Get must not call the getter");

    let err = group.get("unknown").unwrap_err();
    assert!(err.root_cause_message().contains("unknown not exist"));
}

#[test]
fn registry_distinguishes_groups_by_name() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = GroupRegistry::new();
    registry
        .new_group("scores", 2048, scores_getter(calls.clone()))
        .unwrap();
    registry
        .new_group("other", 2048, scores_getter(calls))
        .unwrap();

    assert!(registry.get_group("scores").is_some());
    assert_eq!(registry.get_group("scores").unwrap().name(), "scores");
    assert!(registry.get_group("not-registered").is_none());
}

#[test]
fn concurrent_misses_on_the_same_key_single_flight_to_one_getter_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = calls.clone();
    let getter: Arc<dyn gcache_core::Getter> = Arc::new(move |key: &str| -> Result<Vec<u8>, BoxError> {
        counted.fetch_add(1, Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        Ok(format!("value-for-{key}").into_bytes())
    });

    let registry = GroupRegistry::new();
    let group = registry.new_group("slow", 4096, getter).unwrap();
    let group = Arc::new(group);

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let group = group.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                group.get("shared-key").expect("getter does not fail")
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for value in &results {
        assert_eq!(value.bytes(), b"value-for-shared-key");
    }
}

#[test]
fn empty_key_is_rejected_before_touching_the_getter() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = GroupRegistry::new();
    let group = registry
        .new_group("scores", 2048, scores_getter(calls.clone()))
        .unwrap();

    let err = group.get("").unwrap_err();
    assert!(matches!(err, GcacheError::KeyRequired));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
