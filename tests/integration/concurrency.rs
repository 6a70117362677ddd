//! Integration test: concurrent readers and writers.
//!
//! Readers must never observe a half-built continuum while writers add and
//! remove servers, and the lookup cache must agree with a fresh ring once
//! the writers are done.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use hashring::ServerSet;
use hashring_integration_tests::{equal_servers, init_tracing, ownership, ring, sample_keys, server};

#[test]
fn test_readers_never_see_partial_ring() {
    init_tracing();
    let r = Arc::new(ring(equal_servers(3)));
    let done = Arc::new(AtomicBool::new(false));
    let keys = Arc::new(sample_keys(500));

    let readers: Vec<_> = (0..4)
        .map(|t| {
            let r = Arc::clone(&r);
            let done = Arc::clone(&done);
            let keys = Arc::clone(&keys);
            thread::spawn(move || {
                let mut lookups = 0usize;
                while !done.load(Ordering::Acquire) {
                    for key in keys.iter().skip(t).step_by(4) {
                        let owner = r.get(key).unwrap();
                        assert!(owner.is_some(), "lookup hit an empty ring");
                        assert_eq!(r.len() % 160, 0, "partial continuum visible");
                        lookups += 1;
                    }
                }
                lookups
            })
        })
        .collect();

    let writer = {
        let r = Arc::clone(&r);
        thread::spawn(move || {
            for round in 0..50 {
                let extra = server(10 + round % 3);
                r.add(ServerSet::parse(&extra).unwrap()).unwrap();
                r.remove(&extra).unwrap();
            }
        })
    };

    writer.join().unwrap();
    done.store(true, Ordering::Release);
    for reader in readers {
        assert!(reader.join().unwrap() > 0);
    }

    let fresh = ring(equal_servers(3));
    assert_eq!(r.continuum(), fresh.continuum());
    assert_eq!(ownership(&r, &keys), ownership(&fresh, &keys));
}

#[test]
fn test_concurrent_swaps_keep_cache_consistent() {
    init_tracing();
    let r = Arc::new(ring(equal_servers(4)));
    let keys = Arc::new(sample_keys(1_000));
    ownership(&r, &keys);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let r = Arc::clone(&r);
            let keys = Arc::clone(&keys);
            thread::spawn(move || {
                r.swap(&server(i), &format!("10.0.8.{i}:11211")).unwrap();
                ownership(&r, &keys)
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    // Every point and every cached entry now carries a replacement label.
    assert!(r.continuum().iter().all(|p| p.server.as_str().starts_with("10.0.8.")));
    for owner in ownership(&r, &keys) {
        assert!(owner.as_str().starts_with("10.0.8."), "stale owner {owner}");
    }
}
