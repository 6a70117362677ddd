//! Integration test: rebalancing.
//!
//! Grow, shrink and relabel rings and check that keys only move where the
//! membership change forces them to.

use hashring::ServerSet;
use hashring_integration_tests::{
    counts, equal_servers, init_tracing, ownership, ring, sample_keys, server, weighted_servers,
};

/// Removing any one of five equal servers leaves every other key in place.
#[test]
fn test_remove_each_server_only_moves_its_keys() {
    init_tracing();
    let keys = sample_keys(10_000);

    for removed in 0..5 {
        let r = ring(equal_servers(5));
        let before = ownership(&r, &keys);

        r.remove(&server(removed)).unwrap();
        let after = ownership(&r, &keys);

        for (i, (b, a)) in before.iter().zip(after.iter()).enumerate() {
            if b.as_str() == server(removed) {
                assert_ne!(a.as_str(), server(removed), "key {i} still on removed server");
            } else {
                assert_eq!(b, a, "key {i} moved off surviving server {b}");
            }
        }
    }
}

/// Removing a weighted server rescales the survivors' point counts, so a
/// small share of other keys moves too, but far less than a rehash would.
#[test]
fn test_remove_weighted_server_bounded_disruption() {
    init_tracing();
    let keys = sample_keys(10_000);
    let r = ring(weighted_servers(&[1.0, 2.0, 3.0, 2.0]));
    let before = ownership(&r, &keys);

    r.remove(&server(0)).unwrap();
    let after = ownership(&r, &keys);

    let collateral = before
        .iter()
        .zip(after.iter())
        .filter(|(b, a)| b.as_str() != server(0) && b != a)
        .count();
    let ratio = collateral as f64 / keys.len() as f64;
    assert!(ratio < 0.15, "too many surviving keys moved: {collateral} ({ratio:.3})");
}

/// After the primary is removed, each key lands on the second server of
/// its former failover range.
#[test]
fn test_range_predicts_failover_owner() {
    init_tracing();
    let keys = sample_keys(2_000);
    let r = ring(equal_servers(4));
    let ranges: Vec<_> = keys
        .iter()
        .map(|k| r.range(k, Some(2), true).unwrap())
        .collect();

    r.remove(&server(1)).unwrap();

    for (key, range) in keys.iter().zip(&ranges) {
        if range[0].as_str() == server(1) {
            assert_eq!(r.get(key).unwrap().as_ref(), Some(&range[1]), "{key}");
        }
    }
}

/// Growing one server at a time hands each newcomer a fair share.
#[test]
fn test_incremental_growth_keeps_balance() {
    init_tracing();
    let keys = sample_keys(10_000);
    let r = ring(equal_servers(2));

    for n in 3..=6 {
        r.add(ServerSet::parse(&server(n - 1)).unwrap()).unwrap();
        assert_eq!(r.server_count(), n);
        assert_eq!(r.len(), n * 160);

        let counts = counts(&ownership(&r, &keys));
        assert_eq!(counts.len(), n, "every server should own keys");
        let newcomer = counts[server(n - 1).as_str()] as f64 / keys.len() as f64;
        let fair = 1.0 / n as f64;
        assert!(
            newcomer > fair * 0.5 && newcomer < fair * 1.5,
            "server {} owns {newcomer:.3} with {n} servers",
            n - 1
        );
    }
}

/// A swapped-in replacement serves exactly the replaced server's keys; a
/// later rebuild then places it by its own id.
#[test]
fn test_swap_replacement_then_rebuild() {
    init_tracing();
    let keys = sample_keys(5_000);
    let r = ring(equal_servers(3));
    let before = ownership(&r, &keys);
    let replacement = "10.0.9.9:11211";

    r.swap(&server(2), replacement).unwrap();
    let swapped = ownership(&r, &keys);
    for (b, s) in before.iter().zip(&swapped) {
        if b.as_str() == server(2) {
            assert_eq!(s.as_str(), replacement);
        } else {
            assert_eq!(b, s);
        }
    }

    r.rebuild().unwrap();
    let rebuilt = ownership(&r, &keys);
    let replacement_count = rebuilt.iter().filter(|o| o.as_str() == replacement).count();
    assert!(replacement_count > 0);
    assert_eq!(r.len(), 480);
}
