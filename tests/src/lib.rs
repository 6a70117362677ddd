//! Shared test harness for hashring integration tests.
//!
//! Provides deterministic key samples, server fixtures and an ownership
//! snapshot helper so scenarios can compare key placement before and after
//! ring mutations.

use std::collections::HashMap;

use hashring::{HashRing, RingOptions, ServerId, ServerSet, ServerSpec};
use tracing_subscriber::EnvFilter;

/// Install a console subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Safe to call from every test; only the first call installs it.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// `n` deterministic lookup keys.
pub fn sample_keys(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("key-{i}")).collect()
}

/// Descriptor of the `i`-th fixture server.
pub fn server(i: usize) -> String {
    format!("10.0.3.{i}:11211")
}

/// `n` equal-weight fixture servers.
pub fn equal_servers(n: usize) -> ServerSet {
    ServerSet::from_descriptors((0..n).map(server)).expect("fixture descriptors are valid")
}

/// Fixture servers with the given weights.
pub fn weighted_servers(weights: &[f64]) -> ServerSet {
    ServerSet::from_weighted(
        weights
            .iter()
            .enumerate()
            .map(|(i, &w)| (server(i), ServerSpec::Weight(w))),
    )
    .expect("fixture weights are valid")
}

/// Ring with default options.
pub fn ring(servers: ServerSet) -> HashRing {
    HashRing::new(servers, RingOptions::default()).expect("fixture ring builds")
}

/// Owner of every key, in key order.
pub fn ownership(ring: &HashRing, keys: &[String]) -> Vec<ServerId> {
    keys.iter()
        .map(|k| {
            ring.get(k)
                .expect("md5 never fails")
                .expect("ring is not empty")
        })
        .collect()
}

/// Keys owned per server.
pub fn counts(owners: &[ServerId]) -> HashMap<ServerId, usize> {
    let mut counts = HashMap::new();
    for owner in owners {
        *counts.entry(owner.clone()).or_default() += 1;
    }
    counts
}
