//! Integration test: rings described by configuration files.

use hashring::{HashRing, RingError, RingFile};
use hashring_compat::{LegacyOptions, build_ring, translate};
use hashring_integration_tests::{equal_servers, init_tracing, ownership, sample_keys};

#[test]
fn test_ring_file_matches_programmatic_ring() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ring.toml");
    std::fs::write(
        &path,
        r#"
[ring]
vnode_count = 40

[servers]
"10.0.3.0:11211" = 1
"10.0.3.1:11211" = 1
"10.0.3.2:11211" = { weight = 1 }
"#,
    )
    .unwrap();

    let from_file = RingFile::load(&path).unwrap().into_ring().unwrap();
    let programmatic = HashRing::new(equal_servers(3), Default::default()).unwrap();

    let keys = sample_keys(1_000);
    assert_eq!(ownership(&from_file, &keys), ownership(&programmatic, &keys));
}

#[test]
fn test_ring_file_with_overrides_and_compatibility() {
    init_tracing();
    let file = RingFile::from_toml(
        r#"
[ring]
compatibility = "hash_ring"
algorithm = "blake3"

[servers]
"a:1" = { weight = 1, vnodes = 10 }
"b:1" = 1
"#,
    )
    .unwrap();
    let ring = file.into_ring().unwrap();
    assert_eq!(ring.replicas(), 3);
    let points = ring.points(None);
    assert_eq!(points["a:1"].len(), 10 * 3);
    assert_eq!(points["b:1"].len(), 40 * 3);
}

#[test]
fn test_ring_file_unknown_algorithm() {
    let file = RingFile::from_toml("[ring]\nalgorithm = \"crc16\"\n[servers]\n\"a:1\" = 1\n").unwrap();
    assert!(matches!(file.into_ring(), Err(RingError::UnknownAlgorithm(_))));
}

#[test]
fn test_legacy_options_build_equivalent_ring() {
    init_tracing();
    let legacy = LegacyOptions::from_toml(
        r#"
"vnode count" = 40
"max cache size" = 100
"#,
    )
    .unwrap();
    assert_eq!(translate(&legacy).notices.len(), 2);

    let legacy_ring = build_ring(equal_servers(3), &legacy).unwrap();
    let modern_ring = HashRing::new(equal_servers(3), Default::default()).unwrap();
    assert_eq!(legacy_ring.continuum(), modern_ring.continuum());
}
