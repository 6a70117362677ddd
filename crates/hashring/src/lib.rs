//! Weighted consistent hashing ring for routing keys to backend servers.
//!
//! This crate implements a ketama-style continuum: every server is placed on
//! a 32-bit ring at many digest-derived points, proportional to its weight,
//! and a key is owned by the first point at or after its own hash. Adding or
//! removing a server only moves the keys on the arcs that server gains or
//! loses.
//!
//! - [`HashRing`] is the shared, lock-guarded ring with lookup memoization.
//! - [`ServerSet`] normalizes `host:port` descriptors and weighted mappings.
//! - [`DigestProvider`] abstracts the digest; [`Algorithm`] has the built-ins.
//! - [`LookupCache`] abstracts the memo; [`LruCache`] is the default.
//! - [`RingOptions`] and [`RingFile`] carry configuration, optionally from TOML.

pub mod cache;
pub mod config;
pub mod continuum;
pub mod digest;
mod error;
mod ring;
pub mod server;

pub use cache::{LookupCache, LruCache};
pub use config::{Compatibility, RingFile, RingOptions};
pub use continuum::RingPoint;
pub use digest::{Algorithm, DigestProvider};
pub use error::RingError;
pub use ring::HashRing;
pub use server::{Server, ServerId, ServerSet, ServerSpec};
