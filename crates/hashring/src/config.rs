//! Ring options and TOML ring files.
//!
//! [`RingOptions`] carries the construction parameters; every field has a
//! default so an empty `[ring]` section is valid. [`RingFile`] pairs those
//! options with a `[servers]` table describing the weighted server mapping:
//!
//! ```toml
//! [ring]
//! vnode_count = 40
//! compatibility = "hash_ring"
//!
//! [servers]
//! "10.0.0.1:11211" = 1
//! "10.0.0.2:11211" = { weight = 2, vnodes = 60 }
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::RingError;
use crate::ring::HashRing;
use crate::server::{ServerSet, ServerSpec};

/// Default points per server, the classic ketama `40 * 4`.
pub const DEFAULT_POINTS_PER_SERVER: u32 = 160;
/// Default base vnode count.
pub const DEFAULT_VNODE_COUNT: u32 = 40;
/// Default lookup cache capacity.
pub const DEFAULT_MAX_CACHE_SIZE: usize = 5000;

/// Placement compatibility mode.
///
/// Selects how many coordinates are cut from each placement digest.
/// Unrecognised names fall back to [`Compatibility::None`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Compatibility {
    /// Ketama placement: four points per digest.
    #[default]
    None,
    /// Python `hash_ring` placement: three points per digest.
    HashRing,
}

impl Compatibility {
    /// Parse a mode name leniently.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "hash_ring" | "hashring" | "hash-ring" => Compatibility::HashRing,
            _ => Compatibility::None,
        }
    }

    /// Coordinates placed per digest in this mode.
    pub fn replicas(self) -> usize {
        match self {
            Compatibility::None => 4,
            Compatibility::HashRing => 3,
        }
    }
}

impl From<String> for Compatibility {
    fn from(name: String) -> Self {
        Self::from_name(&name)
    }
}

/// Construction parameters for a [`HashRing`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RingOptions {
    /// Nominal points per server, reported for diagnostics.
    pub points_per_server: u32,
    /// Base vnode count for servers without an override.
    pub vnode_count: u32,
    /// Placement compatibility mode.
    pub compatibility: Compatibility,
    /// Capacity of the lookup cache. 0 disables memoization.
    pub max_cache_size: usize,
    /// Built-in digest algorithm name.
    pub algorithm: String,
}

impl Default for RingOptions {
    fn default() -> Self {
        Self {
            points_per_server: DEFAULT_POINTS_PER_SERVER,
            vnode_count: DEFAULT_VNODE_COUNT,
            compatibility: Compatibility::None,
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            algorithm: "md5".to_string(),
        }
    }
}

impl RingOptions {
    /// Effective base vnode count; zero falls back to the default.
    pub fn vnodes(&self) -> u32 {
        if self.vnode_count == 0 {
            DEFAULT_VNODE_COUNT
        } else {
            self.vnode_count
        }
    }

    /// Coordinates placed per digest.
    pub fn replicas(&self) -> usize {
        self.compatibility.replicas()
    }
}

/// A ring described in TOML: options plus the weighted server mapping.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RingFile {
    /// `[ring]` section.
    pub ring: RingOptions,
    /// `[servers]` section, descriptor to weight specification.
    pub servers: IndexMap<String, ServerSpec>,
}

impl RingFile {
    /// Load a ring file from disk.
    pub fn load(path: &Path) -> Result<Self, RingError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a ring file from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, RingError> {
        Ok(toml::from_str(s)?)
    }

    /// Normalize the `[servers]` table into a [`ServerSet`].
    pub fn server_set(&self) -> Result<ServerSet, RingError> {
        ServerSet::from_weighted(self.servers.iter().map(|(k, v)| (k, *v)))
    }

    /// Construct the described ring.
    pub fn into_ring(self) -> Result<HashRing, RingError> {
        let servers = self.server_set()?;
        HashRing::new(servers, self.ring)
    }
}
