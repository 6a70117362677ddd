//! Translation of historical ring option spellings.
//!
//! Older configurations spell options with spaces (`"vnode count"`,
//! `"max cache size"`) or use names that no longer have an effect
//! (`"default port"`, `"replicas"`). [`translate`] maps them onto
//! [`RingOptions`] and reports each legacy spelling it saw as a
//! [`Deprecation`]. Nothing is remembered between calls: callers decide
//! whether and how often to surface the notices, typically via
//! [`Translated::log`].

use std::fmt;

use hashring::{Compatibility, HashRing, RingError, RingOptions, ServerSet};
use serde::Deserialize;
use tracing::warn;

/// Ring options as accepted by older configurations.
///
/// Modern names take precedence when both spellings are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LegacyOptions {
    /// `"vnode count"`, renamed to `vnode_count`.
    #[serde(rename = "vnode count")]
    pub spaced_vnode_count: Option<u32>,
    /// `"max cache size"`, renamed to `max_cache_size`.
    #[serde(rename = "max cache size")]
    pub spaced_max_cache_size: Option<usize>,
    /// `"default port"`, accepted and ignored.
    #[serde(rename = "default port")]
    pub default_port: Option<u16>,
    /// Old alias of the base vnode count.
    pub replicas: Option<u32>,
    /// Compatibility mode name.
    pub compatibility: Option<String>,
    /// Base vnode count.
    pub vnode_count: Option<u32>,
    /// Lookup cache capacity.
    pub max_cache_size: Option<usize>,
    /// Nominal points per server.
    pub points_per_server: Option<u32>,
    /// Digest algorithm name.
    pub algorithm: Option<String>,
}

impl LegacyOptions {
    /// Parse legacy options from a TOML document.
    pub fn from_toml(s: &str) -> Result<Self, RingError> {
        Ok(toml::from_str(s)?)
    }
}

/// A legacy option that was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deprecation {
    /// The spelling that was found.
    pub option: &'static str,
    /// Its modern replacement, if it still has an effect.
    pub replacement: Option<&'static str>,
}

impl fmt::Display for Deprecation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.replacement {
            Some(replacement) => write!(
                f,
                "option {:?} is deprecated, use {replacement:?} instead",
                self.option
            ),
            None => write!(f, "option {:?} is deprecated and has no effect", self.option),
        }
    }
}

/// Result of [`translate`].
#[derive(Debug, Clone, PartialEq)]
pub struct Translated {
    /// Effective options.
    pub options: RingOptions,
    /// Legacy spellings encountered, in a fixed order.
    pub notices: Vec<Deprecation>,
}

impl Translated {
    /// Emit every notice as a `warn` event.
    pub fn log(&self) {
        for notice in &self.notices {
            warn!(
                option = notice.option,
                replacement = notice.replacement.unwrap_or("none"),
                "{notice}"
            );
        }
    }
}

/// Map legacy options onto [`RingOptions`].
pub fn translate(legacy: &LegacyOptions) -> Translated {
    let mut options = RingOptions::default();
    let mut notices = Vec::new();

    if legacy.replicas.is_some() {
        notices.push(Deprecation {
            option: "replicas",
            replacement: Some("vnode_count"),
        });
    }
    if legacy.spaced_vnode_count.is_some() {
        notices.push(Deprecation {
            option: "vnode count",
            replacement: Some("vnode_count"),
        });
    }
    if legacy.spaced_max_cache_size.is_some() {
        notices.push(Deprecation {
            option: "max cache size",
            replacement: Some("max_cache_size"),
        });
    }
    if legacy.default_port.is_some() {
        notices.push(Deprecation {
            option: "default port",
            replacement: None,
        });
    }

    if let Some(vnodes) = legacy
        .vnode_count
        .or(legacy.spaced_vnode_count)
        .or(legacy.replicas)
    {
        options.vnode_count = vnodes;
    }
    if let Some(size) = legacy.max_cache_size.or(legacy.spaced_max_cache_size) {
        options.max_cache_size = size;
    }
    if let Some(points) = legacy.points_per_server {
        options.points_per_server = points;
    }
    if let Some(mode) = &legacy.compatibility {
        options.compatibility = Compatibility::from_name(mode);
    }
    if let Some(algorithm) = &legacy.algorithm {
        options.algorithm = algorithm.clone();
    }

    Translated { options, notices }
}

/// Translate `legacy`, log its notices and build the ring.
pub fn build_ring(servers: ServerSet, legacy: &LegacyOptions) -> Result<HashRing, RingError> {
    let translated = translate(legacy);
    translated.log();
    HashRing::new(servers, translated.options)
}
