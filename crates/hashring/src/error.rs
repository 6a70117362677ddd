//! Error types for ring construction and lookup.

/// Errors that can occur while building or querying a ring.
///
/// An absent server is never an error: lookups on an empty ring return
/// `Ok(None)` and mutations on unknown ids are no-ops.
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    /// The configured digest algorithm name is not recognised.
    #[error("unknown digest algorithm: {0}")]
    UnknownAlgorithm(String),

    /// A custom digest provider failed.
    #[error("digest failed: {0}")]
    Digest(String),

    /// The digest is too short to yield the requested coordinate quartet.
    #[error("digest too short: need {needed} bytes, got {got}")]
    DigestTooShort {
        /// Bytes required to pack the quartet.
        needed: usize,
        /// Bytes the provider returned.
        got: usize,
    },

    /// A server descriptor could not be parsed.
    #[error("invalid server descriptor: {0:?}")]
    InvalidServer(String),

    /// A server weight is not a positive finite number.
    #[error("invalid weight {weight} for server {id}")]
    InvalidWeight {
        /// Server the weight was given for.
        id: String,
        /// The rejected weight.
        weight: f64,
    },

    /// The TOML configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
