//! Digest providers and ring coordinate packing.
//!
//! Ring coordinates are unsigned 32-bit values cut from a digest four bytes
//! at a time. Quartet `q` covers bytes `4q..4q + 4` and is read big-endian:
//! `d[o] << 24 | d[o+1] << 16 | d[o+2] << 8 | d[o+3]`. Placement depends on
//! this exact ordering, so any change moves keys between servers.

use std::fmt;
use std::str::FromStr;

use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::Sha256;

use crate::error::RingError;

/// Something that turns bytes into a deterministic digest.
///
/// Built-in algorithms and custom functions are invoked the same way. A
/// provider must return at least `4 * replicas` bytes for continuum
/// construction and at least 4 bytes for key hashing.
pub trait DigestProvider: Send + Sync {
    /// Digest `input`.
    fn digest(&self, input: &[u8]) -> Result<Vec<u8>, RingError>;
}

impl<F> DigestProvider for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>, RingError> + Send + Sync,
{
    fn digest(&self, input: &[u8]) -> Result<Vec<u8>, RingError> {
        self(input)
    }
}

/// Built-in digest algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// MD5, 16 bytes. The ketama default.
    #[default]
    Md5,
    /// SHA-1, 20 bytes.
    Sha1,
    /// SHA-256, 32 bytes.
    Sha256,
    /// BLAKE3, 32 bytes.
    Blake3,
}

impl Algorithm {
    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Md5 => "md5",
            Algorithm::Sha1 => "sha1",
            Algorithm::Sha256 => "sha256",
            Algorithm::Blake3 => "blake3",
        }
    }

    /// Digest length in bytes.
    pub fn output_len(self) -> usize {
        match self {
            Algorithm::Md5 => 16,
            Algorithm::Sha1 => 20,
            Algorithm::Sha256 | Algorithm::Blake3 => 32,
        }
    }
}

impl DigestProvider for Algorithm {
    fn digest(&self, input: &[u8]) -> Result<Vec<u8>, RingError> {
        Ok(match self {
            Algorithm::Md5 => Md5::digest(input).to_vec(),
            Algorithm::Sha1 => Sha1::digest(input).to_vec(),
            Algorithm::Sha256 => Sha256::digest(input).to_vec(),
            Algorithm::Blake3 => blake3::hash(input).as_bytes().to_vec(),
        })
    }
}

impl FromStr for Algorithm {
    type Err = RingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(Algorithm::Md5),
            "sha1" => Ok(Algorithm::Sha1),
            "sha256" => Ok(Algorithm::Sha256),
            "blake3" => Ok(Algorithm::Blake3),
            _ => Err(RingError::UnknownAlgorithm(s.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pack quartet `quartet` of `digest` into a ring coordinate.
pub fn coordinate(digest: &[u8], quartet: usize) -> Result<u32, RingError> {
    let offset = quartet * 4;
    let bytes: [u8; 4] = digest
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .ok_or(RingError::DigestTooShort {
            needed: offset + 4,
            got: digest.len(),
        })?;
    Ok(u32::from_be_bytes(bytes))
}

/// Ring coordinate of a lookup key: quartet 0 of its digest.
pub fn hash_value(provider: &dyn DigestProvider, key: &[u8]) -> Result<u32, RingError> {
    coordinate(&provider.digest(key)?, 0)
}
