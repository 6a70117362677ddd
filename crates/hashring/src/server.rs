//! Server descriptors and the weighted server set.
//!
//! A [`ServerSet`] is the normalized input to the continuum builder: an
//! insertion-ordered map from canonical id to [`Server`]. It is produced from
//! plain `host:port` descriptors or from a weighted mapping of descriptor to
//! [`ServerSpec`].

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::RingError;

/// Canonical server identifier, cheap to clone.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerId(Arc<str>);

impl ServerId {
    /// Return the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ServerId {
    fn from(id: &str) -> Self {
        Self(Arc::from(id))
    }
}

impl From<String> for ServerId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl Borrow<str> for ServerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ServerId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ServerId {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for ServerId {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServerId({})", self.0)
    }
}

/// A backend server that can own keys on the ring.
#[derive(Debug, Clone, PartialEq)]
pub struct Server {
    /// Canonical id, the trimmed descriptor the server was parsed from.
    pub id: ServerId,
    /// Host name or address.
    pub host: String,
    /// Port, if the descriptor carried one.
    pub port: Option<u16>,
    /// Relative weight. Always positive and finite.
    pub weight: f64,
    /// Per-server override of the base vnode count.
    pub vnodes: Option<u32>,
}

impl Server {
    /// Parse a `host`, `host:port` or `[v6-addr]:port` descriptor.
    pub fn parse(descriptor: &str) -> Result<Self, RingError> {
        let id = descriptor.trim();
        if id.is_empty() {
            return Err(RingError::InvalidServer(descriptor.to_string()));
        }
        let (host, port) = split_host_port(id)?;
        Ok(Self {
            id: ServerId::from(id),
            host,
            port,
            weight: 1.0,
            vnodes: None,
        })
    }

    /// Set the server's weight, rejecting non-positive or non-finite values.
    pub fn with_weight(mut self, weight: f64) -> Result<Self, RingError> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(RingError::InvalidWeight {
                id: self.id.to_string(),
                weight,
            });
        }
        self.weight = weight;
        Ok(self)
    }

    /// Override the base vnode count for this server. Zero clears the override.
    pub fn with_vnodes(mut self, vnodes: u32) -> Self {
        self.vnodes = (vnodes > 0).then_some(vnodes);
        self
    }
}

fn split_host_port(descriptor: &str) -> Result<(String, Option<u16>), RingError> {
    let invalid = || RingError::InvalidServer(descriptor.to_string());
    let parse_port = |p: &str| p.parse::<u16>().map_err(|_| invalid());

    let (host, port) = if let Some(rest) = descriptor.strip_prefix('[') {
        let (host, tail) = rest.split_once(']').ok_or_else(invalid)?;
        let port = match tail {
            "" => None,
            _ => Some(parse_port(tail.strip_prefix(':').ok_or_else(invalid)?)?),
        };
        (host, port)
    } else {
        match descriptor.rsplit_once(':') {
            // More than one colon without brackets: a bare IPv6 address.
            Some((host, _)) if host.contains(':') => (descriptor, None),
            Some((host, port)) => (host, Some(parse_port(port)?)),
            None => (descriptor, None),
        }
    };

    if host.is_empty() {
        return Err(invalid());
    }
    Ok((host.to_string(), port))
}

/// Weight specification for one entry of a weighted server mapping.
///
/// In TOML either a bare number (`"10.0.0.1:11211" = 2`) or a table
/// (`"10.0.0.1:11211" = { weight = 2, vnodes = 80 }`).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ServerSpec {
    /// Weight only.
    Weight(f64),
    /// Weight and vnode override.
    Detailed {
        /// Relative weight, defaults to 1.
        #[serde(default)]
        weight: Option<f64>,
        /// Vnode count override.
        #[serde(default)]
        vnodes: Option<u32>,
    },
}

impl ServerSpec {
    fn apply(self, server: Server) -> Result<Server, RingError> {
        match self {
            ServerSpec::Weight(weight) => server.with_weight(weight),
            ServerSpec::Detailed { weight, vnodes } => {
                let server = server.with_weight(weight.unwrap_or(1.0))?;
                Ok(match vnodes {
                    Some(v) => server.with_vnodes(v),
                    None => server,
                })
            }
        }
    }
}

/// Insertion-ordered set of servers keyed by canonical id.
#[derive(Debug, Clone, Default)]
pub struct ServerSet {
    servers: IndexMap<ServerId, Server>,
}

impl ServerSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set holding a single server descriptor.
    pub fn parse(descriptor: &str) -> Result<Self, RingError> {
        Self::from_descriptors([descriptor])
    }

    /// Build a set of equal-weight servers from descriptors.
    ///
    /// Duplicate descriptors collapse to the first occurrence.
    pub fn from_descriptors<I, S>(descriptors: I) -> Result<Self, RingError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for descriptor in descriptors {
            set.insert(Server::parse(descriptor.as_ref())?);
        }
        Ok(set)
    }

    /// Build a set from a weighted mapping of descriptor to [`ServerSpec`].
    pub fn from_weighted<I, S>(entries: I) -> Result<Self, RingError>
    where
        I: IntoIterator<Item = (S, ServerSpec)>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for (descriptor, spec) in entries {
            set.insert(spec.apply(Server::parse(descriptor.as_ref())?)?);
        }
        Ok(set)
    }

    /// Insert a server unless its id is already present.
    ///
    /// Returns `false` (and leaves the existing entry untouched) on a duplicate.
    pub fn insert(&mut self, server: Server) -> bool {
        if self.servers.contains_key(&server.id) {
            return false;
        }
        self.servers.insert(server.id.clone(), server);
        true
    }

    /// Remove a server by id, returning it if it was present.
    pub fn remove(&mut self, id: &str) -> Option<Server> {
        self.servers.shift_remove(id)
    }

    /// Replace the entry for `from` with `to`, keeping `from`'s position,
    /// weight and vnode override.
    ///
    /// If `to` is already a member its existing entry wins and `from` is
    /// simply dropped. Returns `false` when `from` is not a member.
    pub fn rename(&mut self, from: &str, to: Server) -> bool {
        let Some((index, _, old)) = self.servers.shift_remove_full(from) else {
            return false;
        };
        if self.servers.contains_key(&to.id) {
            return true;
        }
        let renamed = Server {
            weight: old.weight,
            vnodes: old.vnodes,
            ..to
        };
        self.servers.shift_insert(index, renamed.id.clone(), renamed);
        true
    }

    /// Look up a server by id.
    pub fn get(&self, id: &str) -> Option<&Server> {
        self.servers.get(id)
    }

    /// Whether a server with this id is a member.
    pub fn contains(&self, id: &str) -> bool {
        self.servers.contains_key(id)
    }

    /// Number of servers.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Sum of all server weights.
    pub fn total_weight(&self) -> f64 {
        self.servers.values().map(|s| s.weight).sum()
    }

    /// Server ids in insertion order.
    pub fn ids(&self) -> Vec<ServerId> {
        self.servers.keys().cloned().collect()
    }

    /// Iterate servers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Server> {
        self.servers.values()
    }

    /// Per-server vnode overrides. Keys are always members of the set.
    pub fn vnode_overrides(&self) -> HashMap<ServerId, u32> {
        self.servers
            .values()
            .filter_map(|s| s.vnodes.map(|v| (s.id.clone(), v)))
            .collect()
    }

    /// Remove every server.
    pub fn clear(&mut self) {
        self.servers.clear();
    }
}

impl FromIterator<Server> for ServerSet {
    fn from_iter<T: IntoIterator<Item = Server>>(iter: T) -> Self {
        let mut set = Self::new();
        for server in iter {
            set.insert(server);
        }
        set
    }
}
