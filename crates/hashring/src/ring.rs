//! The consistent hashing ring.
//!
//! [`HashRing`] guards its continuum, server set and lookup cache behind one
//! reader/writer lock. Lookups (`get`, `find`, `range`, `points`) share the
//! read lock; mutations hold the write lock for their whole duration so a
//! half-built continuum is never observable.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::cache::{LookupCache, LruCache};
use crate::config::RingOptions;
use crate::continuum::{self, RingPoint};
use crate::digest::{self, Algorithm, DigestProvider};
use crate::error::RingError;
use crate::server::{Server, ServerId, ServerSet};

/// Weighted consistent hashing ring mapping keys to servers.
pub struct HashRing {
    /// Base vnode count for servers without an override.
    vnodes: u32,
    /// Coordinates cut from each placement digest. Fixed at construction.
    replicas: usize,
    points_per_server: u32,
    digest: Box<dyn DigestProvider>,
    state: RwLock<RingState>,
}

struct RingState {
    /// Sorted ascending by coordinate.
    continuum: Vec<RingPoint>,
    servers: ServerSet,
    cache: Box<dyn LookupCache>,
}

impl HashRing {
    /// Build a ring using the built-in algorithm named in `options`.
    pub fn new(servers: ServerSet, options: RingOptions) -> Result<Self, RingError> {
        let algorithm: Algorithm = options.algorithm.parse()?;
        Self::with_digest(servers, algorithm, options)
    }

    /// Build a ring with a custom digest provider.
    ///
    /// `options.algorithm` is ignored.
    pub fn with_digest(
        servers: ServerSet,
        digest: impl DigestProvider + 'static,
        options: RingOptions,
    ) -> Result<Self, RingError> {
        let cache = LruCache::new(options.max_cache_size);
        Self::with_cache(servers, digest, cache, options)
    }

    /// Build a ring with a custom digest provider and lookup cache.
    pub fn with_cache(
        servers: ServerSet,
        digest: impl DigestProvider + 'static,
        cache: impl LookupCache + 'static,
        options: RingOptions,
    ) -> Result<Self, RingError> {
        let vnodes = options.vnodes();
        let replicas = options.replicas();
        let continuum = continuum::build(&servers, vnodes, replicas, &digest)?;

        info!(
            servers = servers.len(),
            points = continuum.len(),
            vnodes,
            replicas,
            "created hash ring"
        );

        Ok(Self {
            vnodes,
            replicas,
            points_per_server: options.points_per_server,
            digest: Box::new(digest),
            state: RwLock::new(RingState {
                continuum,
                servers,
                cache: Box::new(cache),
            }),
        })
    }

    /// Ring coordinate of `key`.
    pub fn hash_value(&self, key: &str) -> Result<u32, RingError> {
        digest::hash_value(self.digest.as_ref(), key.as_bytes())
    }

    /// Index of the first point at or after `hash`, wrapping to the start.
    ///
    /// Returns `None` on an empty ring.
    pub fn find(&self, hash: u32) -> Option<usize> {
        let state = self.state.read();
        if state.continuum.is_empty() {
            return None;
        }
        Some(continuum::find(&state.continuum, hash))
    }

    /// Server owning `key`, or `None` if the ring is empty.
    ///
    /// Cached lookups return without hashing.
    pub fn get(&self, key: &str) -> Result<Option<ServerId>, RingError> {
        let state = self.state.read();
        if let Some(server) = state.cache.get(key) {
            return Ok(Some(server));
        }
        if state.continuum.is_empty() {
            return Ok(None);
        }

        let hash = self.hash_value(key)?;
        let server = state.continuum[continuum::find(&state.continuum, hash)]
            .server
            .clone();
        state.cache.set(key, server.clone());
        Ok(Some(server))
    }

    /// Servers met walking the ring clockwise from `key`'s position.
    ///
    /// Collects up to `size` ids (default: the number of servers), skipping
    /// ids already collected when `unique` is set. The walk covers the ring
    /// at most once, so fewer ids come back when the ring runs out.
    pub fn range(
        &self,
        key: &str,
        size: Option<usize>,
        unique: bool,
    ) -> Result<Vec<ServerId>, RingError> {
        let state = self.state.read();
        if state.continuum.is_empty() {
            return Ok(Vec::new());
        }

        let size = size.unwrap_or(state.servers.len());
        let position = continuum::find(&state.continuum, self.hash_value(key)?);
        let (before, after) = state.continuum.split_at(position);

        let mut servers = Vec::with_capacity(size.min(state.servers.len().max(1)));
        for point in after.iter().chain(before) {
            if servers.len() >= size {
                break;
            }
            if unique && servers.contains(&point.server) {
                continue;
            }
            servers.push(point.server.clone());
        }
        Ok(servers)
    }

    /// Coordinates owned by each server, ascending.
    ///
    /// With `filter`, only the listed ids that are members are reported.
    pub fn points(&self, filter: Option<&[&str]>) -> BTreeMap<ServerId, Vec<u32>> {
        let state = self.state.read();
        let mut owned: BTreeMap<ServerId, Vec<u32>> = match filter {
            Some(ids) => ids
                .iter()
                .filter_map(|id| state.servers.get(id))
                .map(|s| (s.id.clone(), Vec::new()))
                .collect(),
            None => state
                .servers
                .iter()
                .map(|s| (s.id.clone(), Vec::new()))
                .collect(),
        };

        for point in &state.continuum {
            if let Some(coordinates) = owned.get_mut(point.server.as_str()) {
                coordinates.push(point.coordinate);
            }
        }
        owned
    }

    /// Add servers and rebuild the continuum.
    ///
    /// Ids already on the ring keep their existing entry.
    pub fn add(&self, servers: ServerSet) -> Result<(), RingError> {
        let mut state = self.state.write();
        let mut added = 0usize;
        for server in servers.iter() {
            if state.servers.insert(server.clone()) {
                added += 1;
            } else {
                debug!(server = %server.id, "server already on ring, skipping");
            }
        }
        info!(added, servers = state.servers.len(), "adding servers to ring");
        self.rebuild_locked(&mut state)
    }

    /// Remove a server and rebuild the continuum. Unknown ids are ignored.
    pub fn remove(&self, id: &str) -> Result<(), RingError> {
        let mut state = self.state.write();
        if state.servers.remove(id).is_none() {
            debug!(server = id, "remove of unknown server ignored");
            return Ok(());
        }
        info!(server = id, servers = state.servers.len(), "removing server from ring");
        self.rebuild_locked(&mut state)
    }

    /// Hand every point and cached lookup owned by `from` over to `to`.
    ///
    /// Positions are not recomputed: `to` inherits exactly `from`'s arcs and
    /// weight, with host and port parsed from `to`. If `to` is already on the
    /// ring both label sets now resolve to it; that aliasing is left to the
    /// caller. Unknown `from` ids are ignored.
    pub fn swap(&self, from: &str, to: &str) -> Result<(), RingError> {
        let replacement = Server::parse(to)?;
        let to_id = replacement.id.clone();

        let mut state = self.state.write();
        if !state.servers.contains(from) {
            debug!(server = from, "swap of unknown server ignored");
            return Ok(());
        }
        if from != to_id.as_str() && state.servers.contains(to_id.as_str()) {
            warn!(from, to = %to_id, "swap target already on ring, ownership is now aliased");
        }
        state.servers.rename(from, replacement);

        let mut relabelled = 0usize;
        for point in state.continuum.iter_mut() {
            if point.server == *from {
                point.server = to_id.clone();
                relabelled += 1;
            }
        }

        let mut rewritten = 0usize;
        for (key, server) in state.cache.entries() {
            if server == *from {
                state.cache.set(&key, to_id.clone());
                rewritten += 1;
            }
        }

        info!(from, to = %to_id, relabelled, rewritten, "swapped server");
        Ok(())
    }

    /// Recompute the continuum from the current server set.
    ///
    /// If the digest provider fails the ring is left empty.
    pub fn rebuild(&self) -> Result<(), RingError> {
        let mut state = self.state.write();
        self.rebuild_locked(&mut state)
    }

    /// Clear the continuum and lookup cache. The server set is kept.
    pub fn reset(&self) {
        let mut state = self.state.write();
        state.continuum.clear();
        state.cache.clear();
        debug!("reset ring");
    }

    /// Clear everything, including the server set.
    ///
    /// The ring is empty afterwards; it is not meant to be reused.
    pub fn teardown(&self) {
        let mut state = self.state.write();
        state.continuum.clear();
        state.cache.clear();
        state.servers.clear();
        debug!("tore down ring");
    }

    fn rebuild_locked(&self, state: &mut RingState) -> Result<(), RingError> {
        state.continuum.clear();
        state.cache.clear();
        state.continuum = continuum::build(
            &state.servers,
            self.vnodes,
            self.replicas,
            self.digest.as_ref(),
        )?;
        Ok(())
    }

    /// Whether `id` is on the ring.
    pub fn has(&self, id: &str) -> bool {
        self.state.read().servers.contains(id)
    }

    /// A copy of the server entry for `id`.
    pub fn server(&self, id: &str) -> Option<Server> {
        self.state.read().servers.get(id).cloned()
    }

    /// Copies of all servers in insertion order.
    pub fn servers(&self) -> Vec<Server> {
        self.state.read().servers.iter().cloned().collect()
    }

    /// Per-server vnode overrides.
    pub fn vnode_overrides(&self) -> HashMap<ServerId, u32> {
        self.state.read().servers.vnode_overrides()
    }

    /// Snapshot of the continuum.
    pub fn continuum(&self) -> Vec<RingPoint> {
        self.state.read().continuum.clone()
    }

    /// Number of points on the ring.
    pub fn len(&self) -> usize {
        self.state.read().continuum.len()
    }

    /// Whether the ring has no points.
    pub fn is_empty(&self) -> bool {
        self.state.read().continuum.is_empty()
    }

    /// Number of servers in the server set.
    pub fn server_count(&self) -> usize {
        self.state.read().servers.len()
    }

    /// Number of memoized lookups.
    pub fn cached_lookups(&self) -> usize {
        self.state.read().cache.len()
    }

    /// Coordinates placed per digest.
    pub fn replicas(&self) -> usize {
        self.replicas
    }

    /// Base vnode count.
    pub fn vnode_count(&self) -> u32 {
        self.vnodes
    }

    /// Nominal points per server from the options.
    pub fn points_per_server(&self) -> u32 {
        self.points_per_server
    }
}

impl fmt::Debug for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("HashRing")
            .field("vnodes", &self.vnodes)
            .field("replicas", &self.replicas)
            .field("servers", &state.servers.len())
            .field("points", &state.continuum.len())
            .field("cached", &state.cache.len())
            .finish()
    }
}
