//! Memoization of key to server lookups.
//!
//! The ring only needs five capabilities from its cache, captured by
//! [`LookupCache`]: get, set, clear, iterate and count. [`LruCache`] is the default
//! bounded implementation; any other policy can be plugged in through
//! [`HashRing::with_cache`](crate::HashRing::with_cache).

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tracing::trace;

use crate::server::ServerId;

/// Storage for memoized lookups.
///
/// Implementations are shared between concurrent readers of the ring and so
/// must synchronize internally.
pub trait LookupCache: Send + Sync {
    /// Cached owner of `key`, if any.
    fn get(&self, key: &str) -> Option<ServerId>;

    /// Record `server` as the owner of `key`.
    fn set(&self, key: &str, server: ServerId);

    /// Drop every entry.
    fn clear(&self);

    /// Snapshot of all `(key, server)` entries.
    fn entries(&self) -> Vec<(String, ServerId)>;

    /// Number of entries, without materializing them.
    fn len(&self) -> usize;

    /// Whether the cache holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Thread-safe LRU cache bounded by entry count.
///
/// All operations take a single lock; the critical section is in-memory
/// map and queue work only.
pub struct LruCache {
    max_entries: usize,
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    /// Keys by recency of lookup; `pop_front` yields the next key to drop.
    order: VecDeque<String>,
    data: HashMap<String, ServerId>,
}

impl LruCache {
    /// Create a cache holding at most `max_entries` lookups.
    ///
    /// A `max_entries` of 0 disables caching entirely.
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            inner: Mutex::new(CacheInner {
                order: VecDeque::new(),
                data: HashMap::new(),
            }),
        }
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.max_entries
    }
}

impl LookupCache for LruCache {
    fn get(&self, key: &str) -> Option<ServerId> {
        let mut inner = self.inner.lock();
        let server = inner.data.get(key)?.clone();

        // A hit makes this key the most recently routed.
        if let Some(pos) = inner.order.iter().position(|k| k == key) {
            if let Some(k) = inner.order.remove(pos) {
                inner.order.push_back(k);
            }
        }

        Some(server)
    }

    fn set(&self, key: &str, server: ServerId) {
        if self.max_entries == 0 {
            return;
        }

        let mut inner = self.inner.lock();

        // Overwrite in place; position is refreshed like a read.
        if let Some(existing) = inner.data.get_mut(key) {
            *existing = server;
            if let Some(pos) = inner.order.iter().position(|k| k == key) {
                if let Some(k) = inner.order.remove(pos) {
                    inner.order.push_back(k);
                }
            }
            return;
        }

        while inner.data.len() >= self.max_entries {
            let Some(evicted) = inner.order.pop_front() else {
                break;
            };
            inner.data.remove(&evicted);
            trace!(key = %evicted, "evicted cached lookup");
        }

        inner.data.insert(key.to_string(), server);
        inner.order.push_back(key.to_string());
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.data.clear();
        inner.order.clear();
    }

    fn entries(&self) -> Vec<(String, ServerId)> {
        let inner = self.inner.lock();
        inner
            .order
            .iter()
            .filter_map(|k| inner.data.get(k).map(|s| (k.clone(), s.clone())))
            .collect()
    }

    fn len(&self) -> usize {
        self.inner.lock().data.len()
    }
}
