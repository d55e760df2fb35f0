use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A cached value with its insertion time and access stamp.
struct Entry<V> {
    value: V,
    inserted_at: Instant,
    last_access: u64,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    /// Monotonic access counter; higher = more recently used.
    clock: u64,
}

/// Bounded in-memory cache with per-entry TTL and LRU eviction.
///
/// Staleness is judged by each entry's own insertion time, so an entry
/// can expire regardless of how recently it was accessed; eviction under
/// capacity pressure removes the least-recently-*accessed* entry.
///
/// One process-wide instance is created at startup and shared; `clear`
/// exists for test isolation, not for production resets.
pub struct MetadataCache<V> {
    ttl: Duration,
    capacity: usize,
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> MetadataCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                clock: 0,
            }),
        }
    }

    /// Get a fresh value. Expired entries are dropped on the way out;
    /// a hit counts as an access for LRU purposes.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut inner = self.inner.lock().unwrap();
        let fresh = match inner.entries.get(key) {
            Some(entry) => entry.inserted_at.elapsed() < self.ttl,
            None => return None,
        };
        if !fresh {
            inner.entries.remove(key);
            return None;
        }
        inner.clock += 1;
        let clock = inner.clock;
        let entry = inner.entries.get_mut(key)?;
        entry.last_access = clock;
        Some(entry.value.clone())
    }

    /// Store a value, evicting the least-recently-accessed entry when
    /// the cache is at capacity.
    pub fn set(&self, key: &str, value: V) {
        let mut inner = self.inner.lock().unwrap();
        inner.clock += 1;
        let clock = inner.clock;
        inner.entries.insert(
            key.to_string(),
            Entry {
                value,
                inserted_at: Instant::now(),
                last_access: clock,
            },
        );

        if inner.entries.len() > self.capacity {
            if let Some(lru_key) = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone())
            {
                tracing::debug!("metadata cache evicting '{lru_key}'");
                inner.entries.remove(&lru_key);
            }
        }
    }

    /// Drop every entry. For test isolation.
    pub fn clear(&self) {
        self.inner.lock().unwrap().entries.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
