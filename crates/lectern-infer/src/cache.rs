//! Query embedding cache.
//!
//! Asking the same question twice should not cost a second embedding call.
//! Entries are keyed by the trimmed query text, expire after a TTL, and the
//! least recently used entry goes first when the cache is full.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use ndarray::Array1;
use parking_lot::Mutex;
use serde::Serialize;

pub const DEFAULT_CAPACITY: usize = 1000;
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

struct Slot {
    vector: Array1<f32>,
    stored: Instant,
}

#[derive(Default)]
struct Lru {
    slots: HashMap<String, Slot>,
    /// Front is least recently used.
    recency: VecDeque<String>,
}

impl Lru {
    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }

    fn forget(&mut self, key: &str) {
        self.slots.remove(key);
        self.recency.retain(|k| k != key);
    }
}

/// Hit/miss counters, reported on the status endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Thread-safe LRU + TTL cache of query vectors.
pub struct QueryCache {
    lru: Mutex<Lru>,
    capacity: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl QueryCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            lru: Mutex::new(Lru::default()),
            capacity: capacity.max(1),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached vector for `query`, if present and fresh.
    pub fn get(&self, query: &str) -> Option<Array1<f32>> {
        let key = query.trim();
        let found = {
            let mut lru = self.lru.lock();
            match lru.slots.get(key) {
                Some(slot) if slot.stored.elapsed() < self.ttl => {
                    let vector = slot.vector.clone();
                    lru.touch(key);
                    Some(vector)
                }
                Some(_) => {
                    lru.forget(key);
                    None
                }
                None => None,
            }
        };
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Store `vector` for `query`, evicting the least recently used entries
    /// if the cache is full.
    pub fn put(&self, query: &str, vector: Array1<f32>) {
        let key = query.trim().to_string();
        let mut lru = self.lru.lock();

        if lru.slots.contains_key(&key) {
            lru.touch(&key);
        } else {
            while lru.slots.len() >= self.capacity {
                let Some(oldest) = lru.recency.pop_front() else {
                    break;
                };
                lru.slots.remove(&oldest);
            }
            lru.recency.push_back(key.clone());
        }
        lru.slots.insert(
            key,
            Slot {
                vector,
                stored: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.lru.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        let mut lru = self.lru.lock();
        lru.slots.clear();
        lru.recency.clear();
    }
}
