//! Process-local translation store.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use super::{CacheEntry, CacheStore, StoreKind};
use crate::Result;
use crate::fingerprint::CacheKey;

/// Default maximum number of entries.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Bookkeeping bytes charged per entry by [`usage_estimate`](CacheStore::usage_estimate).
const ENTRY_OVERHEAD_BYTES: u64 = 64;

/// In-memory store bounded by entry count.
///
/// Overflow evicts the oldest *inserted* entry (FIFO). Reads do not refresh
/// an entry's position; overwriting a key does, since it counts as a new
/// insertion. Expired entries are dropped lazily: on the `get` that finds
/// them, and in bulk before any size, listing or export.
///
/// Expiry is measured with [`tokio::time::Instant`], so tests can drive it
/// with a paused clock.
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    max_entries: usize,
}

struct Slot {
    entry: CacheEntry,
    inserted_at: Instant,
    seq: u64,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        self.entry
            .ttl
            .is_some_and(|ttl| now.saturating_duration_since(self.inserted_at) >= ttl)
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, Slot>,
    /// Insertion order. Holds stale `(seq, key)` pairs for overwritten or
    /// removed keys; a pair is live only while its seq matches the slot.
    order: VecDeque<(u64, CacheKey)>,
    next_seq: u64,
}

impl Inner {
    fn is_live(&self, seq: u64, key: &CacheKey) -> bool {
        self.entries.get(key).is_some_and(|slot| slot.seq == seq)
    }

    fn insert(&mut self, key: CacheKey, entry: CacheEntry, max_entries: usize) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.order.push_back((seq, key.clone()));
        self.entries.insert(
            key,
            Slot {
                entry,
                inserted_at: Instant::now(),
                seq,
            },
        );

        while self.entries.len() > max_entries {
            let Some((seq, key)) = self.order.pop_front() else {
                break;
            };
            if self.is_live(seq, &key) {
                self.entries.remove(&key);
                debug!(key = key.preview(), "evicted oldest cache entry");
            }
        }

        if self.order.len() > self.entries.len() * 2 + 16 {
            self.compact();
        }
    }

    fn purge_expired(&mut self) {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| !slot.is_expired(now));
        let purged = before - self.entries.len();
        if purged > 0 {
            debug!(purged, "purged expired cache entries");
            self.compact();
        }
    }

    fn compact(&mut self) {
        let entries = &self.entries;
        self.order
            .retain(|(seq, key)| entries.get(key).is_some_and(|slot| slot.seq == *seq));
    }

    /// Live entries, oldest insertion first.
    fn ordered(&self) -> impl Iterator<Item = (&CacheKey, &Slot)> {
        self.order.iter().filter_map(|(seq, key)| {
            self.entries
                .get_key_value(key)
                .filter(|(_, slot)| slot.seq == *seq)
        })
    }
}

impl InMemoryStore {
    /// Create a store with the default bound (10,000 entries).
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    /// Create a store holding at most `max` entries (at least one).
    pub fn with_max_entries(max: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_entries: max.max(1),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    // A panic while holding the lock cannot leave a half-written slot behind
    // (every mutation is a single map/deque call), so a poisoned lock is
    // still safe to use.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    fn kind(&self) -> StoreKind {
        StoreKind::Memory
    }

    async fn get(&self, key: &CacheKey) -> Option<String> {
        let mut inner = self.lock();
        let slot = inner.entries.get(key)?;
        if !slot.is_expired(Instant::now()) {
            return Some(slot.entry.translation.clone());
        }
        inner.entries.remove(key);
        debug!(key = key.preview(), "cache entry expired");
        None
    }

    async fn set_entry(&self, key: &CacheKey, entry: CacheEntry) -> bool {
        self.lock().insert(key.clone(), entry, self.max_entries);
        true
    }

    async fn clear(&self) -> Result<usize> {
        let mut inner = self.lock();
        inner.purge_expired();
        let removed = inner.entries.len();
        inner.entries.clear();
        inner.order.clear();
        Ok(removed)
    }

    async fn size(&self) -> Result<usize> {
        let mut inner = self.lock();
        inner.purge_expired();
        Ok(inner.entries.len())
    }

    async fn list_keys(&self, limit: usize) -> Result<Vec<CacheKey>> {
        let mut inner = self.lock();
        inner.purge_expired();
        Ok(inner
            .ordered()
            .take(limit)
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn export(&self, limit: usize) -> Result<Vec<(CacheKey, CacheEntry)>> {
        let mut inner = self.lock();
        inner.purge_expired();
        Ok(inner
            .ordered()
            .take(limit)
            .map(|(key, slot)| (key.clone(), slot.entry.clone()))
            .collect())
    }

    async fn usage_estimate(&self) -> Result<u64> {
        let mut inner = self.lock();
        inner.purge_expired();
        Ok(inner
            .entries
            .iter()
            .map(|(key, slot)| {
                (key.as_str().len() + slot.entry.translation.len()) as u64 + ENTRY_OVERHEAD_BYTES
            })
            .sum())
    }
}
