//! Translation cache stores.
//!
//! Two interchangeable backings for fingerprint → translation entries:
//!
//! - [`InMemoryStore`]: process-local map with a FIFO entry bound and lazy
//!   TTL expiry. Lives as long as the process; nothing survives a restart.
//!
//! - [`RemoteHttpStore`]: Redis behind an Upstash-style REST endpoint,
//!   shared by every proxy instance. Without credentials it runs in a
//!   disabled mode where every operation is a no-op.
//!
//! Both implement [`CacheStore`]. The store is picked once, at construction
//! time (see [`Bragi::builder()`](crate::Bragi::builder)), and shared as an
//! `Arc<dyn CacheStore>`.
//!
//! # Failure contract
//!
//! The translation path only calls [`get`](CacheStore::get) and
//! [`set`](CacheStore::set), which cannot fail: store trouble turns into a
//! miss or a dropped write, logged and counted but never returned. The
//! remaining operations back the admin surface and return
//! [`BragiError::Store`](crate::BragiError::Store) so it can report them.

pub mod memory;
pub mod remote;

pub use memory::InMemoryStore;
pub use remote::{RemoteCredentials, RemoteHttpStore};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::fingerprint::CacheKey;

/// A stored translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub translation: String,
    /// Unix timestamp in milliseconds.
    pub created_at: i64,
    /// `None` means the entry never expires on its own.
    pub ttl: Option<Duration>,
}

impl CacheEntry {
    /// New entry stamped with the current wall-clock time.
    pub fn new(translation: impl Into<String>, ttl: Option<Duration>) -> Self {
        Self {
            translation: translation.into(),
            created_at: now_millis(),
            ttl,
        }
    }
}

/// Which backing a store uses, as reported by the admin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    Remote,
    /// Remote store selected but credentials missing.
    Disabled,
}

impl StoreKind {
    /// Human-readable cache type label.
    pub fn label(&self) -> &'static str {
        match self {
            StoreKind::Memory => "In-memory",
            StoreKind::Remote => "Redis (Upstash)",
            StoreKind::Disabled => "Redis (not configured)",
        }
    }

    /// Machine-readable status reported when the store is healthy.
    pub fn status(&self) -> &'static str {
        match self {
            StoreKind::Memory => "memory",
            StoreKind::Remote => "connected",
            StoreKind::Disabled => "env_missing",
        }
    }
}

/// Fingerprint → translation storage.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backing kind, for stats and response metadata.
    fn kind(&self) -> StoreKind;

    /// Look up a live translation. Every failure reads as a miss.
    async fn get(&self, key: &CacheKey) -> Option<String>;

    /// Store a full entry, keeping its `created_at`. Returns `false` if the
    /// write was not acknowledged; failures are logged by the store and never
    /// propagated.
    async fn set_entry(&self, key: &CacheKey, entry: CacheEntry) -> bool;

    /// Store a translation stamped with the current time.
    async fn set(&self, key: &CacheKey, translation: &str, ttl: Option<Duration>) -> bool {
        self.set_entry(key, CacheEntry::new(translation, ttl)).await
    }

    /// Remove every entry, returning how many existed just before removal.
    async fn clear(&self) -> Result<usize>;

    /// Number of live entries.
    async fn size(&self) -> Result<usize>;

    /// Up to `limit` keys of live entries.
    async fn list_keys(&self, limit: usize) -> Result<Vec<CacheKey>>;

    /// Snapshot of up to `limit` live entries.
    async fn export(&self, limit: usize) -> Result<Vec<(CacheKey, CacheEntry)>>;

    /// Rough storage footprint in bytes.
    async fn usage_estimate(&self) -> Result<u64>;

    /// Write already-validated entries, returning how many were accepted.
    async fn import(&self, entries: Vec<(CacheKey, CacheEntry)>) -> usize {
        let mut accepted = 0;
        for (key, entry) in entries {
            if self.set_entry(&key, entry).await {
                accepted += 1;
            }
        }
        accepted
    }
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
