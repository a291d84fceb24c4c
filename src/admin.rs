//! Cache administration: stats, clear, export, import.
//!
//! [`CacheAdmin`] wraps the same `Arc<dyn CacheStore>` the gateway uses.
//! Unlike the translation path, admin operations surface store failures
//! (as [`BragiError::Store`]) so operators can see them, with one
//! exception: [`stats`](CacheAdmin::stats) always answers, reporting
//! trouble through its `status` field.
//!
//! # Snapshot format
//!
//! ```json
//! {
//!   "version": "1.1",
//!   "exported": "2026-01-01T00:00:00.000Z",
//!   "cacheType": "Redis (Upstash)",
//!   "totalKeys": 2,
//!   "exportedKeys": 2,
//!   "entries": { "<key>": { "translation": "Сохранить", "timestamp": 1700000000000 } }
//! }
//! ```
//!
//! Import accepts a full snapshot or just the `entries` map. Entries are
//! validated one by one; a malformed entry is rejected and reported without
//! aborting the rest.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::cache::{CacheEntry, CacheStore, StoreKind, now_millis};
use crate::fingerprint::CacheKey;
use crate::{BragiError, Result};

/// Snapshot format version written by [`CacheAdmin::export`].
pub const SNAPSHOT_VERSION: &str = "1.1";

/// Snapshot major version accepted by [`CacheAdmin::import`].
const SUPPORTED_MAJOR: &str = "1";

/// Default cap on exported entries.
pub const DEFAULT_EXPORT_LIMIT: usize = 1_000;

/// Default number of entries shown by [`CacheAdmin::stats`].
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// Longest translation preview in stats samples, in characters.
const PREVIEW_CHARS: usize = 50;

/// Limits for the admin surface.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Maximum entries per export. Default: 1,000.
    pub export_limit: usize,
    /// Entries shown in stats. Default: 5.
    pub sample_size: usize,
    /// TTL given to imported entries. Default: none.
    pub import_ttl: Option<Duration>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            export_limit: DEFAULT_EXPORT_LIMIT,
            sample_size: DEFAULT_SAMPLE_SIZE,
            import_ttl: None,
        }
    }
}

impl AdminConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn export_limit(mut self, n: usize) -> Self {
        self.export_limit = n;
        self
    }

    pub fn sample_size(mut self, n: usize) -> Self {
        self.sample_size = n;
        self
    }

    pub fn import_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.import_ttl = ttl;
        self
    }
}

/// Read-only overview of the cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_entries: usize,
    /// Storage-specific estimate in bytes.
    pub memory_usage: u64,
    pub cache_type: String,
    pub status: String,
    pub sample: Vec<SampleEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Truncated view of one entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleEntry {
    pub key: String,
    pub translation: String,
}

/// Result of [`CacheAdmin::clear`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearOutcome {
    pub success: bool,
    pub deleted_entries: usize,
    pub message: String,
}

/// Versioned export of cache contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    pub version: String,
    pub exported: String,
    pub cache_type: String,
    pub total_keys: usize,
    pub exported_keys: usize,
    pub entries: BTreeMap<String, SnapshotEntry>,
}

/// One exported entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub translation: String,
    /// Creation time, unix milliseconds.
    pub timestamp: i64,
}

/// Result of [`CacheAdmin::import`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub success: bool,
    pub imported_entries: usize,
    pub rejected_entries: usize,
    pub errors: Vec<String>,
}

/// Administrative operations over a shared store.
#[derive(Clone)]
pub struct CacheAdmin {
    store: Arc<dyn CacheStore>,
    config: AdminConfig,
}

impl CacheAdmin {
    pub fn new(store: Arc<dyn CacheStore>, config: AdminConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &AdminConfig {
        &self.config
    }

    /// Entry count, size estimate and a bounded sample.
    pub async fn stats(&self) -> CacheStats {
        let kind = self.store.kind();
        match self.collect_stats().await {
            Ok((total_entries, memory_usage, sample)) => CacheStats {
                total_entries,
                memory_usage,
                cache_type: kind.label().to_string(),
                status: kind.status().to_string(),
                sample,
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "cache stats unavailable");
                CacheStats {
                    total_entries: 0,
                    memory_usage: 0,
                    cache_type: kind.label().to_string(),
                    status: "store_error".to_string(),
                    sample: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn collect_stats(&self) -> Result<(usize, u64, Vec<SampleEntry>)> {
        let total = self.store.size().await?;
        let usage = self.store.usage_estimate().await?;
        let sample = self
            .store
            .export(self.config.sample_size)
            .await?
            .into_iter()
            .map(|(key, entry)| SampleEntry {
                key: format!("{}...", key.preview()),
                translation: preview(&entry.translation),
            })
            .collect();
        Ok((total, usage, sample))
    }

    /// Remove every entry.
    pub async fn clear(&self) -> Result<ClearOutcome> {
        if self.store.kind() == StoreKind::Disabled {
            return Ok(ClearOutcome {
                success: false,
                deleted_entries: 0,
                message: "Cache store not configured".to_string(),
            });
        }
        let deleted = self.store.clear().await?;
        info!(deleted, "cache cleared");
        Ok(ClearOutcome {
            success: true,
            deleted_entries: deleted,
            message: format!("Successfully cleared {deleted} cache entries"),
        })
    }

    /// Snapshot of up to `export_limit` entries.
    pub async fn export(&self) -> Result<CacheSnapshot> {
        let total_keys = self.store.size().await?;
        let entries: BTreeMap<String, SnapshotEntry> = self
            .store
            .export(self.config.export_limit)
            .await?
            .into_iter()
            .map(|(key, entry)| {
                (
                    key.as_str().to_string(),
                    SnapshotEntry {
                        translation: entry.translation,
                        timestamp: entry.created_at,
                    },
                )
            })
            .collect();

        info!(total_keys, exported = entries.len(), "cache exported");
        Ok(CacheSnapshot {
            version: SNAPSHOT_VERSION.to_string(),
            exported: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            cache_type: self.store.kind().label().to_string(),
            total_keys,
            exported_keys: entries.len(),
            entries,
        })
    }

    /// Import a snapshot (or a bare entry map), entry by entry.
    ///
    /// Only a payload that is not a JSON object, or a snapshot with an
    /// unsupported version, fails as a whole.
    pub async fn import(&self, payload: &Value) -> Result<ImportReport> {
        let entries = snapshot_entries(payload)?;
        let offered = entries.len();

        let mut errors = Vec::new();
        let mut valid = Vec::with_capacity(offered);
        for (key, value) in entries {
            match validate_entry(key, value, self.config.import_ttl) {
                Ok(entry) => valid.push(entry),
                Err(message) => errors.push(message),
            }
        }

        let attempted = valid.len();
        let imported = self.store.import(valid).await;
        if imported < attempted {
            errors.push(format!(
                "{} entries could not be written to the store",
                attempted - imported
            ));
        }

        info!(
            offered,
            imported,
            rejected = offered - imported,
            "cache import finished"
        );
        Ok(ImportReport {
            success: true,
            imported_entries: imported,
            rejected_entries: offered - imported,
            errors,
        })
    }
}

/// Locate the key → entry map in an import payload.
fn snapshot_entries(payload: &Value) -> Result<&Map<String, Value>> {
    let Value::Object(root) = payload else {
        return Err(BragiError::InvalidInput(
            "import payload must be a JSON object".to_string(),
        ));
    };

    if let Some(version) = root.get("version").and_then(Value::as_str) {
        let major = version.split('.').next().unwrap_or_default();
        if major != SUPPORTED_MAJOR {
            return Err(BragiError::InvalidInput(format!(
                "unsupported snapshot version {version} (supported: {SUPPORTED_MAJOR}.x)"
            )));
        }
    }

    match root.get("entries") {
        Some(Value::Object(entries)) => Ok(entries),
        Some(_) => Err(BragiError::InvalidInput(
            "\"entries\" must be a JSON object".to_string(),
        )),
        None => Ok(root),
    }
}

/// Shape-check one imported entry.
fn validate_entry(
    key: &str,
    value: &Value,
    ttl: Option<Duration>,
) -> std::result::Result<(CacheKey, CacheEntry), String> {
    if key.trim().is_empty() {
        return Err("entry with empty key".to_string());
    }
    let Value::Object(fields) = value else {
        return Err(format!("{key}: entry is not an object"));
    };
    let Some(translation) = fields.get("translation").and_then(Value::as_str) else {
        return Err(format!("{key}: missing string field \"translation\""));
    };
    let created_at = match fields.get("timestamp") {
        None | Some(Value::Null) => now_millis(),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(ts) => ts,
            None => return Err(format!("{key}: \"timestamp\" is not an integer")),
        },
        Some(_) => return Err(format!("{key}: \"timestamp\" must be a number")),
    };

    Ok((
        CacheKey::from_raw(key),
        CacheEntry {
            translation: translation.to_string(),
            created_at,
            ttl,
        },
    ))
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
