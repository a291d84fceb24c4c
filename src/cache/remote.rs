//! Redis-backed store reached through an Upstash-style REST endpoint.
//!
//! Every command is a `POST` of a JSON command array to the endpoint root
//! with bearer-token auth:
//!
//! ```text
//! POST {url}
//! Authorization: Bearer {token}
//!
//! ["SET", "<key>", "<value>", "EX", 604800]
//! ```
//!
//! Replies are `{"result": ...}` on success and `{"error": "..."}` on a
//! rejected command.
//!
//! # Degradation
//!
//! Built without credentials, the store is disabled: lookups miss, writes
//! are dropped, admin operations report an empty cache. Every failure of a
//! configured store (network, non-2xx, error reply, malformed JSON) is
//! logged with enough context to tell misconfiguration, transient trouble
//! and rejected auth apart, and then folded into the contract described in
//! the [`cache`](crate::cache) module docs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{CacheEntry, CacheStore, StoreKind, now_millis};
use crate::fingerprint::CacheKey;
use crate::telemetry;
use crate::{BragiError, Result};

/// Environment variable holding the REST endpoint URL.
pub const URL_ENV_VAR: &str = "UPSTASH_REDIS_REST_URL";

/// Environment variable holding the REST bearer token.
pub const TOKEN_ENV_VAR: &str = "UPSTASH_REDIS_REST_TOKEN";

/// Default per-command timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 200;

/// Keys fetched per `MGET` during export.
const MGET_BATCH: usize = 100;

/// Per-key size estimate used for stats; the REST API exposes no memory figure.
const ESTIMATED_BYTES_PER_KEY: u64 = 100;

/// Endpoint URL and bearer token.
#[derive(Clone)]
pub struct RemoteCredentials {
    pub url: String,
    pub token: String,
}

impl RemoteCredentials {
    /// Both values, or `None` if either is blank.
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Option<Self> {
        let url = url.into().trim().trim_end_matches('/').to_string();
        let token = token.into().trim().to_string();
        if url.is_empty() || token.is_empty() {
            return None;
        }
        Some(Self { url, token })
    }

    /// Read credentials from `UPSTASH_REDIS_REST_URL` / `UPSTASH_REDIS_REST_TOKEN`.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var(URL_ENV_VAR).ok();
        let token = std::env::var(TOKEN_ENV_VAR).ok();
        debug!(
            has_url = url.is_some(),
            has_token = token.is_some(),
            "reading remote cache credentials from environment"
        );
        Self::new(url?, token?)
    }
}

impl std::fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("url", &self.url)
            .field("token", &format_args!("<{} chars>", self.token.len()))
            .finish()
    }
}

/// Value layout written by [`RemoteHttpStore::set_entry`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredValue {
    translation: String,
    #[serde(default)]
    created_at: Option<i64>,
}

/// Accept both the structured layout and bare strings written by older
/// deployments.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Structured(StoredValue),
    Legacy(String),
}

fn decode_value(raw: String) -> StoredValue {
    match serde_json::from_str::<RawValue>(&raw) {
        Ok(RawValue::Structured(value)) => value,
        Ok(RawValue::Legacy(translation)) => StoredValue {
            translation,
            created_at: None,
        },
        // Not JSON at all: the raw string is the translation.
        Err(_) => StoredValue {
            translation: raw,
            created_at: None,
        },
    }
}

/// Redis REST cache store.
pub struct RemoteHttpStore {
    http: Client,
    credentials: Option<RemoteCredentials>,
}

impl RemoteHttpStore {
    /// Create a store; `None` credentials yield a disabled store.
    pub fn new(credentials: Option<RemoteCredentials>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(crate::version::user_agent())
            .build()
            .map_err(|e| BragiError::Configuration(format!("failed to build HTTP client: {e}")))?;

        match &credentials {
            Some(creds) => info!(url = %creds.url, "remote cache store configured"),
            None => warn!(
                url_var = URL_ENV_VAR,
                token_var = TOKEN_ENV_VAR,
                "remote cache credentials missing; caching disabled"
            ),
        }

        Ok(Self { http, credentials })
    }

    /// Create a store from the standard environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(RemoteCredentials::from_env(), DEFAULT_TIMEOUT)
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Run one command, returning its `result` value (possibly `null`).
    async fn command(&self, operation: &'static str, args: Value) -> Result<Value> {
        let Some(creds) = &self.credentials else {
            return Err(BragiError::Configuration(
                "remote cache credentials not configured".to_string(),
            ));
        };

        let response = self
            .http
            .post(&creds.url)
            .bearer_auth(&creds.token)
            .json(&args)
            .send()
            .await
            .map_err(|e| {
                let transient = e.is_timeout() || e.is_connect();
                warn!(operation, transient, error = %e, "remote cache request failed");
                store_error(operation, format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 401 || status.as_u16() == 403 {
                warn!(operation, %status, "remote cache rejected credentials");
            } else {
                warn!(
                    operation,
                    %status,
                    body = %truncate(&body, 200),
                    "remote cache returned error status"
                );
            }
            return Err(store_error(operation, format!("HTTP {status}")));
        }

        let reply: Value = response.json().await.map_err(|e| {
            warn!(operation, error = %e, "remote cache returned malformed JSON");
            store_error(operation, format!("malformed reply: {e}"))
        })?;

        if let Some(message) = reply.get("error").and_then(Value::as_str) {
            warn!(operation, error = message, "remote cache command rejected");
            return Err(store_error(operation, message.to_string()));
        }

        match reply {
            Value::Object(mut map) if map.contains_key("result") => {
                Ok(map.remove("result").unwrap_or(Value::Null))
            }
            other => {
                let shown = other.to_string();
                warn!(
                    operation,
                    reply = %truncate(&shown, 200),
                    "remote cache reply has no result"
                );
                Err(store_error(operation, "reply has no result field".to_string()))
            }
        }
    }

    async fn scan_keys(&self, limit: usize) -> Result<Vec<CacheKey>> {
        let mut keys = Vec::new();
        let mut cursor = "0".to_string();
        while keys.len() < limit {
            let reply = self
                .command("scan", json!(["SCAN", cursor, "COUNT", SCAN_BATCH]))
                .await?;
            let (next, batch) = parse_scan_reply(reply)?;
            keys.extend(
                batch
                    .into_iter()
                    .take(limit - keys.len())
                    .map(CacheKey::from_raw),
            );
            if next == "0" {
                break;
            }
            cursor = next;
        }
        Ok(keys)
    }
}

#[async_trait]
impl CacheStore for RemoteHttpStore {
    fn kind(&self) -> StoreKind {
        if self.is_configured() {
            StoreKind::Remote
        } else {
            StoreKind::Disabled
        }
    }

    async fn get(&self, key: &CacheKey) -> Option<String> {
        if !self.is_configured() {
            return None;
        }
        match self.command("get", json!(["GET", key.as_str()])).await {
            Ok(Value::String(raw)) => Some(decode_value(raw).translation),
            Ok(Value::Null) => {
                debug!(key = key.preview(), "remote cache miss");
                None
            }
            Ok(other) => {
                warn!(key = key.preview(), kind = %json_kind(&other), "unexpected GET result type");
                metrics::counter!(
                    telemetry::STORE_ERRORS_TOTAL,
                    "store" => "remote",
                    "operation" => "get"
                )
                .increment(1);
                None
            }
            Err(_) => None,
        }
    }

    async fn set_entry(&self, key: &CacheKey, entry: CacheEntry) -> bool {
        if !self.is_configured() {
            return false;
        }
        let ttl = entry.ttl;
        let value = StoredValue {
            translation: entry.translation,
            created_at: Some(entry.created_at),
        };
        let encoded = match serde_json::to_string(&value) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key = key.preview(), error = %e, "failed to encode cache value");
                return false;
            }
        };

        let args = match ttl {
            Some(ttl) => json!(["SET", key.as_str(), encoded, "EX", ttl.as_secs().max(1)]),
            None => json!(["SET", key.as_str(), encoded]),
        };
        match self.command("set", args).await {
            Ok(Value::String(ok)) if ok == "OK" => true,
            Ok(other) => {
                warn!(key = key.preview(), reply = %other, "SET not acknowledged");
                false
            }
            Err(_) => false,
        }
    }

    async fn clear(&self) -> Result<usize> {
        if !self.is_configured() {
            return Ok(0);
        }
        // Count first; a failed count still lets the flush go ahead.
        let before = match self.size().await {
            Ok(n) => n,
            Err(e) => {
                warn!(error = %e, "could not read key count before flush");
                0
            }
        };

        match self.command("flushdb", json!(["FLUSHDB"])).await? {
            Value::String(ok) if ok == "OK" => {
                info!(deleted = before, "remote cache flushed");
                Ok(before)
            }
            other => Err(BragiError::Store(format!("FLUSHDB returned {other}"))),
        }
    }

    async fn size(&self) -> Result<usize> {
        if !self.is_configured() {
            return Ok(0);
        }
        let reply = self.command("dbsize", json!(["DBSIZE"])).await?;
        reply
            .as_u64()
            .map(|n| n as usize)
            .ok_or_else(|| BragiError::Store(format!("DBSIZE returned {reply}")))
    }

    async fn list_keys(&self, limit: usize) -> Result<Vec<CacheKey>> {
        if !self.is_configured() || limit == 0 {
            return Ok(Vec::new());
        }
        self.scan_keys(limit).await
    }

    async fn export(&self, limit: usize) -> Result<Vec<(CacheKey, CacheEntry)>> {
        let keys = self.list_keys(limit).await?;
        let mut entries = Vec::with_capacity(keys.len());

        for chunk in keys.chunks(MGET_BATCH) {
            let mut args = vec![Value::from("MGET")];
            args.extend(chunk.iter().map(|k| Value::from(k.as_str())));
            let values = match self.command("mget", Value::Array(args)).await? {
                Value::Array(values) => values,
                other => {
                    return Err(BragiError::Store(format!(
                        "MGET returned {}",
                        json_kind(&other)
                    )));
                }
            };

            // Keys that expired between SCAN and MGET come back as null.
            for (key, value) in chunk.iter().zip(values) {
                if let Value::String(raw) = value {
                    let stored = decode_value(raw);
                    entries.push((
                        key.clone(),
                        CacheEntry {
                            translation: stored.translation,
                            created_at: stored.created_at.unwrap_or_else(now_millis),
                            ttl: None,
                        },
                    ));
                }
            }
        }

        debug!(exported = entries.len(), "exported remote cache entries");
        Ok(entries)
    }

    async fn usage_estimate(&self) -> Result<u64> {
        Ok(self.size().await? as u64 * ESTIMATED_BYTES_PER_KEY)
    }
}

/// Split a `SCAN` reply (`[cursor, [keys...]]`) into cursor and keys.
///
/// Some REST front-ends return the cursor as a number, others as a string.
fn parse_scan_reply(reply: Value) -> Result<(String, Vec<String>)> {
    let Value::Array(mut parts) = reply else {
        return Err(BragiError::Store("SCAN reply is not an array".to_string()));
    };
    if parts.len() != 2 {
        return Err(BragiError::Store(format!(
            "SCAN reply has {} elements, expected 2",
            parts.len()
        )));
    }
    let keys = parts.pop().unwrap_or(Value::Null);
    let cursor = match parts.pop().unwrap_or(Value::Null) {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        other => return Err(BragiError::Store(format!("bad SCAN cursor {other}"))),
    };
    let keys = match keys {
        Value::Array(keys) => keys
            .into_iter()
            .filter_map(|k| k.as_str().map(str::to_string))
            .collect(),
        other => return Err(BragiError::Store(format!("bad SCAN key list {}", json_kind(&other)))),
    };
    Ok((cursor, keys))
}

fn store_error(operation: &'static str, message: String) -> BragiError {
    metrics::counter!(telemetry::STORE_ERRORS_TOTAL, "store" => "remote", "operation" => operation)
        .increment(1);
    BragiError::Store(format!("{operation}: {message}"))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_structured_value() {
        let v = decode_value(r#"{"translation":"Сохранить","createdAt":123}"#.to_string());
        assert_eq!(v.translation, "Сохранить");
        assert_eq!(v.created_at, Some(123));
    }

    #[test]
    fn decode_quoted_legacy_value() {
        let v = decode_value(r#""Отмена""#.to_string());
        assert_eq!(v.translation, "Отмена");
        assert_eq!(v.created_at, None);
    }

    #[test]
    fn decode_bare_legacy_value() {
        let v = decode_value("Отмена".to_string());
        assert_eq!(v.translation, "Отмена");
    }

    #[test]
    fn decode_non_string_json_keeps_raw_text() {
        let v = decode_value("42".to_string());
        assert_eq!(v.translation, "42");
    }

    #[test]
    fn scan_reply_with_string_cursor() {
        let (cursor, keys) = parse_scan_reply(json!(["17", ["a", "b"]])).unwrap();
        assert_eq!(cursor, "17");
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn scan_reply_with_numeric_cursor() {
        let (cursor, keys) = parse_scan_reply(json!([0, []])).unwrap();
        assert_eq!(cursor, "0");
        assert!(keys.is_empty());
    }

    #[test]
    fn scan_reply_malformed() {
        assert!(parse_scan_reply(json!({"cursor": 0})).is_err());
        assert!(parse_scan_reply(json!(["0"])).is_err());
    }

    #[test]
    fn credentials_require_both_values() {
        assert!(RemoteCredentials::new("https://x.upstash.io", "").is_none());
        assert!(RemoteCredentials::new("  ", "token").is_none());
        let creds = RemoteCredentials::new("https://x.upstash.io/", "token").unwrap();
        assert_eq!(creds.url, "https://x.upstash.io");
    }

    #[test]
    fn credentials_debug_hides_token() {
        let creds = RemoteCredentials::new("https://x.upstash.io", "secret-token").unwrap();
        let shown = format!("{creds:?}");
        assert!(!shown.contains("secret-token"));
        assert!(shown.contains("12 chars"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("привет", 3), "при");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
