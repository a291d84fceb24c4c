//! Cache fingerprints for translation requests.
//!
//! A [`CacheKey`] identifies one (text, source language, target language,
//! context, custom prompt) tuple. The key is a BLAKE3 digest over the five
//! fields, each framed with an 8-byte little-endian length prefix so that
//! field boundaries can never shift: `("ab", "c")` and `("a", "bc")` hash
//! different byte streams. The custom prompt additionally carries a presence
//! byte, keeping "no custom prompt" distinct from an empty one.
//!
//! # Truncation
//!
//! Keys keep the first 128 bits of the digest (32 hex characters). This
//! keeps remote-store keys short, at the cost of collision resistance: a
//! birthday collision becomes likely only around 2^64 distinct keys, which
//! is far above the size of any UI string catalogue. Widen
//! [`KEY_BYTES`] if the keyspace ever stops being "UI strings".

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::TranslationContext;

/// Digest bytes kept in a key (hex-encoded, so keys are twice as long).
pub const KEY_BYTES: usize = 16;

/// Domain separator, bumped whenever the framing below changes.
const KEY_DOMAIN: &[u8] = b"bragi.translation.v1";

/// Opaque fixed-length cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an existing key string (e.g. one read back from a store or an
    /// import snapshot). No validation beyond what the caller does.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix suitable for logs and stats previews.
    pub fn preview(&self) -> &str {
        let end = self.0.len().min(8);
        self.0.get(..end).unwrap_or(&self.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Fingerprint a single text under the given parameters.
pub fn fingerprint(
    text: &str,
    from_lang: &str,
    to_lang: &str,
    context: &str,
    custom_prompt: Option<&str>,
) -> CacheKey {
    let mut hasher = blake3::Hasher::new();
    hasher.update(KEY_DOMAIN);
    for field in [text, from_lang, to_lang, context] {
        update_framed(&mut hasher, field);
    }
    match custom_prompt {
        Some(prompt) => {
            hasher.update(&[1]);
            update_framed(&mut hasher, prompt);
        }
        None => {
            hasher.update(&[0]);
        }
    }

    let hex = hasher.finalize().to_hex();
    CacheKey(hex.as_str()[..KEY_BYTES * 2].to_string())
}

/// Fingerprint a text under a full [`TranslationContext`].
pub fn fingerprint_in(text: &str, context: &TranslationContext) -> CacheKey {
    fingerprint(
        text,
        &context.from_lang,
        &context.to_lang,
        &context.context_string(),
        context.custom_prompt.as_deref(),
    )
}

fn update_framed(hasher: &mut blake3::Hasher, field: &str) {
    hasher.update(&(field.len() as u64).to_le_bytes());
    hasher.update(field.as_bytes());
}
