//! Wire types for the translation endpoint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::context::{EditorialStyle, RequestBatch, TranslationContext};
use crate::{BragiError, Result};

/// Body of `POST /api/translate`.
///
/// Every field is optional at the serde level so that a missing `apiKey` or
/// `texts` produces a readable validation error instead of a generic
/// deserialisation failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    #[serde(default)]
    pub texts: Vec<String>,
    #[serde(default)]
    pub from_lang: String,
    #[serde(default)]
    pub to_lang: String,
    #[serde(default)]
    pub glossary: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glossary_context: Option<String>,
    #[serde(default)]
    pub use_informal_tone: bool,
    #[serde(default)]
    pub prefer_short_forms: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

fn default_use_cache() -> bool {
    true
}

impl TranslateRequest {
    /// Check the request shape and split it into batch + API key.
    pub fn into_parts(self) -> Result<(RequestBatch, String)> {
        let api_key = match self.api_key {
            Some(key) if !key.trim().is_empty() => key,
            _ => return Err(BragiError::InvalidInput("API key is required".to_string())),
        };
        if self.texts.is_empty() {
            return Err(BragiError::InvalidInput("No texts to translate".to_string()));
        }
        if self.from_lang.trim().is_empty() || self.to_lang.trim().is_empty() {
            return Err(BragiError::InvalidInput(
                "fromLang and toLang are required".to_string(),
            ));
        }

        let context = TranslationContext {
            from_lang: self.from_lang,
            to_lang: self.to_lang,
            glossary: self.glossary,
            glossary_context: self.glossary_context.filter(|c| !c.is_empty()),
            style: EditorialStyle {
                informal_tone: self.use_informal_tone,
                prefer_short_forms: self.prefer_short_forms,
            },
            custom_prompt: self.custom_prompt.filter(|p| !p.is_empty()),
        };
        Ok((RequestBatch::new(self.texts, context), api_key))
    }
}

/// Body returned by `POST /api/translate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateResponse {
    pub translations: Vec<String>,
    pub info: TranslateInfo,
}

/// Bookkeeping attached to every translation response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateInfo {
    pub original_count: usize,
    pub translated_count: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub model: String,
    pub cache_type: String,
}
