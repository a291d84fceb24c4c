//! TranslationGateway - cached translation for incoming requests

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::Result;
use crate::backend::TranslationBackend;
use crate::cache::CacheStore;
use crate::reconcile::{CachePolicy, Reconciled, reconcile};
use crate::types::{RequestBatch, TranslateInfo, TranslateRequest, TranslateResponse};

/// Owns the cache store and translation backend shared by all requests.
///
/// Constructed once (via [`Bragi::builder()`](crate::Bragi::builder)) and
/// passed to request handlers; there is no process-wide cache.
#[derive(Clone)]
pub struct TranslationGateway {
    store: Arc<dyn CacheStore>,
    backend: Arc<dyn TranslationBackend>,
    ttl: Option<Duration>,
}

impl TranslationGateway {
    pub(crate) fn new(
        store: Arc<dyn CacheStore>,
        backend: Arc<dyn TranslationBackend>,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            store,
            backend,
            ttl,
        }
    }

    /// The shared cache store.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// TTL applied to freshly written entries.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Model reported by the backend.
    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Validate and serve a wire request.
    pub async fn translate(&self, request: TranslateRequest) -> Result<TranslateResponse> {
        let use_cache = request.use_cache;
        let (batch, api_key) = request.into_parts()?;
        let reconciled = self.translate_batch(&batch, &api_key, use_cache).await?;

        info!(
            from = %batch.context.from_lang,
            to = %batch.context.to_lang,
            texts = batch.len(),
            hits = reconciled.cache_hits,
            misses = reconciled.cache_misses,
            "translated batch"
        );

        Ok(TranslateResponse {
            info: TranslateInfo {
                original_count: batch.len(),
                translated_count: reconciled.translations.len(),
                cache_hits: reconciled.cache_hits,
                cache_misses: reconciled.cache_misses,
                model: self.model().to_string(),
                cache_type: self.store.kind().label().to_string(),
            },
            translations: reconciled.translations,
        })
    }

    /// Translate an already validated batch.
    pub async fn translate_batch(
        &self,
        batch: &RequestBatch,
        api_key: &str,
        use_cache: bool,
    ) -> Result<Reconciled> {
        let policy = if use_cache {
            CachePolicy::ReadWrite { ttl: self.ttl }
        } else {
            CachePolicy::Bypass
        };
        reconcile(
            batch,
            self.store.as_ref(),
            self.backend.as_ref(),
            api_key,
            policy,
        )
        .await
    }
}
