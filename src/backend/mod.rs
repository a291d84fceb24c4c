//! Translation backends.
//!
//! A [`TranslationBackend`] turns an ordered list of texts into an ordered
//! list of translations in one call. Implementations classify their own
//! failures into the [`BragiError`](crate::BragiError) variants the HTTP
//! layer knows how to report (`AuthenticationFailed`, `RateLimited`,
//! `Unavailable`, `Api`); they do not need to guarantee the output length,
//! which the [reconciler](crate::reconcile) repairs.

pub mod anthropic;
pub mod prompt;

pub use anthropic::AnthropicBackend;

use async_trait::async_trait;

use crate::Result;
use crate::types::TranslationContext;

/// One batched call to an external translation service.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Model identifier reported in response metadata.
    fn model(&self) -> &str;

    /// Translate `texts` under `context`, authenticating with `api_key`.
    ///
    /// The returned vector should line up with `texts`, but callers must
    /// not rely on it.
    async fn translate(
        &self,
        texts: &[String],
        context: &TranslationContext,
        api_key: &str,
    ) -> Result<Vec<String>>;
}
