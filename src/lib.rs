//! Bragi - caching translation proxy for UI strings
//!
//! Clients send batches of short texts plus a language pair and editorial
//! context. Each text is fingerprinted; cached translations are served
//! directly and only the misses reach the model, in a single call per
//! batch. Results come back in input order, one per text.
//!
//! Two cache stores share the [`CacheStore`] contract: an in-memory FIFO
//! store with per-entry TTL, and a remote Redis store spoken to over an
//! Upstash-style REST API. A store failure never fails a translation.
//!
//! # Example
//!
//! ```rust,no_run
//! use bragi::{Bragi, TranslateRequest};
//!
//! #[tokio::main]
//! async fn main() -> bragi::Result<()> {
//!     let gateway = Bragi::builder().build()?;
//!
//!     let request: TranslateRequest = serde_json::from_value(serde_json::json!({
//!         "texts": ["Save", "Cancel"],
//!         "fromLang": "en",
//!         "toLang": "ru",
//!         "apiKey": "sk-ant-your-key",
//!     }))?;
//!
//!     let response = gateway.translate(request).await?;
//!     println!("{:?} ({} cached)", response.translations, response.info.cache_hits);
//!     Ok(())
//! }
//! ```

pub mod admin;
pub mod backend;
pub mod cache;
pub mod error;
pub mod fingerprint;
pub mod gateway;
pub mod reconcile;
#[cfg(feature = "server")]
pub mod server;
pub mod telemetry;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use admin::{AdminConfig, CacheAdmin, CacheSnapshot, CacheStats, ImportReport};
pub use backend::{AnthropicBackend, TranslationBackend};
pub use cache::{
    CacheEntry, CacheStore, InMemoryStore, RemoteCredentials, RemoteHttpStore, StoreKind,
};
pub use error::{BragiError, Result};
pub use fingerprint::{CacheKey, fingerprint};
pub use gateway::{Bragi, BragiBuilder, CacheBackendKind, TranslationGateway};
pub use reconcile::{CachePolicy, Reconciled, reconcile};
pub use version::PKG_VERSION;

pub use types::{
    EditorialStyle, RequestBatch, TranslateInfo, TranslateRequest, TranslateResponse,
    TranslationContext,
};
