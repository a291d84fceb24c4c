//! Builder for configuring gateway instances

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use super::TranslationGateway;
use crate::Result;
use crate::backend::{AnthropicBackend, TranslationBackend};
use crate::cache::memory::DEFAULT_MAX_ENTRIES;
use crate::cache::remote::DEFAULT_TIMEOUT;
use crate::cache::{CacheStore, InMemoryStore, RemoteCredentials, RemoteHttpStore};

/// Default lifetime of a cached translation: one week.
pub const DEFAULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Main entry point for creating gateway instances.
pub struct Bragi;

impl Bragi {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> BragiBuilder {
        BragiBuilder::new()
    }
}

/// Which cache store to construct.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    /// Remote when credentials are present, in-memory otherwise.
    #[default]
    Auto,
    Memory,
    /// Remote store; disabled (every operation a no-op) without credentials.
    Remote,
}

/// Builder for configuring gateway instances.
pub struct BragiBuilder {
    store: Option<Arc<dyn CacheStore>>,
    backend_kind: CacheBackendKind,
    max_entries: usize,
    remote_credentials: Option<RemoteCredentials>,
    remote_timeout: Duration,
    backend: Option<Arc<dyn TranslationBackend>>,
    ttl: Option<Duration>,
}

impl BragiBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            backend_kind: CacheBackendKind::default(),
            max_entries: DEFAULT_MAX_ENTRIES,
            remote_credentials: None,
            remote_timeout: DEFAULT_TIMEOUT,
            backend: None,
            ttl: Some(DEFAULT_TTL),
        }
    }

    /// Use an already constructed store; overrides every other cache setting.
    pub fn store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Choose the cache store variant.
    pub fn cache_backend(mut self, kind: CacheBackendKind) -> Self {
        self.backend_kind = kind;
        self
    }

    /// Entry bound for the in-memory store.
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    /// Remote store credentials (`None` leaves the remote store disabled).
    pub fn remote(mut self, credentials: Option<RemoteCredentials>) -> Self {
        self.remote_credentials = credentials;
        self
    }

    /// Per-command timeout for the remote store.
    pub fn remote_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    /// Translation backend (default: [`AnthropicBackend`] against the public API).
    pub fn backend(mut self, backend: Arc<dyn TranslationBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Lifetime of freshly written entries; `None` keeps them until evicted.
    pub fn ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Build the gateway.
    pub fn build(self) -> Result<TranslationGateway> {
        let store: Arc<dyn CacheStore> = match self.store {
            Some(store) => store,
            None => {
                let kind = match (self.backend_kind, &self.remote_credentials) {
                    (CacheBackendKind::Auto, Some(_)) => CacheBackendKind::Remote,
                    (CacheBackendKind::Auto, None) => CacheBackendKind::Memory,
                    (kind, _) => kind,
                };
                match kind {
                    CacheBackendKind::Remote => Arc::new(RemoteHttpStore::new(
                        self.remote_credentials,
                        self.remote_timeout,
                    )?),
                    _ => Arc::new(InMemoryStore::with_max_entries(self.max_entries)),
                }
            }
        };

        let backend: Arc<dyn TranslationBackend> = match self.backend {
            Some(backend) => backend,
            None => Arc::new(AnthropicBackend::new()?),
        };

        info!(
            cache = store.kind().label(),
            model = backend.model(),
            ttl_secs = self.ttl.map(|t| t.as_secs()),
            "translation gateway ready"
        );

        Ok(TranslationGateway::new(store, backend, self.ttl))
    }
}

impl Default for BragiBuilder {
    fn default() -> Self {
        Self::new()
    }
}
