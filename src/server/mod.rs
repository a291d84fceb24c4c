//! HTTP service mode.
//!
//! This module provides:
//! - Configuration types (`config`)
//! - The axum router, handlers and error mapping (`routes`)
//! - [`build_state`], which wires a [`Config`](config::Config) into a
//!   gateway and admin surface sharing one store

pub mod config;
pub mod routes;

pub use routes::{ApiError, AppState, router};

use std::sync::Arc;

use crate::Result;
use crate::backend::AnthropicBackend;
use crate::gateway::{Bragi, TranslationGateway};
use config::Config;

/// Build a [`TranslationGateway`] from configuration.
pub fn build_gateway(config: &Config) -> Result<TranslationGateway> {
    let backend =
        AnthropicBackend::with_timeout(&config.backend.base_url, config.backend.timeout())?
            .with_model(&config.backend.model)
            .max_tokens(config.backend.max_tokens);

    Bragi::builder()
        .cache_backend(config.cache.backend)
        .max_entries(config.cache.max_entries)
        .remote(config.cache.remote_credentials())
        .remote_timeout(config.cache.remote_timeout())
        .ttl(config.cache.ttl())
        .backend(Arc::new(backend))
        .build()
}

/// Gateway plus admin surface, ready for [`router`].
pub fn build_state(config: &Config) -> Result<AppState> {
    let gateway = build_gateway(config)?;
    Ok(AppState::new(gateway, config.cache.admin_config()))
}
