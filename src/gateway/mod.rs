//! Gateway construction and the translation entry point.

mod builder;
mod proxy;

pub use builder::{Bragi, BragiBuilder, CacheBackendKind, DEFAULT_TTL};
pub use proxy::TranslationGateway;
