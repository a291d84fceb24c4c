//! Public types for the Bragi API.

mod context;
mod request;

pub use context::{EditorialStyle, RequestBatch, TranslationContext};
pub use request::{TranslateInfo, TranslateRequest, TranslateResponse};
