//! HTTP routes for the translation proxy and cache admin surface.
//!
//! Endpoints:
//! - POST /api/translate - translate a batch of texts
//! - GET  /api/cache/stats - entry count, size estimate, sample
//! - POST /api/cache/clear - remove every entry
//! - GET  /api/cache/export - versioned JSON snapshot
//! - POST /api/cache/import - load a snapshot
//! - GET  /health - returns "ok"
//!
//! Any other method on these paths gets 405 with a JSON error body, except
//! OPTIONS, which is answered 200 for CORS preflight.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{MethodRouter, get, post},
};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::admin::CacheAdmin;
use crate::error::BragiError;
use crate::gateway::TranslationGateway;
use crate::types::TranslateRequest;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub gateway: TranslationGateway,
    pub admin: CacheAdmin,
}

impl AppState {
    /// Admin surface over the gateway's own store.
    pub fn new(gateway: TranslationGateway, admin_config: crate::admin::AdminConfig) -> Self {
        let admin = CacheAdmin::new(gateway.store().clone(), admin_config);
        Self { gateway, admin }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/translate", with_fallbacks(post(translate)))
        .route("/api/cache/stats", with_fallbacks(get(cache_stats)))
        .route("/api/cache/clear", with_fallbacks(post(cache_clear)))
        .route("/api/cache/export", with_fallbacks(get(cache_export)))
        .route("/api/cache/import", with_fallbacks(post(cache_import)))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn with_fallbacks(route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    route.options(preflight).fallback(method_not_allowed)
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

async fn health() -> &'static str {
    "ok"
}

async fn translate(
    State(state): State<AppState>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(ApiError::from_rejection)?;
    let response = state.gateway.translate(request).await?;
    Ok(Json(response).into_response())
}

async fn cache_stats(State(state): State<AppState>) -> Response {
    Json(state.admin.stats().await).into_response()
}

async fn cache_clear(State(state): State<AppState>) -> Result<Response, ApiError> {
    let outcome = state.admin.clear().await?;
    Ok(Json(outcome).into_response())
}

async fn cache_export(State(state): State<AppState>) -> Result<Response, ApiError> {
    let snapshot = state.admin.export().await?;
    let filename = format!(
        "attachment; filename=\"translation-cache-{}.json\"",
        snapshot.exported.get(..10).unwrap_or("export")
    );
    let mut response = Json(snapshot).into_response();
    if let Ok(value) = HeaderValue::from_str(&filename) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

async fn cache_import(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(value) = payload.map_err(ApiError::from_rejection)?;
    let report = state.admin.import(&value).await?;
    Ok(Json(report).into_response())
}

/// Error returned by handlers; rendered as `{"error": message}`.
#[derive(Debug)]
pub struct ApiError(BragiError);

impl ApiError {
    fn from_rejection(rejection: JsonRejection) -> Self {
        Self(BragiError::InvalidInput(format!(
            "invalid request body: {}",
            rejection.body_text()
        )))
    }

    /// Status code for the wrapped error.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BragiError::InvalidInput(_) | BragiError::Json(_) => StatusCode::BAD_REQUEST,
            BragiError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            BragiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            BragiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            BragiError::Api { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            BragiError::EmptyResponse | BragiError::Store(_) => StatusCode::BAD_GATEWAY,
            BragiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BragiError> for ApiError {
    fn from(err: BragiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(status = status.as_u16(), error = %self.0, "request failed");
        }

        let message = match &self.0 {
            BragiError::InvalidInput(msg) => msg.clone(),
            BragiError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        };
        let mut response = error_response(status, &message);

        if let BragiError::RateLimited {
            retry_after: Some(after),
        } = &self.0
        {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(after.as_secs()));
        }
        response
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
