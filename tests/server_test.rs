//! HTTP-level tests for the axum router: validation, status mapping, CORS
//! and the cache admin endpoints.

#![cfg(feature = "server")]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use tower::ServiceExt;

use bragi::server::{AppState, router};
use bragi::{
    AdminConfig, Bragi, BragiError, InMemoryStore, Result, TranslationBackend, TranslationContext,
};

// ============================================================================
// Mock backends
// ============================================================================

/// Echoes texts with a `ru:` prefix and counts calls.
#[derive(Default)]
struct EchoBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl TranslationBackend for EchoBackend {
    fn model(&self) -> &str {
        "echo-model"
    }

    async fn translate(
        &self,
        texts: &[String],
        context: &TranslationContext,
        _api_key: &str,
    ) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| format!("{}:{t}", context.to_lang))
            .collect())
    }
}

/// Fails every call with a fixed error.
struct ErrorBackend(fn() -> BragiError);

#[async_trait]
impl TranslationBackend for ErrorBackend {
    fn model(&self) -> &str {
        "error-model"
    }

    async fn translate(
        &self,
        _texts: &[String],
        _context: &TranslationContext,
        _api_key: &str,
    ) -> Result<Vec<String>> {
        Err((self.0)())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn app_with(backend: Arc<dyn TranslationBackend>) -> axum::Router {
    let gateway = Bragi::builder()
        .store(Arc::new(InMemoryStore::new()))
        .backend(backend)
        .build()
        .unwrap();
    router(AppState::new(gateway, AdminConfig::default()))
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn translate_body() -> Value {
    json!({
        "texts": ["Save", "Cancel"],
        "fromLang": "en",
        "toLang": "ru",
        "apiKey": "sk-ant-test"
    })
}

// ============================================================================
// Translate endpoint
// ============================================================================

#[tokio::test]
async fn translate_returns_translations_and_info() {
    let backend = Arc::new(EchoBackend::default());
    let app = app_with(backend.clone());

    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/api/translate", translate_body()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["translations"], json!(["ru:Save", "ru:Cancel"]));
    assert_eq!(body["info"]["originalCount"], 2);
    assert_eq!(body["info"]["translatedCount"], 2);
    assert_eq!(body["info"]["cacheHits"], 0);
    assert_eq!(body["info"]["cacheMisses"], 2);
    assert_eq!(body["info"]["model"], "echo-model");
    assert_eq!(body["info"]["cacheType"], "In-memory");

    // Second request is served from the shared store.
    let response = app
        .oneshot(json_request(Method::POST, "/api/translate", translate_body()))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["info"]["cacheHits"], 2);
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn use_cache_false_bypasses_store() {
    let backend = Arc::new(EchoBackend::default());
    let app = app_with(backend.clone());
    let mut body = translate_body();
    body["useCache"] = json!(false);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/translate", body.clone()))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["info"]["cacheHits"], 0);
    }
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn missing_api_key_is_bad_request() {
    let app = app_with(Arc::new(EchoBackend::default()));
    let mut body = translate_body();
    body.as_object_mut().unwrap().remove("apiKey");

    let response = app
        .oneshot(json_request(Method::POST, "/api/translate", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "API key is required");
}

#[tokio::test]
async fn empty_texts_is_bad_request() {
    let backend = Arc::new(EchoBackend::default());
    let app = app_with(backend.clone());
    let mut body = translate_body();
    body["texts"] = json!([]);

    let response = app
        .oneshot(json_request(Method::POST, "/api/translate", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No texts to translate");
    assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_json_is_bad_request() {
    let app = app_with(Arc::new(EchoBackend::default()));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/translate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

// ============================================================================
// Backend error mapping
// ============================================================================

async fn status_for(make: fn() -> BragiError) -> Response {
    app_with(Arc::new(ErrorBackend(make)))
        .oneshot(json_request(Method::POST, "/api/translate", translate_body()))
        .await
        .unwrap()
}

#[tokio::test]
async fn backend_auth_failure_is_unauthorized() {
    let response =
        status_for(|| BragiError::AuthenticationFailed("invalid x-api-key".into())).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn backend_rate_limit_is_too_many_requests() {
    let response = status_for(|| BragiError::RateLimited {
        retry_after: Some(Duration::from_secs(20)),
    })
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "20");
}

#[tokio::test]
async fn backend_unreachable_is_service_unavailable() {
    let response = status_for(|| BragiError::Unavailable("connection refused".into())).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn backend_other_status_passes_through() {
    let response = status_for(|| BragiError::Api {
        status: 529,
        message: "Overloaded".into(),
    })
    .await;
    assert_eq!(response.status().as_u16(), 529);
    assert_eq!(body_json(response).await["error"], "Overloaded");
}

// ============================================================================
// Methods and CORS
// ============================================================================

#[tokio::test]
async fn wrong_method_is_405_with_json_body() {
    let app = app_with(Arc::new(EchoBackend::default()));
    let response = app
        .oneshot(empty_request(Method::GET, "/api/translate"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_json(response).await["error"], "Method not allowed");
}

#[tokio::test]
async fn plain_options_is_ok_with_empty_body() {
    let app = app_with(Arc::new(EchoBackend::default()));
    let response = app
        .oneshot(empty_request(Method::OPTIONS, "/api/translate"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let app = app_with(Arc::new(EchoBackend::default()));
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/translate")
        .header(header::ORIGIN, "https://figma.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
    );
}

#[tokio::test]
async fn health_is_ok() {
    let app = app_with(Arc::new(EchoBackend::default()));
    let response = app
        .oneshot(empty_request(Method::GET, "/health"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

// ============================================================================
// Admin endpoints
// ============================================================================

#[tokio::test]
async fn stats_reflect_translations() {
    let app = app_with(Arc::new(EchoBackend::default()));
    app.clone()
        .oneshot(json_request(Method::POST, "/api/translate", translate_body()))
        .await
        .unwrap();

    let response = app
        .oneshot(empty_request(Method::GET, "/api/cache/stats"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["totalEntries"], 2);
    assert_eq!(body["status"], "memory");
    assert_eq!(body["sample"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn export_import_clear_cycle() {
    let app = app_with(Arc::new(EchoBackend::default()));
    app.clone()
        .oneshot(json_request(Method::POST, "/api/translate", translate_body()))
        .await
        .unwrap();

    // Export
    let response = app
        .clone()
        .oneshot(empty_request(Method::GET, "/api/cache/export"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .is_some_and(|v| v.to_str().unwrap_or_default().starts_with("attachment"))
    );
    let snapshot = body_json(response).await;
    assert_eq!(snapshot["exportedKeys"], 2);

    // Clear
    let response = app
        .clone()
        .oneshot(empty_request(Method::POST, "/api/cache/clear"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["deletedEntries"], 2);

    // Import the snapshot back
    let response = app
        .clone()
        .oneshot(json_request(Method::POST, "/api/cache/import", snapshot))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["importedEntries"], 2);
    assert_eq!(body["rejectedEntries"], 0);

    let response = app
        .oneshot(empty_request(Method::GET, "/api/cache/stats"))
        .await
        .unwrap();
    assert_eq!(body_json(response).await["totalEntries"], 2);
}

#[tokio::test]
async fn import_non_object_is_bad_request() {
    let app = app_with(Arc::new(EchoBackend::default()));
    let response = app
        .oneshot(json_request(Method::POST, "/api/cache/import", json!([1, 2, 3])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_wrong_method_is_405() {
    let app = app_with(Arc::new(EchoBackend::default()));
    let response = app
        .oneshot(empty_request(Method::GET, "/api/cache/clear"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
