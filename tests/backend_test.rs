//! Integration tests for [`AnthropicBackend`] against a wiremock Messages
//! API: request shape, reply parsing and status classification.

use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use bragi::{AnthropicBackend, BragiError, TranslationBackend, TranslationContext};

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn reply(text: &str) -> Value {
    json!({
        "id": "msg_01",
        "type": "message",
        "role": "assistant",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn"
    })
}

async fn backend_for(server: &MockServer) -> AnthropicBackend {
    AnthropicBackend::with_base_url(server.uri())
        .unwrap()
        .with_model("claude-test")
}

// =============================================================================
// Success path
// =============================================================================

#[tokio::test]
async fn translate_sends_key_and_parses_lines() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(|req: &Request| {
            let Ok(body) = serde_json::from_slice::<Value>(&req.body) else {
                return false;
            };
            let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
            body["model"] == "claude-test"
                && body["max_tokens"] == 4000
                && prompt.contains("1. Save")
                && prompt.contains("2. Cancel")
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("Сохранить\nОтмена\n")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server).await;
    let out = backend
        .translate(
            &texts(&["Save", "Cancel"]),
            &TranslationContext::new("en", "ru"),
            "sk-ant-test",
        )
        .await
        .unwrap();

    assert_eq!(out, texts(&["Сохранить", "Отмена"]));
    assert_eq!(backend.model(), "claude-test");
}

#[tokio::test]
async fn prompt_carries_glossary_and_style() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(|req: &Request| {
            let Ok(body) = serde_json::from_slice::<Value>(&req.body) else {
                return false;
            };
            let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
            prompt.contains("\"Save\" → \"Сохранить\"")
                && prompt.contains("bakery checkout")
                && prompt.contains("informally")
                && prompt.contains("Keep it playful")
        })
        .respond_with(ResponseTemplate::new(200).set_body_json(reply("Сохранить")))
        .expect(1)
        .mount(&server)
        .await;

    let context = TranslationContext::new("en", "ru")
        .glossary_term("Save", "Сохранить")
        .glossary_context("bakery checkout")
        .informal_tone(true)
        .custom_prompt("Keep it playful");

    let backend = backend_for(&server).await;
    let out = backend
        .translate(&texts(&["Save"]), &context, "key")
        .await
        .unwrap();
    assert_eq!(out, texts(&["Сохранить"]));
}

#[tokio::test]
async fn blank_lines_dropped_and_numbering_stripped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(reply("1. Один\n\n  2. Два  \n")),
        )
        .mount(&server)
        .await;

    let backend = backend_for(&server).await;
    let out = backend
        .translate(
            &texts(&["One", "Two"]),
            &TranslationContext::new("en", "ru"),
            "key",
        )
        .await
        .unwrap();
    assert_eq!(out, texts(&["Один", "Два"]));
}

#[tokio::test]
async fn reply_without_text_block_is_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "tool_use", "id": "t", "name": "x", "input": {}}]
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server).await;
    let err = backend
        .translate(&texts(&["a"]), &TranslationContext::new("en", "ru"), "key")
        .await
        .unwrap_err();
    assert!(matches!(err, BragiError::EmptyResponse));
}

// =============================================================================
// Error classification
// =============================================================================

#[tokio::test]
async fn unauthorized_maps_to_authentication_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "type": "error",
            "error": {"type": "authentication_error", "message": "invalid x-api-key"}
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server).await;
    let err = backend
        .translate(&texts(&["a"]), &TranslationContext::new("en", "ru"), "bad")
        .await
        .unwrap_err();
    match err {
        BragiError::AuthenticationFailed(msg) => assert_eq!(msg, "invalid x-api-key"),
        other => panic!("expected AuthenticationFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn too_many_requests_maps_to_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "12")
                .set_body_json(json!({"error": {"message": "rate limited"}})),
        )
        .mount(&server)
        .await;

    let backend = backend_for(&server).await;
    let err = backend
        .translate(&texts(&["a"]), &TranslationContext::new("en", "ru"), "key")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BragiError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(12)
    ));
    assert!(err.is_transient());
}

#[tokio::test]
async fn other_status_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(529).set_body_json(json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server).await;
    let err = backend
        .translate(&texts(&["a"]), &TranslationContext::new("en", "ru"), "key")
        .await
        .unwrap_err();
    match err {
        BragiError::Api { status, message } => {
            assert_eq!(status, 529);
            assert_eq!(message, "Overloaded");
        }
        other => panic!("expected Api, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_success_body_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let backend = backend_for(&server).await;
    let err = backend
        .translate(&texts(&["a"]), &TranslationContext::new("en", "ru"), "key")
        .await
        .unwrap_err();
    assert!(matches!(err, BragiError::Api { status: 502, .. }));
}

#[tokio::test]
async fn unreachable_host_maps_to_unavailable() {
    let backend = AnthropicBackend::with_timeout("http://127.0.0.1:1", Duration::from_secs(1))
        .unwrap();
    let err = backend
        .translate(&texts(&["a"]), &TranslationContext::new("en", "ru"), "key")
        .await
        .unwrap_err();
    assert!(matches!(err, BragiError::Unavailable(_)));
    assert!(err.is_backend());
}
