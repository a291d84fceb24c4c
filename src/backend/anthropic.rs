//! Anthropic Messages API translation backend.
//!
//! See: <https://docs.anthropic.com/en/api/messages>

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::TranslationBackend;
use super::prompt::{build_prompt, parse_lines};
use crate::telemetry;
use crate::types::TranslationContext;
use crate::{BragiError, Result};

/// Default base URL for the Anthropic API
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Default model
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

/// Default completion budget
pub const DEFAULT_MAX_TOKENS: u32 = 4000;

/// API version header value
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Translation backend calling Anthropic's Messages API.
///
/// The API key is supplied per call (callers bring their own key), so one
/// backend instance serves every client.
#[derive(Clone)]
pub struct AnthropicBackend {
    http: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicBackend {
    /// Create a backend against the public API with default settings.
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a backend with a custom base URL (for testing with wiremock).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(60))
    }

    /// Create a backend with a custom base URL and request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(crate::version::user_agent())
            .build()
            .map_err(|e| BragiError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    /// Use a different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the completion token budget.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    async fn call(&self, prompt: &str, api_key: &str) -> Result<String> {
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&MessagesRequest {
                model: &self.model,
                max_tokens: self.max_tokens,
                messages: [UserMessage {
                    role: "user",
                    content: prompt,
                }],
            })
            .send()
            .await
            .map_err(|e| {
                debug!(
                    timeout = e.is_timeout(),
                    connect = e.is_connect(),
                    "translation API unreachable"
                );
                BragiError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body, retry_after));
        }

        let reply: MessagesResponse = response
            .json()
            .await
            .map_err(|e| BragiError::Api {
                status: 502,
                message: format!("malformed response from translation API: {e}"),
            })?;

        reply
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .ok_or(BragiError::EmptyResponse)
    }
}

#[async_trait]
impl TranslationBackend for AnthropicBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn translate(
        &self,
        texts: &[String],
        context: &TranslationContext,
        api_key: &str,
    ) -> Result<Vec<String>> {
        let prompt = build_prompt(texts, context);
        let start = Instant::now();
        let result = self.call(&prompt, api_key).await;
        metrics::histogram!(telemetry::BACKEND_REQUEST_DURATION_SECONDS)
            .record(start.elapsed().as_secs_f64());
        metrics::counter!(telemetry::BACKEND_REQUESTS_TOTAL, "status" => status_label(&result))
            .increment(1);

        match result {
            Ok(reply) => {
                let lines = parse_lines(&reply);
                debug!(
                    requested = texts.len(),
                    returned = lines.len(),
                    model = %self.model,
                    "translation backend replied"
                );
                Ok(lines)
            }
            Err(e) => {
                warn!(error = %e, model = %self.model, "translation backend call failed");
                Err(e)
            }
        }
    }
}

/// Map a non-2xx status to an error kind.
fn classify_status(status: u16, body: &str, retry_after: Option<Duration>) -> BragiError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .map(|e| e.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| "Claude API error".to_string());

    match status {
        401 | 403 => BragiError::AuthenticationFailed(message),
        429 => BragiError::RateLimited { retry_after },
        code => BragiError::Api {
            status: code,
            message,
        },
    }
}

fn status_label<T>(result: &Result<T>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(BragiError::AuthenticationFailed(_)) => "auth",
        Err(BragiError::RateLimited { .. }) => "rate_limited",
        Err(BragiError::Unavailable(_)) => "unavailable",
        Err(_) => "error",
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [UserMessage<'a>; 1],
}

#[derive(Serialize)]
struct UserMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}
