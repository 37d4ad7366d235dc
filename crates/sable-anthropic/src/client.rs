// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Anthropic Messages API.
//!
//! [`AnthropicClient`] owns authentication headers and connection pooling,
//! and retries once on transient statuses (429, 500, 503, 529).

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use sable_core::SableError;
use tracing::{debug, warn};

use crate::sse::{self, EventStream};
use crate::types::{ApiError, MessageRequest, MessageResponse};

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    retry_delay: Duration,
    request_timeout: Duration,
}

impl AnthropicClient {
    /// Creates a client for `{base_url}/v1/messages`.
    pub fn new(api_key: &str, api_version: &str, base_url: &str) -> Result<Self, SableError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|e| SableError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(api_version).map_err(|e| {
                SableError::Config(format!("invalid API version header value: {e}"))
            })?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| SableError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/v1/messages", base_url.trim_end_matches('/')),
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(300),
        })
    }

    #[cfg(test)]
    fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[cfg(test)]
    fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sends a streaming request and returns the parsed SSE events.
    pub async fn stream_message(&self, request: &MessageRequest) -> Result<EventStream, SableError> {
        let mut req = request.clone();
        req.stream = true;
        let response = self.send(&req).await?;
        Ok(sse::parse_sse_stream(response))
    }

    /// Sends a non-streaming request and returns the full response.
    pub async fn complete_message(
        &self,
        request: &MessageRequest,
    ) -> Result<MessageResponse, SableError> {
        let mut req = request.clone();
        req.stream = false;
        let response = self.send(&req).await?;

        let body = response.text().await.map_err(|e| SableError::Provider {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        serde_json::from_str(&body).map_err(|e| SableError::Provider {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// POSTs the request, retrying transient failures. Returns a 2xx response.
    async fn send(&self, req: &MessageRequest) -> Result<reqwest::Response, SableError> {
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(&self.endpoint)
                .timeout(self.request_timeout)
                .json(req)
                .send()
                .await
                .map_err(|e| send_error(e, self.request_timeout))?;

            let status = response.status();
            debug!(status = %status, attempt, stream = req.stream, "anthropic response received");

            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                attempt += 1;
                tokio::time::sleep(self.retry_delay).await;
                continue;
            }

            return Err(SableError::provider(describe_error(status, &body)));
        }
    }
}

fn send_error(e: reqwest::Error, timeout: Duration) -> SableError {
    if e.is_timeout() {
        return SableError::Timeout { duration: timeout };
    }
    SableError::Provider {
        message: format!("HTTP request failed: {e}"),
        source: Some(Box::new(e)),
    }
}

/// Readable message for a non-2xx response.
fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiError>(body) {
        Ok(api_err) => format!(
            "Anthropic API error ({}): {}",
            api_err.error.type_, api_err.error.message
        ),
        Err(_) => format!("API returned {status}: {body}"),
    }
}

fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503 | 529)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApiContent, ApiMessage};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> AnthropicClient {
        AnthropicClient::new("test-api-key", "2023-06-01", base_url)
            .unwrap()
            .with_retry_delay(Duration::from_millis(10))
    }

    fn test_request() -> MessageRequest {
        MessageRequest {
            model: "claude-3-7-sonnet-latest".into(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: ApiContent::Text("Hello".into()),
            }],
            system: vec![],
            max_tokens: 1024,
            stream: false,
            tools: vec![],
        }
    }

    fn message_body(id: &str, text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": id,
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": text}],
            "model": "claude-3-7-sonnet-latest",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        })
    }

    #[tokio::test]
    async fn complete_message_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_body("msg_1", "Hi")))
            .mount(&server)
            .await;

        let result = test_client(&server.uri())
            .complete_message(&test_request())
            .await
            .unwrap();
        assert_eq!(result.id, "msg_1");
        assert_eq!(result.usage.input_tokens, 10);
        assert_eq!(result.content.len(), 1);
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_body("msg_2", "ok")))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/", server.uri());
        test_client(&base).complete_message(&test_request()).await.unwrap();
    }

    #[tokio::test]
    async fn retries_once_on_429() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"type": "rate_limit_error", "message": "Rate limited"}
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(message_body("msg_retry", "After retry")),
            )
            .mount(&server)
            .await;

        let result = test_client(&server.uri())
            .complete_message(&test_request())
            .await
            .unwrap();
        assert_eq!(result.id, "msg_retry");
    }

    #[tokio::test]
    async fn slow_responses_time_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(message_body("msg_slow", "late"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .with_request_timeout(Duration::from_millis(100))
            .complete_message(&test_request())
            .await
            .unwrap_err();
        assert!(
            matches!(err, SableError::Timeout { duration } if duration == Duration::from_millis(100)),
            "got: {err}"
        );
    }

    #[tokio::test]
    async fn fails_without_retry_on_400() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"type": "invalid_request_error", "message": "Bad model"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete_message(&test_request())
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("invalid_request_error"), "got: {err}");
        assert!(err.contains("Bad model"), "got: {err}");
    }

    #[tokio::test]
    async fn exhausts_retries_on_529() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_json(serde_json::json!({
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete_message(&test_request())
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("overloaded_error"), "got: {err}");
    }

    #[tokio::test]
    async fn non_json_error_body_is_reported_raw() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such route"))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .complete_message(&test_request())
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("404"), "got: {err}");
        assert!(err.contains("no such route"), "got: {err}");
    }

    #[tokio::test]
    async fn sends_auth_and_version_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-api-key"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(message_body("msg_h", "ok")))
            .mount(&server)
            .await;

        let result = test_client(&server.uri())
            .complete_message(&test_request())
            .await;
        assert!(result.is_ok(), "headers should match: {result:?}");
    }
}
