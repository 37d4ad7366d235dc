// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer-authenticated JSON client for the OpenAI REST API.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use sable_core::SableError;
use serde::Serialize;
use tracing::{debug, warn};

use crate::types::ApiErrorResponse;

/// Shared HTTP client for `/chat/completions` and `/embeddings`.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
    request_timeout: Duration,
}

impl OpenAiClient {
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, SableError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| SableError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| SableError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(300),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// POSTs `body` to `{base_url}{path}`, retrying one transient failure.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, SableError> {
        let url = format!("{}{path}", self.base_url);
        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(&url)
                .timeout(self.request_timeout)
                .json(body)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        SableError::Timeout {
                            duration: self.request_timeout,
                        }
                    } else {
                        SableError::Provider {
                            message: format!("HTTP request failed: {e}"),
                            source: Some(Box::new(e)),
                        }
                    }
                })?;

            let status = response.status();
            debug!(status = %status, attempt, path, "openai response received");
            if status.is_success() {
                return Ok(response);
            }

            let text = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %text, "transient error, will retry");
                attempt += 1;
                tokio::time::sleep(self.retry_delay).await;
                continue;
            }
            return Err(SableError::provider(describe_error(status, &text)));
        }
    }

    /// POSTs and decodes a JSON response body.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, SableError>
    where
        B: Serialize + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let response = self.post(path, body).await?;
        let text = response.text().await.map_err(|e| SableError::Provider {
            message: format!("failed to read response body: {e}"),
            source: Some(Box::new(e)),
        })?;
        serde_json::from_str(&text).map_err(|e| SableError::Provider {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }
}

fn describe_error(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(err) => format!(
            "OpenAI API error ({}): {}",
            err.error.error_type.as_deref().unwrap_or("unknown"),
            err.error.message
        ),
        Err(_) => format!("API returned {status}: {body}"),
    }
}

fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(uri: &str) -> OpenAiClient {
        OpenAiClient::new("sk-openai", uri)
            .unwrap()
            .with_retry_delay(Duration::from_millis(10))
    }

    #[tokio::test]
    async fn sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/echo"))
            .and(header("authorization", "Bearer sk-openai"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let value: serde_json::Value = client(&format!("{}/v1", server.uri()))
            .post_json("/echo", &serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn retries_once_on_503_then_reports_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({
                "error": {"message": "The server is overloaded", "type": "server_error", "code": null}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .post("/chat/completions", &serde_json::json!({}))
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("server_error"), "got: {err}");
        assert!(err.contains("overloaded"), "got: {err}");
    }

    #[tokio::test]
    async fn slow_responses_time_out_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"ok": true}))
                    .set_delay(Duration::from_secs(2)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .with_request_timeout(Duration::from_millis(100))
            .post("/chat/completions", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, SableError::Timeout { .. }), "got: {err}");
        assert_eq!(err.to_string(), "operation timed out after 100ms");
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .post("/embeddings", &serde_json::json!({}))
            .await
            .unwrap_err()
            .to_string();
        assert!(err.contains("Incorrect API key"), "got: {err}");
    }
}
