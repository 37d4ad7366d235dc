// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cohere rerank adapter.
//!
//! Posts `{model, query, documents, top_n}` to `/v2/rerank` and returns the
//! documents' input indices ordered by relevance.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use sable_config::model::{CohereConfig, RerankerConfig};
use sable_core::error::SableError;
use sable_core::traits::{PluginAdapter, RerankerAdapter};
use sable_core::types::{AdapterType, HealthStatus, RerankInput, RerankResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankItem>,
}

#[derive(Debug, Deserialize)]
struct RerankItem {
    index: usize,
    relevance_score: f32,
}

#[derive(Debug, Deserialize)]
struct CohereError {
    message: String,
}

pub struct CohereReranker {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    top_n: Option<usize>,
    request_timeout: Duration,
}

impl CohereReranker {
    /// API key: `cohere.api_key`, then `CO_API_KEY`, then `COHERE_API_KEY`.
    pub fn new(config: &CohereConfig, reranker: &RerankerConfig) -> Result<Self, SableError> {
        let api_key = sable_core::resolve_api_key(
            config.api_key.as_deref(),
            &["CO_API_KEY", "COHERE_API_KEY"],
            "cohere.api_key",
        )?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| SableError::Config(format!("invalid API key header value: {e}")))?,
        );
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| SableError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/v2/rerank", config.base_url.trim_end_matches('/')),
            model: reranker.model.clone(),
            top_n: reranker.top_n,
            request_timeout: Duration::from_secs(60),
        })
    }
}

#[async_trait]
impl PluginAdapter for CohereReranker {
    fn name(&self) -> &str {
        "cohere-reranker"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Reranker
    }

    async fn health_check(&self) -> Result<HealthStatus, SableError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SableError> {
        Ok(())
    }
}

#[async_trait]
impl RerankerAdapter for CohereReranker {
    async fn rerank(&self, input: RerankInput) -> Result<Vec<RerankResult>, SableError> {
        if input.documents.is_empty() {
            return Ok(Vec::new());
        }
        let body = RerankRequest {
            model: &self.model,
            query: &input.query,
            documents: &input.documents,
            top_n: input.top_n.or(self.top_n),
        };
        debug!(model = %self.model, documents = input.documents.len(), "reranking");

        let response = self
            .client
            .post(&self.endpoint)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SableError::Timeout {
                        duration: self.request_timeout,
                    }
                } else {
                    SableError::Provider {
                        message: format!("rerank request failed: {e}"),
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            let detail = serde_json::from_str::<CohereError>(&text)
                .map(|e| e.message)
                .unwrap_or(text);
            return Err(SableError::provider(format!(
                "Cohere rerank returned {status}: {detail}"
            )));
        }

        let parsed: RerankResponse = serde_json::from_str(&text).map_err(|e| SableError::Provider {
            message: format!("failed to parse rerank response: {e}"),
            source: Some(Box::new(e)),
        })?;

        let mut results: Vec<RerankResult> = parsed
            .results
            .into_iter()
            .filter(|r| r.index < input.documents.len())
            .map(|r| RerankResult {
                index: r.index,
                relevance_score: r.relevance_score,
            })
            .collect();
        results.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        Ok(results)
    }
}
