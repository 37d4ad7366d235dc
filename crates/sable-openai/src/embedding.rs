// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`EmbeddingAdapter`] over `/embeddings`.

use async_trait::async_trait;
use sable_config::model::{EmbedderConfig, OpenAiConfig};
use sable_core::error::SableError;
use sable_core::traits::{EmbeddingAdapter, PluginAdapter};
use sable_core::types::{AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus};
use tracing::debug;

use crate::client::OpenAiClient;
use crate::types::{EmbeddingRequest, EmbeddingResponse};

/// Texts sent per request.
const MAX_BATCH: usize = 512;

pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbedder {
    pub fn new(config: &OpenAiConfig, embedder: &EmbedderConfig) -> Result<Self, SableError> {
        let api_key = sable_core::resolve_api_key(
            config.api_key.as_deref(),
            &["OPENAI_API_KEY"],
            "openai.api_key",
        )?;
        Ok(Self {
            client: OpenAiClient::new(&api_key, &config.base_url)?,
            model: embedder.id.clone(),
            dimensions: embedder.dimensions,
        })
    }

    /// Only the `text-embedding-3` family accepts a `dimensions` parameter.
    fn requested_dimensions(&self) -> Option<usize> {
        self.model
            .starts_with("text-embedding-3")
            .then_some(self.dimensions)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SableError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.requested_dimensions(),
        };
        let mut response: EmbeddingResponse = self.client.post_json("/embeddings", &request).await?;
        if response.data.len() != texts.len() {
            return Err(SableError::provider(format!(
                "embedding response has {} vectors for {} inputs",
                response.data.len(),
                texts.len()
            )));
        }
        response.data.sort_by_key(|d| d.index);

        let mut vectors = Vec::with_capacity(texts.len());
        for data in response.data {
            if data.embedding.len() != self.dimensions {
                return Err(SableError::provider(format!(
                    "embedding has {} dimensions, expected {}",
                    data.embedding.len(),
                    self.dimensions
                )));
            }
            vectors.push(data.embedding);
        }
        Ok(vectors)
    }
}

#[async_trait]
impl PluginAdapter for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, SableError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SableError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for OpenAiEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, SableError> {
        let mut embeddings = Vec::with_capacity(input.texts.len());
        for batch in input.texts.chunks(MAX_BATCH) {
            debug!(model = %self.model, count = batch.len(), "embedding batch");
            embeddings.extend(self.embed_batch(batch).await?);
        }
        Ok(EmbeddingOutput {
            embeddings,
            dimensions: self.dimensions,
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder(uri: &str, dims: usize) -> OpenAiEmbedder {
        OpenAiEmbedder::new(
            &OpenAiConfig {
                api_key: Some("sk-test".into()),
                base_url: uri.to_string(),
            },
            &EmbedderConfig {
                id: "text-embedding-3-small".into(),
                dimensions: dims,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn embeddings_are_returned_in_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(body_partial_json(serde_json::json!({
                "model": "text-embedding-3-small",
                "dimensions": 3,
                "input": ["alpha", "beta"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "object": "list",
                "data": [
                    {"object": "embedding", "index": 1, "embedding": [0.0, 1.0, 0.0]},
                    {"object": "embedding", "index": 0, "embedding": [1.0, 0.0, 0.0]}
                ],
                "model": "text-embedding-3-small",
                "usage": {"prompt_tokens": 2, "total_tokens": 2}
            })))
            .mount(&server)
            .await;

        let out = embedder(&server.uri(), 3)
            .embed(EmbeddingInput {
                texts: vec!["alpha".into(), "beta".into()],
            })
            .await
            .unwrap();
        assert_eq!(out.dimensions, 3);
        assert_eq!(out.embeddings[0], vec![1.0, 0.0, 0.0]);
        assert_eq!(out.embeddings[1], vec![0.0, 1.0, 0.0]);
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"index": 0, "embedding": [0.5, 0.5]}]
            })))
            .mount(&server)
            .await;

        let err = embedder(&server.uri(), 3)
            .embed(EmbeddingInput {
                texts: vec!["x".into()],
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("expected 3"), "got: {err}");
    }

    #[test]
    fn legacy_models_omit_dimensions() {
        let mut e = embedder("http://localhost", 1536);
        assert_eq!(e.requested_dimensions(), Some(1536));
        e.model = "text-embedding-ada-002".into();
        assert_eq!(e.requested_dimensions(), None);
    }
}
