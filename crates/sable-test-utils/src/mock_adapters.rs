// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic embedding and reranking adapters.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use sable_core::SableError;
use sable_core::traits::{EmbeddingAdapter, PluginAdapter, RerankerAdapter};
use sable_core::types::{
    AdapterType, EmbeddingInput, EmbeddingOutput, HealthStatus, RerankInput, RerankResult,
};

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

/// FNV-1a, stable across runs.
fn bucket(token: &str, dimensions: usize) -> usize {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in token.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    (hash % dimensions as u64) as usize
}

/// Bag-of-words embedder: texts sharing words get similar vectors.
#[derive(Clone)]
pub struct MockEmbedder {
    dimensions: usize,
    calls: Arc<AtomicUsize>,
}

impl MockEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            calls: Arc::default(),
        }
    }

    /// Number of `embed` calls made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dimensions];
        for token in tokens(text) {
            v[bucket(&token, self.dimensions)] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            v[0] = 1.0;
        } else {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
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
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, SableError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(EmbeddingOutput {
            embeddings: input.texts.iter().map(|t| self.vector(t)).collect(),
            dimensions: self.dimensions,
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Scores each document by how many query words it contains.
#[derive(Clone, Default)]
pub struct MockReranker {
    calls: Arc<AtomicUsize>,
}

impl MockReranker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for MockReranker {
    fn name(&self) -> &str {
        "mock-reranker"
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
impl RerankerAdapter for MockReranker {
    async fn rerank(&self, input: RerankInput) -> Result<Vec<RerankResult>, SableError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let query: Vec<String> = tokens(&input.query).collect();
        let mut results: Vec<RerankResult> = input
            .documents
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                let words: Vec<String> = tokens(doc).collect();
                let hits = query.iter().filter(|q| words.contains(q)).count();
                RerankResult {
                    index,
                    relevance_score: hits as f32 / query.len().max(1) as f32,
                }
            })
            .collect();
        results.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        if let Some(n) = input.top_n {
            results.truncate(n);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn similar_texts_embed_closer() {
        let embedder = MockEmbedder::new(64);
        let out = embedder
            .embed(EmbeddingInput {
                texts: vec![
                    "agno agent framework".into(),
                    "what is the agno framework".into(),
                    "stock prices for nvidia".into(),
                ],
            })
            .await
            .unwrap();
        let [a, b, c] = &out.embeddings[..] else { panic!("three vectors") };
        assert!(cosine(a, b) > cosine(a, c));
        assert_eq!(embedder.calls(), 1);
    }

    #[tokio::test]
    async fn reranker_orders_by_overlap() {
        let results = MockReranker::new()
            .rerank(RerankInput {
                query: "agno memory".into(),
                documents: vec!["nothing here".into(), "agno memory docs".into(), "agno".into()],
                top_n: Some(2),
            })
            .await
            .unwrap();
        assert_eq!(results.iter().map(|r| r.index).collect::<Vec<_>>(), [1, 2]);
    }
}
