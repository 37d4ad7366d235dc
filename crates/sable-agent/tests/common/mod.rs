// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::sync::Arc;

use sable_agent::AdapterFactory;
use sable_config::model::{EmbedderConfig, ModelConfig, RerankerConfig};
use sable_core::SableError;
use sable_core::traits::{EmbeddingAdapter, ProviderAdapter, RerankerAdapter};
use sable_test_utils::TestHarness;

/// Hands out the harness mocks for every model and backend.
pub struct HarnessAdapters<'a>(pub &'a TestHarness);

impl AdapterFactory for HarnessAdapters<'_> {
    fn provider(&self, _model: &ModelConfig) -> Result<Arc<dyn ProviderAdapter>, SableError> {
        Ok(self.0.provider.clone())
    }

    fn embedder(&self, _config: &EmbedderConfig) -> Result<Arc<dyn EmbeddingAdapter>, SableError> {
        Ok(self.0.embedder.clone())
    }

    fn reranker(&self, _config: &RerankerConfig) -> Result<Arc<dyn RerankerAdapter>, SableError> {
        Ok(self.0.reranker.clone())
    }
}

/// Names of the tools offered in a request.
#[allow(dead_code)]
pub fn tool_names(request: &sable_core::types::ProviderRequest) -> Vec<String> {
    request
        .tools
        .as_ref()
        .map(|tools| {
            tools
                .iter()
                .filter_map(|t| t["name"].as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}
