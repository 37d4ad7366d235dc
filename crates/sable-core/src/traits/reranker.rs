// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reranker adapter trait for second-stage relevance scoring.

use async_trait::async_trait;

use crate::error::SableError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{RerankInput, RerankResult};

/// Adapter that re-scores candidate documents against a query.
#[async_trait]
pub trait RerankerAdapter: PluginAdapter {
    /// Returns results ordered by descending relevance.
    async fn rerank(&self, input: RerankInput) -> Result<Vec<RerankResult>, SableError>;
}
