// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for LLM integrations (Anthropic, OpenAI).

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::SableError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ProviderRequest, ProviderResponse, ProviderStreamChunk};

/// Boxed stream of provider chunks.
pub type ProviderStream =
    Pin<Box<dyn Stream<Item = Result<ProviderStreamChunk, SableError>> + Send>>;

/// Adapter for LLM provider integrations.
///
/// Provider adapters handle communication with language model APIs,
/// supporting both single-shot completion and streaming responses.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, SableError>;

    /// Sends a completion request and returns a stream of response chunks.
    async fn stream(&self, request: ProviderRequest) -> Result<ProviderStream, SableError>;
}
