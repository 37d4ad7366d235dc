// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by adapters, storage and the agent run loop.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Provider,
    Storage,
    Embedding,
    Reranker,
}

// --- Provider types ---

/// A content block inside a provider message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        source_type: String,
        media_type: String,
        data: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

/// A single message in provider-neutral form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMessage {
    /// `user` or `assistant`.
    pub role: String,
    pub content: Vec<ContentBlock>,
}

impl ProviderMessage {
    /// A message holding a single text block.
    pub fn text(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Concatenated text of all text blocks.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

/// A request to an LLM provider.
#[derive(Debug, Clone, Default)]
pub struct ProviderRequest {
    pub model: String,
    pub system_prompt: Option<String>,
    /// Structured system blocks (used by providers that support prompt caching).
    pub system_blocks: Option<serde_json::Value>,
    pub messages: Vec<ProviderMessage>,
    pub max_tokens: u32,
    pub stream: bool,
    /// Tool definitions as `{name, description, input_schema}` objects.
    pub tools: Option<Vec<serde_json::Value>>,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolUseData {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// Token accounting for one provider call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    #[serde(default)]
    pub cache_read_tokens: u32,
    #[serde(default)]
    pub cache_creation_tokens: u32,
}

impl TokenUsage {
    /// Adds another usage record into this one.
    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
        self.cache_creation_tokens += other.cache_creation_tokens;
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// A complete (non-streaming) response from an LLM provider.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: TokenUsage,
    pub tool_uses: Vec<ToolUseData>,
}

/// Kind of event carried by a [`ProviderStreamChunk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEventType {
    MessageStart,
    ContentBlockStart,
    ContentBlockDelta,
    ContentBlockStop,
    MessageDelta,
    MessageStop,
    Error,
}

/// A single chunk from a streaming LLM provider response.
#[derive(Debug, Clone)]
pub struct ProviderStreamChunk {
    pub event_type: StreamEventType,
    pub text: Option<String>,
    pub usage: Option<TokenUsage>,
    pub error: Option<String>,
    /// Set on `ContentBlockStop` when a tool-use block has been fully received.
    pub tool_use: Option<ToolUseData>,
    pub stop_reason: Option<String>,
}

impl ProviderStreamChunk {
    /// A chunk of the given type with every payload field empty.
    pub fn empty(event_type: StreamEventType) -> Self {
        Self {
            event_type,
            text: None,
            usage: None,
            error: None,
            tool_use: None,
            stop_reason: None,
        }
    }
}

// --- Embedding types ---

/// Input for an embedding adapter.
#[derive(Debug, Clone)]
pub struct EmbeddingInput {
    pub texts: Vec<String>,
}

/// Output from an embedding adapter, one vector per input text.
#[derive(Debug, Clone)]
pub struct EmbeddingOutput {
    pub embeddings: Vec<Vec<f32>>,
    pub dimensions: usize,
}

// --- Reranker types ---

/// Input for a reranker adapter.
#[derive(Debug, Clone)]
pub struct RerankInput {
    pub query: String,
    pub documents: Vec<String>,
    pub top_n: Option<usize>,
}

/// One reranked document, referring back to its position in the input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankResult {
    pub index: usize,
    pub relevance_score: f32,
}

// --- Storage types ---

/// A conversation session between a user and an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub agent_name: String,
    pub user_id: Option<String>,
    /// `active` or `closed`.
    pub state: String,
    /// Free-form session state (summary, team shared context).
    pub session_data: serde_json::Value,
    pub created_at: String,
    pub updated_at: String,
}

/// One completed agent run: the input, the answer, and every message exchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub session_id: String,
    pub user_id: Option<String>,
    pub input: String,
    pub output: String,
    pub messages: Vec<ProviderMessage>,
    pub usage: TokenUsage,
    pub created_at: String,
}

/// Current UTC time in the format used for every persisted timestamp.
pub fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}
