// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock LLM provider adapter for deterministic testing.
//!
//! `MockProvider` implements `ProviderAdapter` with scripted turns. Each
//! call pops one [`MockTurn`]; every request is recorded for assertions.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::Mutex;

use sable_core::SableError;
use sable_core::traits::{PluginAdapter, ProviderAdapter, ProviderStream};
use sable_core::types::{
    AdapterType, HealthStatus, ProviderRequest, ProviderResponse, ProviderStreamChunk,
    StreamEventType, TokenUsage, ToolUseData,
};

const USAGE: TokenUsage = TokenUsage {
    input_tokens: 10,
    output_tokens: 20,
    cache_read_tokens: 0,
    cache_creation_tokens: 0,
};

/// One scripted model turn.
#[derive(Debug, Clone, PartialEq)]
pub enum MockTurn {
    /// A final answer.
    Text(String),
    /// Optional text followed by tool calls; the turn stops with `tool_use`.
    ToolCalls {
        text: String,
        calls: Vec<ToolUseData>,
    },
}

impl MockTurn {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// A turn calling a single tool.
    pub fn tool_call(name: &str, input: serde_json::Value) -> Self {
        Self::ToolCalls {
            text: String::new(),
            calls: vec![ToolUseData {
                id: format!("toolu_{}", uuid::Uuid::new_v4().simple()),
                name: name.to_string(),
                input,
            }],
        }
    }
}

/// A mock LLM provider that plays back scripted turns.
///
/// Turns are popped from a FIFO queue. When the queue is empty,
/// a default "mock response" text is returned.
#[derive(Clone, Default)]
pub struct MockProvider {
    turns: Arc<Mutex<VecDeque<MockTurn>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider answering with the given texts, in order.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self::with_turns(responses.into_iter().map(MockTurn::Text).collect())
    }

    pub fn with_turns(turns: Vec<MockTurn>) -> Self {
        Self {
            turns: Arc::new(Mutex::new(VecDeque::from(turns))),
            requests: Arc::default(),
        }
    }

    pub async fn push_turn(&self, turn: MockTurn) {
        self.turns.lock().await.push_back(turn);
    }

    /// Every request received so far.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of turns not yet consumed.
    pub async fn remaining(&self) -> usize {
        self.turns.lock().await.len()
    }

    async fn next_turn(&self, request: ProviderRequest) -> MockTurn {
        self.requests.lock().await.push(request);
        self.turns
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| MockTurn::text("mock response"))
    }
}

#[async_trait]
impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        "mock-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, SableError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SableError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, SableError> {
        let model = request.model.clone();
        let (content, tool_uses) = match self.next_turn(request).await {
            MockTurn::Text(text) => (text, Vec::new()),
            MockTurn::ToolCalls { text, calls } => (text, calls),
        };
        let stop_reason = if tool_uses.is_empty() { "end_turn" } else { "tool_use" };
        Ok(ProviderResponse {
            id: format!("mock-resp-{}", uuid::Uuid::new_v4()),
            content,
            model,
            stop_reason: Some(stop_reason.to_string()),
            usage: USAGE,
            tool_uses,
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ProviderStream, SableError> {
        let (text, calls) = match self.next_turn(request).await {
            MockTurn::Text(text) => (text, Vec::new()),
            MockTurn::ToolCalls { text, calls } => (text, calls),
        };
        let stop_reason = if calls.is_empty() { "end_turn" } else { "tool_use" };

        // MessageStart -> text deltas (one per word) -> tool blocks -> MessageDelta -> MessageStop
        let mut chunks = vec![ProviderStreamChunk::empty(StreamEventType::MessageStart)];
        for piece in text.split_inclusive(' ') {
            chunks.push(ProviderStreamChunk {
                text: Some(piece.to_string()),
                ..ProviderStreamChunk::empty(StreamEventType::ContentBlockDelta)
            });
        }
        for call in calls {
            chunks.push(ProviderStreamChunk {
                tool_use: Some(call),
                ..ProviderStreamChunk::empty(StreamEventType::ContentBlockStop)
            });
        }
        chunks.push(ProviderStreamChunk {
            usage: Some(USAGE),
            stop_reason: Some(stop_reason.to_string()),
            ..ProviderStreamChunk::empty(StreamEventType::MessageDelta)
        });
        chunks.push(ProviderStreamChunk::empty(StreamEventType::MessageStop));

        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn request() -> ProviderRequest {
        ProviderRequest {
            model: "test-model".to_string(),
            max_tokens: 100,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn default_response_when_queue_empty() {
        let provider = MockProvider::new();
        let resp = provider.complete(request()).await.unwrap();
        assert_eq!(resp.content, "mock response");
        assert_eq!(resp.stop_reason.as_deref(), Some("end_turn"));
    }

    #[tokio::test]
    async fn queued_responses_returned_in_order() {
        let provider = MockProvider::with_responses(vec!["first".into(), "second".into()]);
        assert_eq!(provider.complete(request()).await.unwrap().content, "first");
        assert_eq!(provider.complete(request()).await.unwrap().content, "second");
        assert_eq!(provider.requests().await.len(), 2);
        assert_eq!(provider.remaining().await, 0);
    }

    #[tokio::test]
    async fn tool_turn_sets_tool_use_stop_reason() {
        let provider = MockProvider::with_turns(vec![MockTurn::tool_call(
            "think",
            serde_json::json!({"title": "t", "thought": "x"}),
        )]);
        let resp = provider.complete(request()).await.unwrap();
        assert_eq!(resp.stop_reason.as_deref(), Some("tool_use"));
        assert_eq!(resp.tool_uses[0].name, "think");
    }

    #[tokio::test]
    async fn stream_produces_correct_event_sequence() {
        let provider = MockProvider::with_turns(vec![MockTurn::ToolCalls {
            text: "looking it up".into(),
            calls: vec![ToolUseData {
                id: "toolu_1".into(),
                name: "duckduckgo_search".into(),
                input: serde_json::json!({"query": "agno"}),
            }],
        }]);

        let events: Vec<_> = provider
            .stream(request())
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;

        assert_eq!(events[0].event_type, StreamEventType::MessageStart);
        let text: String = events.iter().filter_map(|e| e.text.clone()).collect();
        assert_eq!(text, "looking it up");
        let tool = events.iter().find_map(|e| e.tool_use.clone()).unwrap();
        assert_eq!(tool.id, "toolu_1");
        let delta = &events[events.len() - 2];
        assert_eq!(delta.event_type, StreamEventType::MessageDelta);
        assert_eq!(delta.stop_reason.as_deref(), Some("tool_use"));
        assert_eq!(events.last().unwrap().event_type, StreamEventType::MessageStop);
    }
}
