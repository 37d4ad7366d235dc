// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Claude provider adapter for the Sable agent runtime.
//!
//! Implements [`ProviderAdapter`] for the Anthropic Messages API with
//! single-shot completion, SSE streaming and tool use. The system prompt is
//! sent as a cached block.

pub mod client;
pub mod sse;
pub mod types;

use std::collections::HashMap;

use async_trait::async_trait;
use futures::stream::StreamExt;
use sable_config::model::{AnthropicConfig, ModelConfig};
use sable_core::error::SableError;
use sable_core::traits::{PluginAdapter, ProviderAdapter, ProviderStream};
use sable_core::types::{
    AdapterType, ContentBlock, HealthStatus, ProviderMessage, ProviderRequest, ProviderResponse,
    ProviderStreamChunk, StreamEventType, ToolUseData,
};
use tracing::{debug, info, warn};

use crate::client::AnthropicClient;
use crate::sse::StreamEvent;
use crate::types::{
    ApiContent, ApiContentBlock, ApiMessage, ImageSource, MessageRequest, ResponseContentBlock,
    SseDelta, SystemBlock, ToolDefinition,
};

/// Anthropic Claude provider.
///
/// API key resolution: `anthropic.api_key`, then `ANTHROPIC_API_KEY`.
pub struct AnthropicProvider {
    client: AnthropicClient,
    model: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(config: &AnthropicConfig, model: &ModelConfig) -> Result<Self, SableError> {
        let api_key = sable_core::resolve_api_key(
            config.api_key.as_deref(),
            &["ANTHROPIC_API_KEY"],
            "anthropic.api_key",
        )?;
        let client = AnthropicClient::new(&api_key, &config.api_version, &config.base_url)?;

        info!(model = %model.id, "Anthropic provider initialized");

        Ok(Self {
            client,
            model: model.id.clone(),
            max_tokens: model.max_tokens,
        })
    }

    /// Model id used when a request leaves `model` empty.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn to_message_request(&self, request: &ProviderRequest) -> MessageRequest {
        let mut system = match &request.system_blocks {
            Some(value) => match serde_json::from_value::<Vec<SystemBlock>>(value.clone()) {
                Ok(blocks) => blocks,
                Err(e) => {
                    warn!(error = %e, "failed to parse system_blocks, falling back to text");
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        if system.is_empty()
            && let Some(prompt) = request.system_prompt.as_deref()
            && !prompt.is_empty()
        {
            system.push(SystemBlock::cached(prompt));
        }

        // The Messages API has no system role; fold stray system turns into the prompt.
        let mut messages = Vec::with_capacity(request.messages.len());
        for message in &request.messages {
            if message.role == "system" {
                system.push(SystemBlock::cached(message.text_content()));
            } else {
                messages.push(to_api_message(message));
            }
        }

        let tools = request
            .tools
            .iter()
            .flatten()
            .filter_map(|v| match serde_json::from_value::<ToolDefinition>(v.clone()) {
                Ok(tool) => Some(tool),
                Err(e) => {
                    warn!(error = %e, "skipping malformed tool definition");
                    None
                }
            })
            .collect();

        MessageRequest {
            model: if request.model.is_empty() {
                self.model.clone()
            } else {
                request.model.clone()
            },
            messages,
            system,
            max_tokens: if request.max_tokens == 0 {
                self.max_tokens
            } else {
                request.max_tokens
            },
            stream: request.stream,
            tools,
        }
    }
}

#[async_trait]
impl PluginAdapter for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, SableError> {
        // No lightweight endpoint exists that does not consume tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SableError> {
        debug!("Anthropic provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, SableError> {
        let api_request = self.to_message_request(&request);
        let response = self.client.complete_message(&api_request).await?;

        let mut content = String::new();
        let mut tool_uses = Vec::new();
        for block in response.content {
            match block {
                ResponseContentBlock::Text { text } => content.push_str(&text),
                ResponseContentBlock::ToolUse { id, name, input } => {
                    tool_uses.push(ToolUseData { id, name, input })
                }
                ResponseContentBlock::Other => {}
            }
        }

        Ok(ProviderResponse {
            id: response.id,
            content,
            model: response.model,
            stop_reason: response.stop_reason,
            usage: response.usage.into(),
            tool_uses,
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ProviderStream, SableError> {
        let api_request = self.to_message_request(&request);
        let events = self.client.stream_message(&api_request).await?;

        let mut state = StreamState::default();
        let chunks = events.filter_map(move |result| {
            let chunk = match result {
                Ok(event) => state.map_event(event),
                Err(e) => Some(Err(e)),
            };
            async move { chunk }
        });

        Ok(Box::pin(chunks))
    }
}

/// A tool_use block whose input JSON is still arriving.
#[derive(Debug)]
struct PendingToolUse {
    id: String,
    name: String,
    json: String,
}

/// Per-stream state: tool_use blocks by content index and the stop reason.
#[derive(Debug, Default)]
struct StreamState {
    pending: HashMap<usize, PendingToolUse>,
    stop_reason: Option<String>,
}

impl StreamState {
    fn map_event(&mut self, event: StreamEvent) -> Option<Result<ProviderStreamChunk, SableError>> {
        match event {
            StreamEvent::MessageStart(ms) => {
                let mut chunk = ProviderStreamChunk::empty(StreamEventType::MessageStart);
                chunk.usage = Some(ms.message.usage.into());
                Some(Ok(chunk))
            }
            StreamEvent::ContentBlockStart(cbs) => {
                if let ResponseContentBlock::ToolUse { id, name, .. } = cbs.content_block {
                    self.pending.insert(
                        cbs.index,
                        PendingToolUse {
                            id,
                            name,
                            json: String::new(),
                        },
                    );
                }
                None
            }
            StreamEvent::ContentBlockDelta(delta) => match delta.delta {
                SseDelta::TextDelta { text } => {
                    let mut chunk = ProviderStreamChunk::empty(StreamEventType::ContentBlockDelta);
                    chunk.text = Some(text);
                    Some(Ok(chunk))
                }
                SseDelta::InputJsonDelta { partial_json } => {
                    if let Some(pending) = self.pending.get_mut(&delta.index) {
                        pending.json.push_str(&partial_json);
                    }
                    None
                }
                SseDelta::Other => None,
            },
            StreamEvent::ContentBlockStop(cbs) => {
                let pending = self.pending.remove(&cbs.index)?;
                let input = parse_tool_input(&pending.json);
                let mut chunk = ProviderStreamChunk::empty(StreamEventType::ContentBlockStop);
                chunk.tool_use = Some(ToolUseData {
                    id: pending.id,
                    name: pending.name,
                    input,
                });
                Some(Ok(chunk))
            }
            StreamEvent::MessageDelta(md) => {
                if md.delta.stop_reason.is_some() {
                    self.stop_reason = md.delta.stop_reason.clone();
                }
                let mut chunk = ProviderStreamChunk::empty(StreamEventType::MessageDelta);
                chunk.usage = md.usage.map(Into::into);
                chunk.stop_reason = md.delta.stop_reason;
                Some(Ok(chunk))
            }
            StreamEvent::MessageStop => {
                let mut chunk = ProviderStreamChunk::empty(StreamEventType::MessageStop);
                chunk.stop_reason = self.stop_reason.clone();
                Some(Ok(chunk))
            }
            StreamEvent::Error(err) => {
                let mut chunk = ProviderStreamChunk::empty(StreamEventType::Error);
                chunk.error = Some(format!("{}: {}", err.error.type_, err.error.message));
                Some(Ok(chunk))
            }
            StreamEvent::Ping => None,
        }
    }
}

/// Parses accumulated tool input JSON; an empty buffer means `{}`.
fn parse_tool_input(json: &str) -> serde_json::Value {
    if json.trim().is_empty() {
        return serde_json::Value::Object(serde_json::Map::new());
    }
    serde_json::from_str(json).unwrap_or_else(|e| {
        warn!(error = %e, json = %json, "failed to parse tool_use input JSON");
        serde_json::json!({"_parse_error": e.to_string(), "_raw": json})
    })
}

fn to_api_message(message: &ProviderMessage) -> ApiMessage {
    ApiMessage {
        role: message.role.clone(),
        content: convert_content_blocks(&message.content),
    }
}

/// A single text block becomes a plain string; anything else a block array.
fn convert_content_blocks(blocks: &[ContentBlock]) -> ApiContent {
    if let [ContentBlock::Text { text }] = blocks {
        return ApiContent::Text(text.clone());
    }

    ApiContent::Blocks(
        blocks
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => ApiContentBlock::Text { text: text.clone() },
                ContentBlock::Image {
                    source_type,
                    media_type,
                    data,
                } => ApiContentBlock::Image {
                    source: ImageSource {
                        source_type: source_type.clone(),
                        media_type: media_type.clone(),
                        data: data.clone(),
                    },
                },
                ContentBlock::ToolUse { id, name, input } => ApiContentBlock::ToolUse {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                },
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => ApiContentBlock::ToolResult {
                    tool_use_id: tool_use_id.clone(),
                    content: content.clone(),
                    is_error: *is_error,
                },
            })
            .collect(),
    )
}
