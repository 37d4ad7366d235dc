// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! [`ProviderAdapter`] over `/chat/completions`.
//!
//! Finish reasons are normalized to the Anthropic vocabulary used by the run
//! loop: `tool_calls` becomes `tool_use`, `stop` becomes `end_turn` and
//! `length` becomes `max_tokens`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::{self, StreamExt};
use sable_config::model::{ModelConfig, OpenAiConfig};
use sable_core::error::SableError;
use sable_core::traits::{PluginAdapter, ProviderAdapter, ProviderStream};
use sable_core::types::{
    AdapterType, ContentBlock, HealthStatus, ProviderMessage, ProviderRequest, ProviderResponse,
    ProviderStreamChunk, StreamEventType, ToolUseData,
};
use tracing::{debug, info, warn};

use crate::client::OpenAiClient;
use crate::types::{
    ChatChunk, ChatContent, ChatMessage, ChatRequest, ChatResponse, ChatTool, ChatToolCall,
    ContentPart, FunctionCall, FunctionDefinition, ImageUrl, StreamOptions,
};

/// OpenAI chat provider. API key: `openai.api_key`, then `OPENAI_API_KEY`.
pub struct OpenAiProvider {
    client: OpenAiClient,
    model: String,
    max_tokens: u32,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig, model: &ModelConfig) -> Result<Self, SableError> {
        let api_key = sable_core::resolve_api_key(
            config.api_key.as_deref(),
            &["OPENAI_API_KEY"],
            "openai.api_key",
        )?;
        let client = OpenAiClient::new(&api_key, &config.base_url)?;
        info!(model = %model.id, "OpenAI provider initialized");
        Ok(Self {
            client,
            model: model.id.clone(),
            max_tokens: model.max_tokens,
        })
    }

    #[cfg(test)]
    fn with_client(client: OpenAiClient, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
            max_tokens: 1024,
        }
    }

    fn to_chat_request(&self, request: &ProviderRequest) -> ChatRequest {
        let mut messages = Vec::new();
        if let Some(prompt) = request.system_prompt.as_deref()
            && !prompt.is_empty()
        {
            messages.push(ChatMessage::text("system", prompt));
        }
        for message in &request.messages {
            messages.extend(to_chat_messages(message));
        }

        let tools = request
            .tools
            .iter()
            .flatten()
            .filter_map(|v| {
                let name = v.get("name")?.as_str()?.to_string();
                Some(ChatTool {
                    tool_type: "function",
                    function: FunctionDefinition {
                        name,
                        description: v
                            .get("description")
                            .and_then(|d| d.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        parameters: v
                            .get("input_schema")
                            .cloned()
                            .unwrap_or_else(|| serde_json::json!({"type": "object"})),
                    },
                })
            })
            .collect();

        ChatRequest {
            model: if request.model.is_empty() {
                self.model.clone()
            } else {
                request.model.clone()
            },
            messages,
            max_completion_tokens: if request.max_tokens == 0 {
                self.max_tokens
            } else {
                request.max_tokens
            },
            stream: request.stream,
            stream_options: request.stream.then_some(StreamOptions {
                include_usage: true,
            }),
            tools,
        }
    }
}

/// Converts one provider-neutral message into one or more chat messages.
///
/// Tool results become separate `tool` role messages ahead of any user text.
fn to_chat_messages(message: &ProviderMessage) -> Vec<ChatMessage> {
    let mut out = Vec::new();
    let mut parts = Vec::new();
    let mut tool_calls = Vec::new();

    for block in &message.content {
        match block {
            ContentBlock::Text { text } => parts.push(ContentPart::Text { text: text.clone() }),
            ContentBlock::Image {
                media_type, data, ..
            } => parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:{media_type};base64,{data}"),
                },
            }),
            ContentBlock::ToolUse { id, name, input } => tool_calls.push(ChatToolCall {
                id: id.clone(),
                call_type: "function".to_string(),
                function: FunctionCall {
                    name: name.clone(),
                    arguments: input.to_string(),
                },
            }),
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                ..
            } => out.push(ChatMessage {
                role: "tool".to_string(),
                content: Some(ChatContent::Text(content.clone())),
                tool_call_id: Some(tool_use_id.clone()),
                ..ChatMessage::default()
            }),
        }
    }

    let content = match parts.as_slice() {
        [] => None,
        [ContentPart::Text { text }] => Some(ChatContent::Text(text.clone())),
        _ => Some(ChatContent::Parts(parts)),
    };
    if content.is_some() || !tool_calls.is_empty() {
        out.push(ChatMessage {
            role: message.role.clone(),
            content,
            tool_calls,
            tool_call_id: None,
        });
    }
    out
}

fn normalize_finish_reason(reason: &str) -> String {
    match reason {
        "tool_calls" | "function_call" => "tool_use",
        "stop" => "end_turn",
        "length" => "max_tokens",
        other => other,
    }
    .to_string()
}

fn parse_arguments(arguments: &str) -> serde_json::Value {
    if arguments.trim().is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(arguments).unwrap_or_else(|e| {
        warn!(error = %e, arguments, "failed to parse tool call arguments");
        serde_json::json!({"_parse_error": e.to_string(), "_raw": arguments})
    })
}

#[async_trait]
impl PluginAdapter for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
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
        debug!("OpenAI provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, SableError> {
        let mut chat = self.to_chat_request(&request);
        chat.stream = false;
        chat.stream_options = None;
        let response: ChatResponse = self.client.post_json("/chat/completions", &chat).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SableError::provider("OpenAI response contained no choices"))?;

        let tool_uses = choice
            .message
            .tool_calls
            .into_iter()
            .map(|call| ToolUseData {
                input: parse_arguments(&call.function.arguments),
                id: call.id,
                name: call.function.name,
            })
            .collect();

        Ok(ProviderResponse {
            id: response.id,
            content: choice.message.content.unwrap_or_default(),
            model: response.model,
            stop_reason: choice.finish_reason.as_deref().map(normalize_finish_reason),
            usage: response.usage.map(Into::into).unwrap_or_default(),
            tool_uses,
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ProviderStream, SableError> {
        let mut chat = self.to_chat_request(&request);
        chat.stream = true;
        chat.stream_options = Some(StreamOptions {
            include_usage: true,
        });
        let response = self.client.post("/chat/completions", &chat).await?;

        let mut state = ChunkState::default();
        let chunks = response
            .bytes_stream()
            .eventsource()
            .map(move |event| match event {
                Ok(event) => state.on_data(&event.data),
                Err(e) => vec![Err(SableError::provider(format!("SSE stream error: {e}")))],
            })
            .flat_map(stream::iter);

        Ok(Box::pin(chunks))
    }
}

#[derive(Debug, Default)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
}

/// Accumulates tool call fragments by index across chunks.
#[derive(Debug, Default)]
struct ChunkState {
    started: bool,
    calls: BTreeMap<usize, PendingCall>,
    stop_reason: Option<String>,
}

impl ChunkState {
    fn on_data(&mut self, data: &str) -> Vec<Result<ProviderStreamChunk, SableError>> {
        let data = data.trim();
        if data.is_empty() {
            return Vec::new();
        }
        if data == "[DONE]" {
            let mut out = self.flush_calls();
            let mut stop = ProviderStreamChunk::empty(StreamEventType::MessageStop);
            stop.stop_reason = self.stop_reason.clone();
            out.push(Ok(stop));
            return out;
        }

        let chunk: ChatChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                return vec![Err(SableError::Provider {
                    message: format!("failed to parse stream chunk: {e}"),
                    source: Some(Box::new(e)),
                })];
            }
        };

        let mut out = Vec::new();
        if !self.started {
            self.started = true;
            out.push(Ok(ProviderStreamChunk::empty(StreamEventType::MessageStart)));
        }

        for choice in chunk.choices {
            if let Some(text) = choice.delta.content
                && !text.is_empty()
            {
                let mut delta = ProviderStreamChunk::empty(StreamEventType::ContentBlockDelta);
                delta.text = Some(text);
                out.push(Ok(delta));
            }
            for call in choice.delta.tool_calls.unwrap_or_default() {
                let pending = self.calls.entry(call.index).or_default();
                if let Some(id) = call.id {
                    pending.id = id;
                }
                if let Some(function) = call.function {
                    if let Some(name) = function.name {
                        pending.name.push_str(&name);
                    }
                    if let Some(arguments) = function.arguments {
                        pending.arguments.push_str(&arguments);
                    }
                }
            }
            if let Some(reason) = choice.finish_reason {
                out.extend(self.flush_calls());
                let reason = normalize_finish_reason(&reason);
                self.stop_reason = Some(reason.clone());
                let mut delta = ProviderStreamChunk::empty(StreamEventType::MessageDelta);
                delta.stop_reason = Some(reason);
                out.push(Ok(delta));
            }
        }

        if let Some(usage) = chunk.usage {
            let mut delta = ProviderStreamChunk::empty(StreamEventType::MessageDelta);
            delta.usage = Some(usage.into());
            out.push(Ok(delta));
        }
        out
    }

    fn flush_calls(&mut self) -> Vec<Result<ProviderStreamChunk, SableError>> {
        std::mem::take(&mut self.calls)
            .into_values()
            .map(|call| {
                let mut chunk = ProviderStreamChunk::empty(StreamEventType::ContentBlockStop);
                chunk.tool_use = Some(ToolUseData {
                    input: parse_arguments(&call.arguments),
                    id: call.id,
                    name: call.name,
                });
                Ok(chunk)
            })
            .collect()
    }
}
