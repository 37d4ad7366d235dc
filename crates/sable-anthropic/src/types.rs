// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API request/response types and SSE event payloads.

use serde::{Deserialize, Serialize};

/// Marker for Anthropic prompt caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheControl {
    #[serde(rename = "type")]
    pub control_type: String,
}

impl CacheControl {
    pub fn ephemeral() -> Self {
        Self {
            control_type: "ephemeral".to_string(),
        }
    }
}

/// A structured system prompt block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemBlock {
    #[serde(rename = "type", default = "text_type")]
    pub block_type: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

fn text_type() -> String {
    "text".to_string()
}

impl SystemBlock {
    /// A text block marked for ephemeral caching.
    pub fn cached(text: impl Into<String>) -> Self {
        Self {
            block_type: text_type(),
            text: text.into(),
            cache_control: Some(CacheControl::ephemeral()),
        }
    }
}

/// A tool the model may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Body of `POST /v1/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct MessageRequest {
    pub model: String,
    pub messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub system: Vec<SystemBlock>,
    pub max_tokens: u32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiMessage {
    pub role: String,
    pub content: ApiContent,
}

/// Message content: plain string for single text turns, blocks otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiContent {
    Text(String),
    Blocks(Vec<ApiContentBlock>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApiContentBlock {
    Text {
        text: String,
    },
    Image {
        source: ImageSource,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSource {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

/// A full (non-streaming) Messages API response.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub id: String,
    pub content: Vec<ResponseContentBlock>,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: ApiUsage,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// Block types this client does not act on (e.g. `thinking`).
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    #[serde(default)]
    pub cache_read_input_tokens: u32,
    #[serde(default)]
    pub cache_creation_input_tokens: u32,
}

impl From<ApiUsage> for sable_core::types::TokenUsage {
    fn from(u: ApiUsage) -> Self {
        Self {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
            cache_read_tokens: u.cache_read_input_tokens,
            cache_creation_tokens: u.cache_creation_input_tokens,
        }
    }
}

// --- SSE payloads ---

#[derive(Debug, Clone, Deserialize)]
pub struct SseMessageStart {
    pub message: MessageResponse,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SseContentBlockStart {
    pub index: usize,
    pub content_block: ResponseContentBlock,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SseContentBlockDelta {
    pub index: usize,
    pub delta: SseDelta,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SseDelta {
    TextDelta {
        text: String,
    },
    InputJsonDelta {
        partial_json: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SseContentBlockStop {
    pub index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SseMessageDelta {
    pub delta: SseMessageDeltaInfo,
    pub usage: Option<ApiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SseMessageDeltaInfo {
    pub stop_reason: Option<String>,
}

/// Error body, shared by HTTP error responses and the SSE `error` event.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(rename = "type")]
    pub type_: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_empty_system_and_tools() {
        let req = MessageRequest {
            model: "claude-3-7-sonnet-latest".into(),
            messages: vec![ApiMessage {
                role: "user".into(),
                content: ApiContent::Text("Hello".into()),
            }],
            system: vec![],
            max_tokens: 1024,
            stream: false,
            tools: vec![],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("system").is_none());
        assert!(json.get("tools").is_none());
        assert_eq!(json["messages"][0]["content"], "Hello");
    }

    #[test]
    fn cached_system_block_serializes_marker() {
        let json = serde_json::to_value(SystemBlock::cached("be brief")).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "be brief");
        assert_eq!(json["cache_control"]["type"], "ephemeral");
    }

    #[test]
    fn tool_result_block_shape() {
        let block = ApiContentBlock::ToolResult {
            tool_use_id: "toolu_1".into(),
            content: "42".into(),
            is_error: None,
        };
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "tool_result");
        assert_eq!(json["tool_use_id"], "toolu_1");
        assert!(json.get("is_error").is_none());
    }

    #[test]
    fn unknown_response_blocks_are_tolerated() {
        let json = r#"{
            "id": "msg_1",
            "content": [
                {"type": "thinking", "thinking": "hmm", "signature": "x"},
                {"type": "text", "text": "done"}
            ],
            "model": "claude-3-7-sonnet-latest",
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 3, "output_tokens": 1}
        }"#;
        let resp: MessageResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(resp.content[0], ResponseContentBlock::Other));
        assert!(matches!(resp.content[1], ResponseContentBlock::Text { .. }));
    }

    #[test]
    fn usage_cache_fields_default_to_zero() {
        let usage: ApiUsage =
            serde_json::from_str(r#"{"input_tokens": 10, "output_tokens": 5}"#).unwrap();
        assert_eq!(usage.cache_read_input_tokens, 0);
        let core: sable_core::types::TokenUsage = usage.into();
        assert_eq!(core.total(), 15);
    }
}
