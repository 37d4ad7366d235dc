// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM memory manager.
//!
//! Shows the model the user's current memories and lets it change them
//! through `add_memory` and `update_memory`, plus `delete_memory` and
//! `clear_memory` when the configuration allows. Runs as a short,
//! non-streaming tool loop.

use std::sync::Arc;

use async_trait::async_trait;
use sable_config::model::MemoryRetrieval;
use sable_core::SableError;
use sable_core::traits::ProviderAdapter;
use sable_core::types::{ContentBlock, ProviderMessage, ProviderRequest, TokenUsage};
use sable_tools::{Tool, ToolOutput, ToolRegistry, optional_str, required_str};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::store::MemoryDb;
use crate::types::{UserMemory, normalize};

/// Model round trips allowed per update.
const MAX_ROUNDS: usize = 5;

/// Memories shown to the manager model.
const MAX_MEMORIES_SHOWN: usize = 100;

const MANAGER_PROMPT: &str = r#"You are a memory manager responsible for keeping durable information about a user.

Store facts that will help personalize future conversations: the user's name and details, preferences and how they want to be answered, ongoing projects, goals and plans, and important events. Do not store small talk, questions the user asked, or information that only matters in the current conversation.

Each memory must be a short, standalone statement written in the third person, for example "The user's name is Ava" or "Ava prefers answers that start with 'hi ava'".

Use the tools to change the memories:
- add_memory for new information
- update_memory when new information refines or contradicts an existing memory"#;

const DELETE_HINT: &str = "- delete_memory when a memory is wrong or the user asks to forget it";
const CLEAR_HINT: &str = "- clear_memory when the user asks to forget everything about them";

/// What the manager is asked to act on.
#[derive(Debug, Clone, Copy)]
pub enum MemoryInput<'a> {
    /// Messages of a finished run; the manager extracts memories from them.
    Messages(&'a [ProviderMessage]),
    /// An explicit instruction from the agent ("Remember that ...").
    Task(&'a str),
}

/// A change applied to the memory table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryOp {
    Added(String),
    Updated(String),
    Deleted(String),
    Cleared(usize),
}

/// Result of one manager run.
#[derive(Debug, Clone, Default)]
pub struct MemoryUpdate {
    pub ops: Vec<MemoryOp>,
    pub usage: TokenUsage,
    /// The manager's final text, if any.
    pub message: String,
}

impl MemoryUpdate {
    pub fn changed(&self) -> bool {
        !self.ops.is_empty()
    }
}

/// Model-driven creator and editor of user memories.
pub struct MemoryManager {
    db: MemoryDb,
    provider: Arc<dyn ProviderAdapter>,
    model: String,
    max_tokens: u32,
    delete_memories: bool,
    clear_memories: bool,
}

impl MemoryManager {
    pub fn new(db: MemoryDb, provider: Arc<dyn ProviderAdapter>, model: impl Into<String>) -> Self {
        Self {
            db,
            provider,
            model: model.into(),
            max_tokens: 1024,
            delete_memories: false,
            clear_memories: false,
        }
    }

    /// Allow the model to delete single memories and/or clear all of them.
    pub fn with_permissions(mut self, delete_memories: bool, clear_memories: bool) -> Self {
        self.delete_memories = delete_memories;
        self.clear_memories = clear_memories;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn db(&self) -> &MemoryDb {
        &self.db
    }

    /// Extracts memories from the messages of a finished run.
    pub async fn create_user_memories(
        &self,
        user_id: &str,
        messages: &[ProviderMessage],
    ) -> Result<MemoryUpdate, SableError> {
        self.run(user_id, MemoryInput::Messages(messages)).await
    }

    /// Applies an explicit memory task.
    pub async fn update_memory_task(
        &self,
        user_id: &str,
        task: &str,
    ) -> Result<MemoryUpdate, SableError> {
        self.run(user_id, MemoryInput::Task(task)).await
    }

    /// Tools bound to one user, recording applied changes into `ops`.
    fn tools(&self, user_id: &str, ops: &Arc<Mutex<Vec<MemoryOp>>>) -> ToolRegistry {
        let scope = Scope {
            db: self.db.clone(),
            user_id: user_id.to_string(),
            ops: ops.clone(),
        };
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(AddMemory(scope.clone())));
        registry.register(Arc::new(UpdateMemory(scope.clone())));
        if self.delete_memories {
            registry.register(Arc::new(DeleteMemory(scope.clone())));
        }
        if self.clear_memories {
            registry.register(Arc::new(ClearMemory(scope)));
        }
        registry
    }

    async fn system_prompt(&self, user_id: &str) -> Result<String, SableError> {
        let mut prompt = MANAGER_PROMPT.to_string();
        if self.delete_memories {
            prompt.push('\n');
            prompt.push_str(DELETE_HINT);
        }
        if self.clear_memories {
            prompt.push('\n');
            prompt.push_str(CLEAR_HINT);
        }
        prompt.push_str("\n\nIf nothing needs to change, reply without calling a tool.");

        let existing = self
            .db
            .list(user_id, MemoryRetrieval::FirstN, MAX_MEMORIES_SHOWN)
            .await?;
        if existing.is_empty() {
            prompt.push_str("\n\nThe user has no memories yet.");
        } else {
            prompt.push_str("\n\n<existing_memories>\n");
            for m in &existing {
                prompt.push_str(&format!("- id: {} | memory: {}\n", m.id, m.memory));
            }
            prompt.push_str("</existing_memories>");
        }
        Ok(prompt)
    }

    /// Runs the manager tool loop for one user.
    pub async fn run(
        &self,
        user_id: &str,
        input: MemoryInput<'_>,
    ) -> Result<MemoryUpdate, SableError> {
        let ops = Arc::new(Mutex::new(Vec::new()));
        let tools = self.tools(user_id, &ops);
        let system_prompt = self.system_prompt(user_id).await?;

        let first = match input {
            MemoryInput::Messages(messages) => {
                let conversation = render_conversation(messages);
                if conversation.is_empty() {
                    return Ok(MemoryUpdate::default());
                }
                format!(
                    "Review this conversation and update the user's memories:\n\n<conversation>\n{conversation}\n</conversation>"
                )
            }
            MemoryInput::Task(task) => format!("Memory task: {task}"),
        };
        let mut messages = vec![ProviderMessage::text("user", first)];
        let mut usage = TokenUsage::default();
        let mut final_text = String::new();

        for round in 0..MAX_ROUNDS {
            let response = self
                .provider
                .complete(ProviderRequest {
                    model: self.model.clone(),
                    system_prompt: Some(system_prompt.clone()),
                    messages: messages.clone(),
                    max_tokens: self.max_tokens,
                    tools: Some(tools.tool_definitions()),
                    ..Default::default()
                })
                .await?;
            usage.accumulate(&response.usage);
            final_text = response.content.clone();

            if response.tool_uses.is_empty() {
                break;
            }
            debug!(round, calls = response.tool_uses.len(), "memory manager tool calls");

            let mut assistant = Vec::new();
            if !response.content.is_empty() {
                assistant.push(ContentBlock::Text {
                    text: response.content.clone(),
                });
            }
            let mut results = Vec::new();
            for call in &response.tool_uses {
                assistant.push(ContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.input.clone(),
                });
                let output = tools.execute(&call.name, call.input.clone()).await;
                results.push(ContentBlock::ToolResult {
                    tool_use_id: call.id.clone(),
                    content: output.content,
                    is_error: output.is_error.then_some(true),
                });
            }
            messages.push(ProviderMessage {
                role: "assistant".into(),
                content: assistant,
            });
            messages.push(ProviderMessage {
                role: "user".into(),
                content: results,
            });

            if round + 1 == MAX_ROUNDS {
                warn!(user_id, "memory manager hit the round limit");
            }
        }

        let ops = std::mem::take(&mut *ops.lock().await);
        if !ops.is_empty() {
            info!(user_id, changes = ops.len(), "user memories updated");
        }
        Ok(MemoryUpdate {
            ops,
            usage,
            message: final_text,
        })
    }
}

/// User and assistant text of a run, one `role: text` line per message.
/// Tool traffic is left out.
fn render_conversation(messages: &[ProviderMessage]) -> String {
    messages
        .iter()
        .filter(|m| m.role == "user" || m.role == "assistant")
        .map(|m| (m.role.as_str(), m.text_content()))
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(role, text)| format!("{role}: {}", text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn topics_arg(input: &serde_json::Value) -> Vec<String> {
    input["topics"]
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|t| t.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Clone)]
struct Scope {
    db: MemoryDb,
    user_id: String,
    ops: Arc<Mutex<Vec<MemoryOp>>>,
}

impl Scope {
    async fn record(&self, op: MemoryOp) {
        self.ops.lock().await.push(op);
    }

    async fn owned(&self, id: &str) -> Result<Option<UserMemory>, SableError> {
        Ok(self
            .db
            .get(id)
            .await?
            .filter(|m| m.user_id == self.user_id))
    }
}

struct AddMemory(Scope);

#[async_trait]
impl Tool for AddMemory {
    fn name(&self) -> &str {
        "add_memory"
    }

    fn description(&self) -> &str {
        "Add a new memory about the user."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "memory": {"type": "string", "description": "The fact to remember, as a standalone statement."},
                "topics": {"type": "array", "items": {"type": "string"}, "description": "Topics the memory belongs to."}
            },
            "required": ["memory"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let text = required_str(&input, "memory")?.trim();
        if text.is_empty() {
            return Ok(ToolOutput::error("memory must not be empty"));
        }
        let scope = &self.0;
        let key = normalize(text);
        let existing = scope
            .db
            .list(&scope.user_id, MemoryRetrieval::FirstN, usize::MAX)
            .await?;
        if let Some(dup) = existing.iter().find(|m| normalize(&m.memory) == key) {
            debug!(id = %dup.id, "skipping duplicate memory");
            return Ok(ToolOutput::ok(format!("Memory already exists with id {}", dup.id)));
        }

        let mut memory = UserMemory::new(&scope.user_id, text).with_topics(topics_arg(&input));
        memory.input = optional_str(&input, "input").map(String::from);
        scope.db.upsert(&memory).await?;
        scope.record(MemoryOp::Added(memory.id.clone())).await;
        Ok(ToolOutput::ok(format!("Memory added with id {}", memory.id)))
    }
}

struct UpdateMemory(Scope);

#[async_trait]
impl Tool for UpdateMemory {
    fn name(&self) -> &str {
        "update_memory"
    }

    fn description(&self) -> &str {
        "Replace the text of an existing memory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "memory_id": {"type": "string", "description": "Id of the memory to update."},
                "memory": {"type": "string", "description": "The new text of the memory."},
                "topics": {"type": "array", "items": {"type": "string"}}
            },
            "required": ["memory_id", "memory"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let id = required_str(&input, "memory_id")?;
        let text = required_str(&input, "memory")?.trim();
        let scope = &self.0;
        let Some(mut memory) = scope.owned(id).await? else {
            return Ok(ToolOutput::error(format!("No memory with id {id}")));
        };
        memory.memory = text.to_string();
        let topics = topics_arg(&input);
        if !topics.is_empty() {
            memory.topics = topics;
        }
        memory.updated_at = sable_core::types::now_timestamp();
        scope.db.upsert(&memory).await?;
        scope.record(MemoryOp::Updated(memory.id.clone())).await;
        Ok(ToolOutput::ok(format!("Memory {id} updated")))
    }
}

struct DeleteMemory(Scope);

#[async_trait]
impl Tool for DeleteMemory {
    fn name(&self) -> &str {
        "delete_memory"
    }

    fn description(&self) -> &str {
        "Delete a single memory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "memory_id": {"type": "string", "description": "Id of the memory to delete."}
            },
            "required": ["memory_id"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let id = required_str(&input, "memory_id")?;
        let scope = &self.0;
        if scope.owned(id).await?.is_none() || !scope.db.delete(id).await? {
            return Ok(ToolOutput::error(format!("No memory with id {id}")));
        }
        scope.record(MemoryOp::Deleted(id.to_string())).await;
        Ok(ToolOutput::ok(format!("Memory {id} deleted")))
    }
}

struct ClearMemory(Scope);

#[async_trait]
impl Tool for ClearMemory {
    fn name(&self) -> &str {
        "clear_memory"
    }

    fn description(&self) -> &str {
        "Delete every memory of the user."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object", "properties": {}})
    }

    async fn invoke(&self, _input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let scope = &self.0;
        let removed = scope.db.clear(&scope.user_id).await?;
        scope.record(MemoryOp::Cleared(removed)).await;
        Ok(ToolOutput::ok(format!("Cleared {removed} memories")))
    }
}
