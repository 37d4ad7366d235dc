// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `update_user_memory`: lets the agent itself decide when to change the
//! user's memories.

use std::sync::Arc;

use async_trait::async_trait;
use sable_core::SableError;
use sable_tools::{Tool, ToolOutput, required_str};

use crate::manager::MemoryManager;

const INSTRUCTIONS: &str = "You can use the `update_user_memory` tool to add, update or remove memories about the user. When the user shares information that would personalize future conversations (their name, preferences, how they want to be answered, their projects), call `update_user_memory` with a short description of the change. Also call it when the user asks you to remember or forget something.";

/// Agent-facing tool delegating to the [`MemoryManager`].
pub struct UpdateUserMemoryTool {
    manager: Arc<MemoryManager>,
    user_id: String,
}

impl UpdateUserMemoryTool {
    pub fn new(manager: Arc<MemoryManager>, user_id: impl Into<String>) -> Self {
        Self {
            manager,
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl Tool for UpdateUserMemoryTool {
    fn name(&self) -> &str {
        "update_user_memory"
    }

    fn description(&self) -> &str {
        "Update the user's memories. Describe the change as a task, e.g. \"Remember that the user prefers short answers\"."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "task": {
                    "type": "string",
                    "description": "The memory change to make, in plain language."
                }
            },
            "required": ["task"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let task = required_str(&input, "task")?;
        let update = self.manager.update_memory_task(&self.user_id, task).await?;
        Ok(ToolOutput::ok(if update.changed() {
            "Memories updated successfully"
        } else {
            "No memory changes were needed"
        }))
    }

    fn instructions(&self) -> Option<String> {
        Some(INSTRUCTIONS.to_string())
    }
}
