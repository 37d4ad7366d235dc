// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory domain types.

use serde::{Deserialize, Serialize};

/// User id used when an agent has none configured.
pub const DEFAULT_USER_ID: &str = "default";

/// One durable fact about a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMemory {
    pub id: String,
    pub user_id: String,
    /// The fact as a standalone statement ("The user's name is Ava").
    pub memory: String,
    #[serde(default)]
    pub topics: Vec<String>,
    /// The input the memory was derived from, if any.
    #[serde(default)]
    pub input: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl UserMemory {
    /// A new memory with a fresh id, stamped now.
    pub fn new(user_id: impl Into<String>, memory: impl Into<String>) -> Self {
        let now = sable_core::types::now_timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            memory: memory.into(),
            topics: Vec::new(),
            input: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn with_topics(mut self, topics: Vec<String>) -> Self {
        self.topics = topics;
        self
    }
}

/// Running summary of one session, kept under `summary` in the session data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub summary: String,
    #[serde(default)]
    pub topics: Vec<String>,
    pub updated_at: String,
}

/// Normalizes memory text for duplicate detection.
pub(crate) fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches('.')
        .to_lowercase()
}
