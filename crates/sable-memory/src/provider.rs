// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ContextProvider that places the user's memories in the system message.

use async_trait::async_trait;
use sable_config::model::MemoryRetrieval;
use sable_context::{ContextProvider, ContextRequest, tagged_list};
use sable_core::SableError;

use crate::store::MemoryDb;
use crate::types::{DEFAULT_USER_ID, UserMemory};

/// Injects `<memories_from_previous_interactions>` for the run's user.
pub struct MemoryContextProvider {
    db: MemoryDb,
    retrieval: MemoryRetrieval,
    limit: usize,
    /// Tell the model it can remember things even before any memory exists.
    announce_empty: bool,
}

impl MemoryContextProvider {
    pub fn new(db: MemoryDb, retrieval: MemoryRetrieval, limit: usize) -> Self {
        Self {
            db,
            retrieval,
            limit,
            announce_empty: false,
        }
    }

    pub fn announce_empty(mut self, announce: bool) -> Self {
        self.announce_empty = announce;
        self
    }

    async fn memories(&self, user_id: &str, input: &str) -> Result<Vec<UserMemory>, SableError> {
        match self.retrieval {
            MemoryRetrieval::Keyword => self.db.search(user_id, input, self.limit).await,
            order => self.db.list(user_id, order, self.limit).await,
        }
    }
}

#[async_trait]
impl ContextProvider for MemoryContextProvider {
    async fn provide_context(
        &self,
        request: &ContextRequest<'_>,
    ) -> Result<Option<String>, SableError> {
        let user_id = request.user_id.unwrap_or(DEFAULT_USER_ID);
        let memories = self.memories(user_id, request.input).await?;

        if memories.is_empty() {
            return Ok(self.announce_empty.then(|| {
                "You have the capability to retain memories from previous interactions with the user, but have not had any interactions with the user yet.".to_string()
            }));
        }

        let items: Vec<&str> = memories.iter().map(|m| m.memory.as_str()).collect();
        Ok(Some(format!(
            "You have access to memories from previous interactions with the user that you can use:\n\n{}\n\nNote: this information is from previous interactions and may be updated in this conversation. Always prefer information from this conversation over the past memories.",
            tagged_list("memories_from_previous_interactions", &items)
        )))
    }
}
