// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `search_knowledge_base`: agentic retrieval over a [`UrlKnowledge`].

use std::sync::Arc;

use async_trait::async_trait;
use sable_core::SableError;
use sable_tools::{Tool, ToolOutput, required_str};
use serde::Serialize;

use crate::knowledge::UrlKnowledge;

#[derive(Serialize)]
struct Hit<'a> {
    name: &'a str,
    content: &'a str,
    meta: &'a serde_json::Value,
    score: f32,
}

pub struct SearchKnowledgeBase {
    knowledge: Arc<UrlKnowledge>,
}

impl SearchKnowledgeBase {
    pub fn new(knowledge: Arc<UrlKnowledge>) -> Self {
        Self { knowledge }
    }
}

#[async_trait]
impl Tool for SearchKnowledgeBase {
    fn name(&self) -> &str {
        "search_knowledge_base"
    }

    fn description(&self) -> &str {
        "Use this function to search the knowledge base for information about a query. \
         Returns a JSON list of matching documents."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "The query to search for"}
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let query = required_str(&input, "query")?;
        let docs = self.knowledge.search(query, None).await?;
        if docs.is_empty() {
            return Ok(ToolOutput::ok("No documents found"));
        }
        let hits: Vec<Hit<'_>> = docs
            .iter()
            .map(|d| Hit {
                name: &d.document.name,
                content: &d.document.content,
                meta: &d.document.meta,
                score: d.score,
            })
            .collect();
        Ok(ToolOutput::ok(
            serde_json::to_string_pretty(&hits).unwrap_or_else(|_| "[]".to_string()),
        ))
    }

    fn instructions(&self) -> Option<String> {
        Some(
            "Search your knowledge base with `search_knowledge_base` before answering questions \
             it may cover, and base your answer on what you find."
                .to_string(),
        )
    }
}
