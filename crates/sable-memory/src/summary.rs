// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session summaries: a short model-written digest of a session, refreshed
//! after each run and stored under `summary` in the session data.

use std::sync::Arc;

use async_trait::async_trait;
use sable_context::{ContextProvider, ContextRequest};
use sable_core::SableError;
use sable_core::traits::{ProviderAdapter, StorageAdapter};
use sable_core::types::{ProviderMessage, ProviderRequest, TokenUsage, now_timestamp};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::types::SessionSummary;

/// Key of the summary inside `Session::session_data`.
pub const SUMMARY_KEY: &str = "summary";

const SUMMARY_PROMPT: &str = r#"You summarize conversations between a user and an assistant.

PRESERVE:
- Facts the user shared about themselves
- Questions asked and the answers reached
- Decisions, commitments and open items

OMIT greetings, small talk and failed attempts that were corrected.

Respond with a JSON object only:
{"summary": "<two to four sentences in the third person>", "topics": ["<topic>", ...]}"#;

#[derive(Deserialize)]
struct SummaryReply {
    summary: String,
    #[serde(default)]
    topics: Vec<String>,
}

/// Parses the model's reply. Code fences are stripped; a reply that is not
/// the requested JSON is kept whole as the summary text.
fn parse_summary(reply: &str) -> Option<SessionSummary> {
    let trimmed = reply.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    if body.is_empty() {
        return None;
    }
    let (summary, topics) = match serde_json::from_str::<SummaryReply>(body) {
        Ok(r) => (r.summary, r.topics),
        Err(e) => {
            warn!(error = %e, "session summary was not JSON, keeping raw text");
            (body.to_string(), Vec::new())
        }
    };
    Some(SessionSummary {
        summary,
        topics,
        updated_at: now_timestamp(),
    })
}

/// Generates and persists session summaries.
pub struct SessionSummarizer {
    provider: Arc<dyn ProviderAdapter>,
    model: String,
}

impl SessionSummarizer {
    pub fn new(provider: Arc<dyn ProviderAdapter>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Summarizes a conversation.
    pub async fn summarize(
        &self,
        messages: &[ProviderMessage],
    ) -> Result<(Option<SessionSummary>, TokenUsage), SableError> {
        let conversation: String = messages
            .iter()
            .map(|m| (m.role.as_str(), m.text_content()))
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(role, text)| format!("{role}: {text}"))
            .collect::<Vec<_>>()
            .join("\n");
        if conversation.is_empty() {
            return Ok((None, TokenUsage::default()));
        }

        let response = self
            .provider
            .complete(ProviderRequest {
                model: self.model.clone(),
                system_prompt: Some(SUMMARY_PROMPT.to_string()),
                messages: vec![ProviderMessage::text(
                    "user",
                    format!("Summarize this conversation:\n\n{conversation}"),
                )],
                max_tokens: 1024,
                ..Default::default()
            })
            .await?;

        info!(
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            model = %self.model,
            messages = messages.len(),
            "session summary generated"
        );
        Ok((parse_summary(&response.content), response.usage))
    }

    /// Summarizes the recent runs of a session and stores the result.
    pub async fn update(
        &self,
        storage: &dyn StorageAdapter,
        session_id: &str,
        num_runs: usize,
    ) -> Result<TokenUsage, SableError> {
        let runs = storage.get_recent_runs(session_id, num_runs).await?;
        let messages: Vec<ProviderMessage> =
            runs.into_iter().flat_map(|r| r.messages).collect();
        let (summary, usage) = self.summarize(&messages).await?;
        if let Some(summary) = summary {
            persist_summary(storage, session_id, &summary).await?;
        }
        Ok(usage)
    }
}

/// Writes the summary into the session data, keeping other keys.
pub async fn persist_summary(
    storage: &dyn StorageAdapter,
    session_id: &str,
    summary: &SessionSummary,
) -> Result<(), SableError> {
    let Some(session) = storage.get_session(session_id).await? else {
        return Err(SableError::Memory(format!("no session {session_id}")));
    };
    let mut data = match session.session_data {
        serde_json::Value::Object(map) => map,
        _ => serde_json::Map::new(),
    };
    data.insert(
        SUMMARY_KEY.to_string(),
        serde_json::to_value(summary).map_err(|e| SableError::Memory(e.to_string()))?,
    );
    storage
        .update_session_data(session_id, &serde_json::Value::Object(data))
        .await?;
    debug!(session_id, "session summary persisted");
    Ok(())
}

/// Reads the stored summary of a session, if any.
pub async fn load_summary(
    storage: &dyn StorageAdapter,
    session_id: &str,
) -> Result<Option<SessionSummary>, SableError> {
    Ok(storage
        .get_session(session_id)
        .await?
        .and_then(|s| s.session_data.get(SUMMARY_KEY).cloned())
        .and_then(|v| serde_json::from_value(v).ok()))
}

/// Adds `<summary_of_previous_interactions>` to the system message.
pub struct SessionSummaryProvider {
    storage: Arc<dyn StorageAdapter>,
}

impl SessionSummaryProvider {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl ContextProvider for SessionSummaryProvider {
    async fn provide_context(
        &self,
        request: &ContextRequest<'_>,
    ) -> Result<Option<String>, SableError> {
        let Some(summary) = load_summary(self.storage.as_ref(), request.session_id).await? else {
            return Ok(None);
        };
        let mut text = format!(
            "Here is a brief summary of your previous interactions:\n\n<summary_of_previous_interactions>\n{}",
            summary.summary
        );
        if !summary.topics.is_empty() {
            text.push_str(&format!("\n\nTopics: {}", summary.topics.join(", ")));
        }
        text.push_str("\n</summary_of_previous_interactions>\n\nNote: this information is from previous interactions and may be outdated. Prefer information from this conversation.");
        Ok(Some(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_json_reply() {
        let s = parse_summary(r#"{"summary": "Ava asked about Agno.", "topics": ["agno"]}"#).unwrap();
        assert_eq!(s.summary, "Ava asked about Agno.");
        assert_eq!(s.topics, ["agno"]);
    }

    #[test]
    fn strips_code_fences() {
        let s = parse_summary("```json\n{\"summary\": \"x\"}\n```").unwrap();
        assert_eq!(s.summary, "x");
        assert!(s.topics.is_empty());
    }

    #[test]
    fn plain_text_reply_is_kept() {
        let s = parse_summary("The user greeted the assistant.").unwrap();
        assert_eq!(s.summary, "The user greeted the assistant.");
        assert!(parse_summary("   ").is_none());
    }

    #[test]
    fn prompt_asks_for_json() {
        assert!(SUMMARY_PROMPT.contains("\"summary\""));
        assert!(SUMMARY_PROMPT.contains("\"topics\""));
    }
}
