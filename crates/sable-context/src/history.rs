// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! History window: replays the messages of the last runs of a session
//! ahead of the new user input.

use sable_config::model::AgentConfig;
use sable_core::SableError;
use sable_core::traits::StorageAdapter;
use sable_core::types::{ContentBlock, ProviderMessage, RunRecord};
use tracing::debug;

/// How much of a session's history is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    enabled: bool,
    num_runs: usize,
}

impl HistoryWindow {
    pub fn new(enabled: bool, num_runs: usize) -> Self {
        Self { enabled, num_runs }
    }

    pub fn from_agent(config: &AgentConfig) -> Self {
        Self::new(config.add_history_to_messages, config.num_history_runs)
    }

    pub fn disabled() -> Self {
        Self::new(false, 0)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && self.num_runs > 0
    }

    /// Loads the last runs of `session_id` as provider messages, oldest first.
    pub async fn load(
        &self,
        storage: &dyn StorageAdapter,
        session_id: &str,
    ) -> Result<Vec<ProviderMessage>, SableError> {
        if !self.is_enabled() {
            return Ok(Vec::new());
        }
        let runs = storage.get_recent_runs(session_id, self.num_runs).await?;
        debug!(session_id, runs = runs.len(), "replaying history");
        Ok(replay_messages(&runs))
    }
}

/// Flattens runs into user/assistant text turns.
///
/// Tool-use and tool-result blocks are dropped: the tools of an earlier run
/// may not be registered any more, and providers reject orphaned tool
/// results. Runs that produced no assistant text (a tool loop cut off by
/// the iteration limit) are skipped, and adjacent messages left with the
/// same role are merged, so the replay alternates user/assistant and ends
/// on an assistant turn.
pub fn replay_messages(runs: &[RunRecord]) -> Vec<ProviderMessage> {
    let mut out: Vec<ProviderMessage> = Vec::new();
    let answered = runs.iter().filter(|run| {
        run.messages
            .iter()
            .any(|m| m.role == "assistant" && !m.text_content().trim().is_empty())
    });
    for message in answered.flat_map(|r| &r.messages) {
        let text = message.text_content();
        if text.trim().is_empty() {
            continue;
        }
        match out.last_mut() {
            Some(prev) if prev.role == message.role => {
                if let Some(ContentBlock::Text { text: prev_text }) = prev.content.last_mut() {
                    prev_text.push_str("\n\n");
                    prev_text.push_str(&text);
                }
            }
            _ => out.push(ProviderMessage::text(message.role.clone(), text)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::types::TokenUsage;

    fn run(id: &str, messages: Vec<ProviderMessage>) -> RunRecord {
        RunRecord {
            id: id.into(),
            session_id: "s1".into(),
            user_id: None,
            input: String::new(),
            output: String::new(),
            messages,
            usage: TokenUsage::default(),
            created_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    #[test]
    fn tool_blocks_are_dropped_and_turns_merged() {
        let runs = vec![run(
            "r1",
            vec![
                ProviderMessage::text("user", "What is AAPL at?"),
                ProviderMessage {
                    role: "assistant".into(),
                    content: vec![
                        ContentBlock::Text {
                            text: "Let me check.".into(),
                        },
                        ContentBlock::ToolUse {
                            id: "t1".into(),
                            name: "get_current_stock_price".into(),
                            input: serde_json::json!({"symbol": "AAPL"}),
                        },
                    ],
                },
                ProviderMessage {
                    role: "user".into(),
                    content: vec![ContentBlock::ToolResult {
                        tool_use_id: "t1".into(),
                        content: "201.5".into(),
                        is_error: None,
                    }],
                },
                ProviderMessage::text("assistant", "AAPL is at 201.50."),
            ],
        )];

        let replay = replay_messages(&runs);
        assert_eq!(replay.len(), 2);
        assert_eq!(replay[0].text_content(), "What is AAPL at?");
        assert_eq!(replay[1].role, "assistant");
        assert_eq!(replay[1].text_content(), "Let me check.\n\nAAPL is at 201.50.");
    }

    #[test]
    fn runs_are_concatenated_in_order() {
        let runs = vec![
            run(
                "r1",
                vec![
                    ProviderMessage::text("user", "one"),
                    ProviderMessage::text("assistant", "1"),
                ],
            ),
            run(
                "r2",
                vec![
                    ProviderMessage::text("user", "two"),
                    ProviderMessage::text("assistant", "2"),
                ],
            ),
        ];
        let texts: Vec<String> = replay_messages(&runs).iter().map(|m| m.text_content()).collect();
        assert_eq!(texts, ["one", "1", "two", "2"]);
    }

    #[test]
    fn runs_without_an_answer_are_skipped() {
        let runs = vec![
            run(
                "r1",
                vec![
                    ProviderMessage::text("user", "one"),
                    ProviderMessage::text("assistant", "1"),
                ],
            ),
            run(
                "r2",
                vec![
                    ProviderMessage::text("user", "price of AAPL?"),
                    ProviderMessage {
                        role: "assistant".into(),
                        content: vec![ContentBlock::ToolUse {
                            id: "t1".into(),
                            name: "get_current_stock_price".into(),
                            input: serde_json::json!({"symbol": "AAPL"}),
                        }],
                    },
                    ProviderMessage {
                        role: "user".into(),
                        content: vec![ContentBlock::ToolResult {
                            tool_use_id: "t1".into(),
                            content: "201.5".into(),
                            is_error: None,
                        }],
                    },
                ],
            ),
        ];
        let replay = replay_messages(&runs);
        let roles: Vec<&str> = replay.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["user", "assistant"]);
        assert_eq!(replay[1].text_content(), "1");
    }

    #[test]
    fn window_flags() {
        assert!(!HistoryWindow::disabled().is_enabled());
        assert!(!HistoryWindow::new(true, 0).is_enabled());
        assert!(HistoryWindow::new(true, 3).is_enabled());
        let config = AgentConfig {
            add_history_to_messages: true,
            ..Default::default()
        };
        assert_eq!(HistoryWindow::from_agent(&config), HistoryWindow::new(true, 3));
    }
}
