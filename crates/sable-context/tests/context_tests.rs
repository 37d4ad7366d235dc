// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Context assembly against real session storage.

use std::sync::Arc;

use async_trait::async_trait;
use sable_config::model::{AgentConfig, StorageConfig};
use sable_context::{ContextEngine, ContextProvider, ContextRequest, HistoryWindow, SystemPrompt};
use sable_core::types::{ContentBlock, ProviderMessage, RunRecord, Session, TokenUsage};
use sable_core::{SableError, StorageAdapter};
use sable_storage::SqliteStorage;

struct Fixed(&'static str);

#[async_trait]
impl ContextProvider for Fixed {
    async fn provide_context(
        &self,
        _request: &ContextRequest<'_>,
    ) -> Result<Option<String>, SableError> {
        Ok(Some(self.0.to_string()))
    }
}

async fn storage_with_runs(dir: &tempfile::TempDir, runs: usize) -> SqliteStorage {
    let storage = SqliteStorage::new(StorageConfig {
        db_file: dir.path().join("agent.db").to_string_lossy().into_owned(),
        table_name: "agent_sessions".into(),
        wal_mode: true,
    })
    .unwrap();
    storage.initialize().await.unwrap();
    storage
        .create_session(&Session {
            id: "s1".into(),
            agent_name: "Agno AGI".into(),
            user_id: Some("ava".into()),
            state: "active".into(),
            session_data: serde_json::json!({}),
            created_at: "2026-01-01T00:00:00.000Z".into(),
            updated_at: "2026-01-01T00:00:00.000Z".into(),
        })
        .await
        .unwrap();
    for i in 0..runs {
        storage
            .insert_run(&RunRecord {
                id: format!("r{i}"),
                session_id: "s1".into(),
                user_id: Some("ava".into()),
                input: format!("q{i}"),
                output: format!("a{i}"),
                messages: vec![
                    ProviderMessage::text("user", format!("q{i}")),
                    ProviderMessage::text("assistant", format!("a{i}")),
                ],
                usage: TokenUsage::default(),
                created_at: "2026-01-01T00:00:00.000Z".into(),
            })
            .await
            .unwrap();
    }
    storage
}

fn request(input: &str) -> ContextRequest<'_> {
    ContextRequest {
        session_id: "s1",
        user_id: Some("ava"),
        input,
    }
}

#[tokio::test]
async fn last_n_runs_precede_the_new_input() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage_with_runs(&dir, 5).await;
    let config = AgentConfig {
        add_history_to_messages: true,
        num_history_runs: 3,
        ..Default::default()
    };
    let engine = ContextEngine::from_agent(&config).await.unwrap();

    let ctx = engine
        .assemble(Some(&storage), &request("What is Agno?"), &[])
        .await
        .unwrap();
    let texts: Vec<String> = ctx.messages.iter().map(|m| m.text_content()).collect();
    assert_eq!(texts, ["q2", "a2", "q3", "a3", "q4", "a4", "What is Agno?"]);
}

#[tokio::test]
async fn unanswered_run_does_not_break_turn_order() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage_with_runs(&dir, 1).await;
    storage
        .insert_run(&RunRecord {
            id: "r-cut".into(),
            session_id: "s1".into(),
            user_id: Some("ava".into()),
            input: "search it".into(),
            output: String::new(),
            messages: vec![
                ProviderMessage::text("user", "search it"),
                ProviderMessage {
                    role: "assistant".into(),
                    content: vec![ContentBlock::ToolUse {
                        id: "t1".into(),
                        name: "duckduckgo_search".into(),
                        input: serde_json::json!({"query": "agno"}),
                    }],
                },
                ProviderMessage {
                    role: "user".into(),
                    content: vec![ContentBlock::ToolResult {
                        tool_use_id: "t1".into(),
                        content: "[]".into(),
                        is_error: None,
                    }],
                },
            ],
            usage: TokenUsage::default(),
            created_at: "2026-01-01T00:00:01.000Z".into(),
        })
        .await
        .unwrap();
    let config = AgentConfig {
        add_history_to_messages: true,
        num_history_runs: 3,
        ..Default::default()
    };
    let engine = ContextEngine::from_agent(&config).await.unwrap();

    let ctx = engine
        .assemble(Some(&storage), &request("try again"), &[])
        .await
        .unwrap();
    let roles: Vec<&str> = ctx.messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, ["user", "assistant", "user"]);
    assert_eq!(ctx.messages[2].text_content(), "try again");
}

#[tokio::test]
async fn history_disabled_sends_only_input() {
    let dir = tempfile::tempdir().unwrap();
    let storage = storage_with_runs(&dir, 2).await;
    let engine = ContextEngine::new(SystemPrompt::fixed("sys"), HistoryWindow::disabled());
    let ctx = engine
        .assemble(Some(&storage), &request("hello"), &[])
        .await
        .unwrap();
    assert_eq!(ctx.messages, vec![ProviderMessage::text("user", "hello")]);
    assert_eq!(ctx.system_prompt, "sys");
}

#[tokio::test]
async fn provider_sections_are_appended_in_order() {
    let config = AgentConfig {
        description: Some("You are Agno AGI.".into()),
        instructions: vec!["Search the web for information about Agno.".into()],
        ..Default::default()
    };
    let mut engine = ContextEngine::from_agent(&config).await.unwrap();
    engine.add_provider(Arc::new(Fixed("<memories_from_previous_interactions>\n- likes tea\n</memories_from_previous_interactions>")));
    engine.add_provider(Arc::new(Fixed("<summary_of_previous_interactions>\nchat\n</summary_of_previous_interactions>")));

    let ctx = engine
        .assemble(None, &request("hi"), &["Search your knowledge base.".into()])
        .await
        .unwrap();
    let sys = &ctx.system_prompt;
    let instructions = sys.find("<instructions>").unwrap();
    let memories = sys.find("<memories_from_previous_interactions>").unwrap();
    let summary = sys.find("<summary_of_previous_interactions>").unwrap();
    assert!(sys.starts_with("You are Agno AGI."));
    assert!(instructions < memories && memories < summary);
    assert!(sys.contains("- Search your knowledge base.\n</instructions>"));
    assert_eq!(ctx.messages.len(), 1);
}
