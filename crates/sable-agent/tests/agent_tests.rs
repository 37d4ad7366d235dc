// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent run loop against scripted models, assembled from config.

mod common;

use common::{HarnessAdapters, tool_names};
use futures::StreamExt;
use sable_agent::{ResponsePrinter, RunEvent, build_agent};
use sable_core::{SableError, StorageAdapter};
use sable_core::types::ContentBlock;
use sable_memory::{MemoryDb, load_summary};
use sable_test_utils::{MockTurn, TestHarness};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn think(title: &str) -> MockTurn {
    MockTurn::tool_call(
        "think",
        json!({"title": title, "thought": "Check the docs first", "confidence": 0.9}),
    )
}

#[tokio::test]
async fn tool_results_are_fed_back_to_the_model() {
    let harness = TestHarness::builder()
        .with_turns(vec![think("Plan"), MockTurn::text("Agno is a framework for agents.")])
        .configure(|c| {
            c.tools.reasoning.enabled = true;
            c.tools.reasoning.add_instructions = true;
        })
        .build()
        .unwrap();
    let agent = build_agent(&harness.config, &HarnessAdapters(&harness), CancellationToken::new())
        .await
        .unwrap();

    let response = agent.run("What is Agno?").await.unwrap();
    assert_eq!(response.content, "Agno is a framework for agents.");
    assert_eq!(response.tool_calls.len(), 1);
    assert_eq!(response.tool_calls[0].name, "think");
    assert!(!response.tool_calls[0].is_error);
    assert_eq!(response.reasoning_steps.len(), 1);
    assert_eq!(response.usage.input_tokens, 20);
    assert_eq!(response.usage.output_tokens, 40);
    // user, assistant tool call, tool result, final answer
    assert_eq!(response.messages.len(), 4);

    let requests = harness.provider.requests().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(tool_names(&requests[0]), ["analyze", "think"]);
    assert!(requests[0].system_prompt.as_deref().unwrap().contains("Keep Thoughts Internal"));
    let result = requests[1].messages.last().unwrap();
    assert_eq!(result.role, "user");
    assert!(matches!(
        &result.content[0],
        ContentBlock::ToolResult { content, is_error: None, .. } if content.contains("Check the docs first")
    ));
}

#[tokio::test]
async fn unknown_tools_become_error_results() {
    let harness = TestHarness::builder()
        .with_turns(vec![
            MockTurn::tool_call("launch_rocket", json!({})),
            MockTurn::text("I cannot do that."),
        ])
        .build()
        .unwrap();
    let agent = build_agent(&harness.config, &HarnessAdapters(&harness), CancellationToken::new())
        .await
        .unwrap();

    let response = agent.run("Launch it").await.unwrap();
    assert_eq!(response.content, "I cannot do that.");
    assert!(response.tool_calls[0].is_error);
    assert_eq!(response.tool_calls[0].output, "Unknown tool: launch_rocket");
}

#[tokio::test]
async fn tool_loop_stops_at_the_iteration_limit() {
    let harness = TestHarness::builder()
        .with_turns(vec![think("one"), think("two"), think("three")])
        .configure(|c| {
            c.tools.reasoning.enabled = true;
            c.agent.max_tool_iterations = 2;
        })
        .build()
        .unwrap();
    let agent = build_agent(&harness.config, &HarnessAdapters(&harness), CancellationToken::new())
        .await
        .unwrap();

    let response = agent.run("Think hard").await.unwrap();
    assert_eq!(response.tool_calls.len(), 2);
    assert_eq!(harness.provider.requests().await.len(), 2);
    assert_eq!(harness.provider.remaining().await, 1);
}

#[tokio::test]
async fn history_replays_the_last_runs_of_the_session() {
    let harness = TestHarness::builder()
        .with_mock_responses((1..=4).map(|i| format!("a{i}")).collect())
        .configure(|c| {
            c.agent.add_history_to_messages = true;
            c.agent.num_history_runs = 2;
        })
        .build()
        .unwrap();
    let agent = build_agent(&harness.config, &HarnessAdapters(&harness), CancellationToken::new())
        .await
        .unwrap();

    for i in 1..=4 {
        agent.run(&format!("q{i}")).await.unwrap();
    }

    let requests = harness.provider.requests().await;
    let texts: Vec<String> = requests[3].messages.iter().map(|m| m.text_content()).collect();
    assert_eq!(texts, ["q2", "a2", "q3", "a3", "q4"]);

    let session_id = agent.session_id().unwrap();
    let storage = agent.storage().unwrap();
    let session = storage.get_session(&session_id).await.unwrap().unwrap();
    assert_eq!(session.agent_name, "sable");
    assert_eq!(storage.get_recent_runs(&session_id, 10).await.unwrap().len(), 4);

    agent.new_session();
    agent.run("fresh start").await.unwrap();
    let fresh = harness.provider.requests().await;
    assert_eq!(fresh.last().unwrap().messages.len(), 1);
    assert_ne!(agent.session_id().unwrap(), session_id);

    harness.provider.push_turn(MockTurn::text("a5")).await;
    agent.resume_session(session_id.clone());
    agent.run("q5").await.unwrap();
    let resumed = harness.provider.requests().await;
    let texts: Vec<String> = resumed
        .last()
        .unwrap()
        .messages
        .iter()
        .map(|m| m.text_content())
        .collect();
    assert_eq!(texts, ["q3", "a3", "q4", "a4", "q5"]);
}

#[tokio::test]
async fn stream_reports_progress_in_order() {
    let harness = TestHarness::builder()
        .with_turns(vec![think("Plan"), MockTurn::text("Agno builds agents.")])
        .configure(|c| c.tools.reasoning.enabled = true)
        .build()
        .unwrap();
    let agent = build_agent(&harness.config, &HarnessAdapters(&harness), CancellationToken::new())
        .await
        .unwrap();

    let events: Vec<RunEvent> = agent
        .run_stream("What is Agno?")
        .map(|e| e.unwrap())
        .collect()
        .await;

    assert!(matches!(events.first(), Some(RunEvent::RunStarted { .. })));
    let kinds: Vec<&str> = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::ToolCallStarted { .. } => Some("started"),
            RunEvent::ToolCallCompleted { .. } => Some("completed"),
            RunEvent::ReasoningStep(_) => Some("reasoning"),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, ["started", "completed", "reasoning"]);

    let streamed: String = events
        .iter()
        .filter_map(|e| match e {
            RunEvent::Content(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(streamed, "Agno builds agents.");

    let Some(RunEvent::RunCompleted(response)) = events.last() else {
        panic!("stream must end with the response");
    };
    assert_eq!(response.content, streamed);
    assert!(harness.provider.requests().await.iter().all(|r| r.stream));
}

#[tokio::test]
async fn print_response_renders_tool_calls_and_answer() {
    colored::control::set_override(false);
    let harness = TestHarness::builder()
        .with_turns(vec![think("Plan"), MockTurn::text("hi ava, Agno is great.")])
        .configure(|c| c.tools.reasoning.enabled = true)
        .build()
        .unwrap();
    let agent = build_agent(&harness.config, &HarnessAdapters(&harness), CancellationToken::new())
        .await
        .unwrap();

    for stream in [true, false] {
        harness.provider.push_turn(think("Plan")).await;
        harness.provider.push_turn(MockTurn::text("hi ava, Agno is great.")).await;
        let mut printer = ResponsePrinter::new(Vec::new(), true);
        let response = agent
            .write_response("What is Agno?", stream, &mut printer)
            .await
            .unwrap();
        let out = String::from_utf8(printer.into_inner()).unwrap();
        assert!(out.contains("Running: think("), "{out}");
        assert!(out.contains("Reasoning: Plan"), "{out}");
        assert!(out.ends_with("hi ava, Agno is great.\n"), "{out}");
        assert_eq!(response.content, "hi ava, Agno is great.");
    }
}

#[tokio::test]
async fn cancelled_runs_stop_before_the_model_answers() {
    let harness = TestHarness::builder()
        .with_mock_responses(vec!["never seen".into()])
        .build()
        .unwrap();
    let cancel = CancellationToken::new();
    let agent = build_agent(&harness.config, &HarnessAdapters(&harness), cancel.clone())
        .await
        .unwrap();
    cancel.cancel();

    let mut stream = agent.run_stream("hello");
    let mut outcome = None;
    while let Some(event) = stream.next().await {
        if let Err(e) = event {
            outcome = Some(e);
        }
    }
    assert!(matches!(outcome, Some(SableError::Cancelled)));
    assert!(matches!(agent.run("hello").await, Err(SableError::Cancelled)));
}

#[tokio::test]
async fn knowledge_base_adds_the_search_tool() {
    let harness = TestHarness::builder()
        .configure(|c| {
            c.knowledge.urls = vec!["https://docs.agno.com/introduction.md".into()];
        })
        .build()
        .unwrap();
    let agent = build_agent(&harness.config, &HarnessAdapters(&harness), CancellationToken::new())
        .await
        .unwrap();
    assert!(agent.tools().get("search_knowledge_base").is_some());

    let harness = TestHarness::builder()
        .configure(|c| {
            c.knowledge.urls = vec!["https://docs.agno.com/introduction.md".into()];
            c.agent.search_knowledge = false;
        })
        .build()
        .unwrap();
    let agent = build_agent(&harness.config, &HarnessAdapters(&harness), CancellationToken::new())
        .await
        .unwrap();
    assert!(agent.tools().is_empty());
}

fn memory_on(c: &mut sable_config::SableConfig) {
    c.agent.user_id = Some("ava".into());
    c.memory.enabled = true;
    c.memory.delete_memories = true;
    c.memory.clear_memories = true;
}

#[tokio::test]
async fn agentic_memory_is_remembered_across_runs() {
    let harness = TestHarness::builder()
        .with_turns(vec![
            // agent asks the memory manager to store the preference
            MockTurn::tool_call(
                "update_user_memory",
                json!({"task": "The user wants every message to start with 'hi ava'"}),
            ),
            // memory manager
            MockTurn::tool_call(
                "add_memory",
                json!({"memory": "Ava wants every message to start with 'hi ava'"}),
            ),
            MockTurn::text("Added."),
            // agent answers
            MockTurn::text("hi ava, noted!"),
            MockTurn::text("hi ava, Agno is a framework."),
        ])
        .configure(|c| {
            memory_on(c);
            c.agent.enable_agentic_memory = true;
        })
        .build()
        .unwrap();
    let agent = build_agent(&harness.config, &HarnessAdapters(&harness), CancellationToken::new())
        .await
        .unwrap();

    let first = agent
        .run("Always start your messages with 'hi ava'")
        .await
        .unwrap();
    assert_eq!(first.content, "hi ava, noted!");
    assert_eq!(first.tool_calls[0].output, "Memories updated successfully");

    agent.run("What is Agno?").await.unwrap();

    let requests = harness.provider.requests().await;
    let first_system = requests[0].system_prompt.as_deref().unwrap();
    assert!(first_system.contains("capability to retain memories"));
    assert!(tool_names(&requests[0]).contains(&"update_user_memory".to_string()));
    assert_eq!(
        tool_names(&requests[1]),
        ["add_memory", "clear_memory", "delete_memory", "update_memory"]
    );
    let last_system = requests.last().unwrap().system_prompt.as_deref().unwrap();
    assert!(last_system.contains("<memories_from_previous_interactions>"));
    assert!(last_system.contains("- Ava wants every message to start with 'hi ava'"));
}

#[tokio::test]
async fn user_memories_are_extracted_after_each_run() {
    let harness = TestHarness::builder()
        .with_turns(vec![
            MockTurn::text("Nice to meet you, Ava."),
            MockTurn::tool_call("add_memory", json!({"memory": "The user's name is Ava"})),
            MockTurn::text("Stored."),
        ])
        .configure(|c| {
            memory_on(c);
            c.memory.enable_user_memories = true;
        })
        .build()
        .unwrap();
    let agent = build_agent(&harness.config, &HarnessAdapters(&harness), CancellationToken::new())
        .await
        .unwrap();

    let response = agent.run("My name is Ava").await.unwrap();
    assert_eq!(response.content, "Nice to meet you, Ava.");
    assert!(agent.tools().get("update_user_memory").is_none());

    let db = MemoryDb::open(&harness.config.memory).await.unwrap();
    assert_eq!(db.count("ava").await.unwrap(), 1);
    let requests = harness.provider.requests().await;
    assert!(requests[1].messages[0].text_content().contains("user: My name is Ava"));
}

#[tokio::test]
async fn session_summaries_feed_the_next_run() {
    let harness = TestHarness::builder()
        .with_turns(vec![
            MockTurn::text("Agno is a framework."),
            MockTurn::text(r#"{"summary": "Ava asked what Agno is.", "topics": ["agno"]}"#),
            MockTurn::text("You asked about Agno."),
            MockTurn::text(r#"{"summary": "Ava asked twice.", "topics": []}"#),
        ])
        .configure(|c| {
            memory_on(c);
            c.memory.enable_session_summaries = true;
        })
        .build()
        .unwrap();
    let agent = build_agent(&harness.config, &HarnessAdapters(&harness), CancellationToken::new())
        .await
        .unwrap();

    agent.run("What is Agno?").await.unwrap();
    let storage = agent.storage().unwrap().clone();
    let session_id = agent.session_id().unwrap();
    let summary = load_summary(storage.as_ref(), &session_id).await.unwrap().unwrap();
    assert_eq!(summary.summary, "Ava asked what Agno is.");

    agent.run("What did I ask?").await.unwrap();
    let requests = harness.provider.requests().await;
    let system = requests[2].system_prompt.as_deref().unwrap();
    assert!(system.contains("<summary_of_previous_interactions>\nAva asked what Agno is."));
}

#[tokio::test]
async fn memory_flags_without_memory_enabled_are_ignored() {
    let harness = TestHarness::builder()
        .configure(|c| {
            c.agent.enable_agentic_memory = true;
            c.memory.enable_user_memories = true;
        })
        .build()
        .unwrap();
    let agent = build_agent(&harness.config, &HarnessAdapters(&harness), CancellationToken::new())
        .await
        .unwrap();
    assert!(agent.tools().is_empty());
    assert!(agent.storage().is_none());
}
