// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events and results of a run.

use std::pin::Pin;

use futures::Stream;
use sable_core::SableError;
use sable_core::types::{ProviderMessage, TokenUsage};
use sable_tools::{ReasoningLog, ReasoningStep};

/// A tool call made during a run, with its result.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
    pub output: String,
    pub is_error: bool,
}

/// The outcome of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResponse {
    pub run_id: String,
    pub session_id: String,
    /// Text of every model turn, in order.
    pub content: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub reasoning_steps: Vec<ReasoningStep>,
    /// Summed over every model call of the run.
    pub usage: TokenUsage,
    /// The user input, assistant turns and tool results of this run.
    pub messages: Vec<ProviderMessage>,
}

/// Progress of a run, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    RunStarted {
        run_id: String,
        session_id: String,
    },
    /// A piece of model text.
    Content(String),
    ToolCallStarted {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolCallCompleted {
        id: String,
        name: String,
        output: String,
        is_error: bool,
    },
    ReasoningStep(ReasoningStep),
    /// A team member finished a delegated task.
    MemberResponse {
        member: String,
        content: String,
    },
    RunCompleted(RunResponse),
}

pub type RunStream = Pin<Box<dyn Stream<Item = Result<RunEvent, SableError>> + Send>>;

/// Side channel for events produced inside tools, drained after each tool call.
pub trait EventSource: Send + Sync {
    /// Called when a run starts.
    fn reset(&self) {}

    /// Events produced since the previous call.
    fn drain(&self) -> Vec<RunEvent>;
}

impl EventSource for ReasoningLog {
    fn reset(&self) {
        ReasoningLog::reset(self);
    }

    fn drain(&self) -> Vec<RunEvent> {
        self.take_new()
            .into_iter()
            .map(RunEvent::ReasoningStep)
            .collect()
    }
}
