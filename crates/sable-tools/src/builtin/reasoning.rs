// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Think/analyze scratchpad tools.
//!
//! The model records reasoning steps through tool calls. Each call appends
//! to a shared [`ReasoningLog`] and returns the full step history so the
//! model sees its own chain of thought.

use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sable_config::model::ReasoningToolsConfig;
use sable_core::SableError;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::tool::{Tool, ToolOutput, ToolRegistry, optional_str, required_str};

const INSTRUCTIONS: &str = "\
You have access to the `think` and `analyze` tools to work through problems step-by-step and structure your thought process. You must ALWAYS `think` before making tool calls or generating a response.

1. **Think** (scratchpad):
    - Purpose: Use the `think` tool as a scratchpad to break down complex problems, outline steps, and decide on immediate actions within your reasoning flow.
    - Usage: Call `think` multiple times to build a chain of thought. Explain your reasoning and specify the intended action.

2. **Analyze** (evaluation):
    - Purpose: Evaluate the result of a think step or a set of tool calls. Assess if the result is expected, sufficient, or requires further investigation.
    - Usage: Call `analyze` after a set of tool calls. Determine the `next_action` based on your analysis: `continue` (more reasoning is needed), `validate` (seek external confirmation) or `final_answer` (ready to conclude).
    - Explain your reasoning highlighting whether the result is correct or sufficient.

## IMPORTANT GUIDELINES
- **Always Think First:** You MUST use the `think` tool before making other tool calls or generating a response.
- **Iterate to Solve:** Use the `think` and `analyze` tools iteratively to build a clear reasoning path.
- **Keep Thoughts Internal:** The reasoning steps are private. Do not share them with the user directly.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NextAction {
    Continue,
    Validate,
    FinalAnswer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReasoningStep {
    Think {
        title: String,
        thought: String,
        action: Option<String>,
        confidence: f64,
    },
    Analyze {
        title: String,
        result: String,
        analysis: String,
        next_action: NextAction,
        confidence: f64,
    },
}

impl ReasoningStep {
    pub fn title(&self) -> &str {
        match self {
            Self::Think { title, .. } | Self::Analyze { title, .. } => title,
        }
    }
}

/// Steps recorded during the current run. Shared between the tools and the agent.
#[derive(Debug, Clone, Default)]
pub struct ReasoningLog {
    steps: Arc<Mutex<Vec<ReasoningStep>>>,
    emitted: Arc<Mutex<usize>>,
}

impl ReasoningLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, step: ReasoningStep) -> String {
        let mut steps = self.steps.lock().unwrap_or_else(|e| e.into_inner());
        steps.push(step);
        render(&steps)
    }

    /// All steps recorded so far.
    pub fn steps(&self) -> Vec<ReasoningStep> {
        self.steps.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Steps recorded since the previous call.
    pub fn take_new(&self) -> Vec<ReasoningStep> {
        let steps = self.steps.lock().unwrap_or_else(|e| e.into_inner());
        let mut emitted = self.emitted.lock().unwrap_or_else(|e| e.into_inner());
        let new = steps[(*emitted).min(steps.len())..].to_vec();
        *emitted = steps.len();
        new
    }

    /// Clears the log at the start of a run.
    pub fn reset(&self) {
        self.steps.lock().unwrap_or_else(|e| e.into_inner()).clear();
        *self.emitted.lock().unwrap_or_else(|e| e.into_inner()) = 0;
    }
}

fn render(steps: &[ReasoningStep]) -> String {
    let mut out = String::new();
    for step in steps {
        match step {
            ReasoningStep::Think {
                title,
                thought,
                action,
                confidence,
            } => {
                let _ = writeln!(out, "Title: {title}");
                let _ = writeln!(out, "Reasoning: {thought}");
                if let Some(action) = action {
                    let _ = writeln!(out, "Action: {action}");
                }
                let _ = writeln!(out, "Confidence: {confidence}");
            }
            ReasoningStep::Analyze {
                title,
                result,
                analysis,
                next_action,
                confidence,
            } => {
                let _ = writeln!(out, "Title: {title}");
                let _ = writeln!(out, "Result: {result}");
                let _ = writeln!(out, "Analysis: {analysis}");
                let _ = writeln!(out, "Next Action: {next_action}");
                let _ = writeln!(out, "Confidence: {confidence}");
            }
        }
        out.push('\n');
    }
    out.trim_end().to_string()
}

fn confidence(input: &serde_json::Value) -> f64 {
    input["confidence"].as_f64().unwrap_or(0.8).clamp(0.0, 1.0)
}

pub struct ThinkTool {
    log: ReasoningLog,
    instructions: bool,
}

#[async_trait]
impl Tool for ThinkTool {
    fn name(&self) -> &str {
        "think"
    }

    fn description(&self) -> &str {
        "Use this tool as a scratchpad to reason about the question and work through it step-by-step. \
         It does not obtain new information or change anything."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": {"type": "string", "description": "A concise title for this step"},
                "thought": {"type": "string", "description": "Your detailed thought for this step"},
                "action": {"type": "string", "description": "What you'll do based on this thought"},
                "confidence": {"type": "number", "description": "How confident you are in this thought (0.0 to 1.0)"}
            },
            "required": ["title", "thought"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let step = ReasoningStep::Think {
            title: required_str(&input, "title")?.to_string(),
            thought: required_str(&input, "thought")?.to_string(),
            action: optional_str(&input, "action").map(str::to_string),
            confidence: confidence(&input),
        };
        Ok(ToolOutput::ok(self.log.push(step)))
    }

    fn instructions(&self) -> Option<String> {
        self.instructions.then(|| INSTRUCTIONS.to_string())
    }
}

pub struct AnalyzeTool {
    log: ReasoningLog,
    instructions: bool,
}

#[async_trait]
impl Tool for AnalyzeTool {
    fn name(&self) -> &str {
        "analyze"
    }

    fn description(&self) -> &str {
        "Use this tool to analyze results from a reasoning step and determine the next action."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "title": {"type": "string", "description": "A concise title for this step"},
                "result": {"type": "string", "description": "The outcome of the previous action"},
                "analysis": {"type": "string", "description": "Your analysis of the results"},
                "next_action": {
                    "type": "string",
                    "enum": ["continue", "validate", "final_answer"],
                    "description": "What to do next"
                },
                "confidence": {"type": "number", "description": "Confidence in this analysis (0.0 to 1.0)"}
            },
            "required": ["title", "result", "analysis"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let next_action = match optional_str(&input, "next_action") {
            None => NextAction::Continue,
            Some(raw) => raw.parse().map_err(|_| SableError::Tool {
                message: format!(
                    "invalid next_action '{raw}', expected continue, validate or final_answer"
                ),
                source: None,
            })?,
        };
        let step = ReasoningStep::Analyze {
            title: required_str(&input, "title")?.to_string(),
            result: required_str(&input, "result")?.to_string(),
            analysis: required_str(&input, "analysis")?.to_string(),
            next_action,
            confidence: confidence(&input),
        };
        Ok(ToolOutput::ok(self.log.push(step)))
    }

    fn instructions(&self) -> Option<String> {
        self.instructions.then(|| INSTRUCTIONS.to_string())
    }
}

/// Registers the enabled reasoning tools and returns their shared log.
pub fn register(registry: &mut ToolRegistry, config: &ReasoningToolsConfig) -> ReasoningLog {
    let log = ReasoningLog::new();
    if config.think {
        registry.register(Arc::new(ThinkTool {
            log: log.clone(),
            instructions: config.add_instructions,
        }));
    }
    if config.analyze {
        registry.register(Arc::new(AnalyzeTool {
            log: log.clone(),
            instructions: config.add_instructions,
        }));
    }
    log
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(add_instructions: bool) -> ReasoningToolsConfig {
        ReasoningToolsConfig {
            enabled: true,
            add_instructions,
            ..ReasoningToolsConfig::default()
        }
    }

    #[tokio::test]
    async fn steps_accumulate_and_are_echoed() {
        let mut registry = ToolRegistry::new();
        let log = register(&mut registry, &config(false));

        let out = registry
            .execute(
                "think",
                serde_json::json!({"title": "Plan", "thought": "Look up Agno", "action": "search"}),
            )
            .await;
        assert!(!out.is_error);
        assert!(out.content.contains("Reasoning: Look up Agno"));

        let out = registry
            .execute(
                "analyze",
                serde_json::json!({
                    "title": "Check", "result": "found docs", "analysis": "enough",
                    "next_action": "final_answer", "confidence": 0.9
                }),
            )
            .await;
        assert!(out.content.starts_with("Title: Plan"));
        assert!(out.content.contains("Next Action: final_answer"));
        assert_eq!(log.steps().len(), 2);
    }

    #[tokio::test]
    async fn take_new_returns_each_step_once() {
        let mut registry = ToolRegistry::new();
        let log = register(&mut registry, &config(false));
        registry
            .execute("think", serde_json::json!({"title": "a", "thought": "b"}))
            .await;
        assert_eq!(log.take_new().len(), 1);
        assert!(log.take_new().is_empty());
        log.reset();
        assert!(log.steps().is_empty());
    }

    #[tokio::test]
    async fn invalid_next_action_is_an_error_output() {
        let mut registry = ToolRegistry::new();
        register(&mut registry, &config(false));
        let out = registry
            .execute(
                "analyze",
                serde_json::json!({"title": "t", "result": "r", "analysis": "a", "next_action": "panic"}),
            )
            .await;
        assert!(out.is_error);
        assert!(out.content.contains("invalid next_action"));
    }

    #[test]
    fn instructions_only_when_requested() {
        let mut registry = ToolRegistry::new();
        register(&mut registry, &config(false));
        assert!(registry.instructions().is_empty());

        let mut registry = ToolRegistry::new();
        register(&mut registry, &config(true));
        let instructions = registry.instructions();
        assert_eq!(instructions.len(), 1);
        assert!(instructions[0].contains("`think`"));
    }

    #[test]
    fn think_only() {
        let mut registry = ToolRegistry::new();
        register(
            &mut registry,
            &ReasoningToolsConfig {
                analyze: false,
                ..config(false)
            },
        );
        assert!(registry.get("think").is_some());
        assert!(registry.get("analyze").is_none());
    }
}
