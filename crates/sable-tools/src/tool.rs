// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool trait and registry.
//!
//! Every capability the model can call (built-in toolkits, the knowledge
//! search tool, memory tools, team delegation) implements [`Tool`]. The
//! [`ToolRegistry`] looks tools up by name and renders the tool definition
//! array sent with each provider request.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use sable_core::SableError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Output from a tool invocation, fed back to the model as a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the input object.
    fn parameters_schema(&self) -> serde_json::Value;

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError>;

    /// Guidance appended to the system message's instruction list when this
    /// tool is registered. Tools of one toolkit share the same text; the
    /// registry de-duplicates it.
    fn instructions(&self) -> Option<String> {
        None
    }
}

/// Reads a required string argument.
pub fn required_str<'a>(input: &'a serde_json::Value, key: &str) -> Result<&'a str, SableError> {
    input[key].as_str().ok_or_else(|| SableError::Tool {
        message: format!("missing required '{key}' parameter"),
        source: None,
    })
}

/// Reads an optional string argument, treating `null` and `""` as absent.
pub fn optional_str<'a>(input: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    input[key].as_str().filter(|s| !s.is_empty())
}

/// Registry of tools, indexed by name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool under its `name()`, replacing any previous tool of that name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        if self.tools.insert(tool.name().to_string(), tool).is_some() {
            warn!("tool registered twice, keeping the latest");
        }
    }

    /// Moves every tool of `other` into this registry.
    pub fn extend(&mut self, other: ToolRegistry) {
        for tool in other.tools.into_values() {
            self.register(tool);
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// `(name, description)` pairs sorted by name.
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.tools
            .values()
            .map(|t| (t.name(), t.description()))
            .collect()
    }

    /// `{name, description, input_schema}` objects sorted by name.
    pub fn tool_definitions(&self) -> Vec<serde_json::Value> {
        self.tools
            .values()
            .map(|t| {
                serde_json::json!({
                    "name": t.name(),
                    "description": t.description(),
                    "input_schema": t.parameters_schema(),
                })
            })
            .collect()
    }

    /// Distinct tool instructions in registration-name order.
    pub fn instructions(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for text in self.tools.values().filter_map(|t| t.instructions()) {
            if !out.contains(&text) {
                out.push(text);
            }
        }
        out
    }

    /// Runs a tool by name. Unknown tools and tool errors come back as
    /// error outputs so the model can recover.
    pub async fn execute(&self, name: &str, input: serde_json::Value) -> ToolOutput {
        let Some(tool) = self.get(name) else {
            warn!(tool = name, "model requested an unknown tool");
            return ToolOutput::error(format!("Unknown tool: {name}"));
        };
        debug!(tool = name, "invoking tool");
        match tool.invoke(input).await {
            Ok(output) => output,
            Err(e) => {
                warn!(tool = name, error = %e, "tool invocation failed");
                ToolOutput::error(format!("Error: {e}"))
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tools.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes the input back"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {"message": {"type": "string"}},
                "required": ["message"]
            })
        }

        async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
            Ok(ToolOutput::ok(required_str(&input, "message")?))
        }

        fn instructions(&self) -> Option<String> {
            Some("Echo politely.".into())
        }
    }

    struct AddTool;

    #[async_trait]
    impl Tool for AddTool {
        fn name(&self) -> &str {
            "add"
        }

        fn description(&self) -> &str {
            "Adds two numbers"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }

        async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
            let a = input["a"].as_f64().unwrap_or(0.0);
            let b = input["b"].as_f64().unwrap_or(0.0);
            Ok(ToolOutput::ok(format!("{}", a + b)))
        }

        fn instructions(&self) -> Option<String> {
            Some("Echo politely.".into())
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(AddTool));
        registry
    }

    #[test]
    fn definitions_are_sorted_by_name() {
        let defs = registry().tool_definitions();
        assert_eq!(defs.len(), 2);
        assert_eq!(defs[0]["name"], "add");
        assert_eq!(defs[1]["name"], "echo");
        assert_eq!(defs[1]["input_schema"]["required"][0], "message");
    }

    #[test]
    fn list_and_len() {
        let r = registry();
        assert_eq!(r.list(), vec![("add", "Adds two numbers"), ("echo", "Echoes the input back")]);
        assert_eq!(r.len(), 2);
        assert!(ToolRegistry::new().is_empty());
    }

    #[test]
    fn shared_instructions_are_deduplicated() {
        assert_eq!(registry().instructions(), vec!["Echo politely.".to_string()]);
    }

    #[test]
    fn extend_merges_registries() {
        let mut a = ToolRegistry::new();
        a.register(Arc::new(EchoTool));
        let mut b = ToolRegistry::new();
        b.register(Arc::new(AddTool));
        a.extend(b);
        assert!(a.get("add").is_some());
        assert!(a.get("echo").is_some());
    }

    #[tokio::test]
    async fn execute_runs_tool() {
        let out = registry()
            .execute("add", serde_json::json!({"a": 2, "b": 3}))
            .await;
        assert_eq!(out, ToolOutput::ok("5"));
    }

    #[tokio::test]
    async fn execute_unknown_tool_is_error_output() {
        let out = registry().execute("nope", serde_json::json!({})).await;
        assert!(out.is_error);
        assert!(out.content.contains("Unknown tool: nope"));
    }

    #[tokio::test]
    async fn execute_turns_tool_errors_into_outputs() {
        let out = registry().execute("echo", serde_json::json!({})).await;
        assert!(out.is_error);
        assert!(out.content.contains("'message'"), "got: {}", out.content);
    }

    #[test]
    fn optional_str_ignores_empty() {
        let input = serde_json::json!({"a": "", "b": "x", "c": null});
        assert_eq!(optional_str(&input, "a"), None);
        assert_eq!(optional_str(&input, "b"), Some("x"));
        assert_eq!(optional_str(&input, "c"), None);
    }
}
