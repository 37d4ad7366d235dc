// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Teams in coordinate mode.
//!
//! The leader is an ordinary [`Agent`] whose tools transfer sub-tasks to
//! member agents and, with agentic context, write a context shared with
//! every member. Members never receive the transfer tool, so delegation is
//! a single level deep.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sable_context::{
    ContextEngine, ContextProvider, ContextRequest, HistoryWindow, PromptTemplate, SystemPrompt,
};
use sable_core::SableError;
use sable_core::traits::ProviderAdapter;
use sable_tools::{Tool, ToolOutput, ToolRegistry, Toolbox, optional_str, required_str};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::Agent;
use crate::event::{EventSource, RunEvent, RunResponse, RunStream};
use crate::print::ResponsePrinter;

const TRANSFER_INSTRUCTIONS: &str = "You lead a team of agents. Either answer directly or transfer tasks to the members most likely to complete them, using `transfer_task_to_member` with a member_id, a clear task_description and the expected_output. You cannot use a member's tools yourself. Always validate a member's answer before responding; re-assign the task if the result is not good enough.";

const CONTEXT_INSTRUCTIONS: &str = "Use `set_shared_context` to record what the team has learned so far. Members receive the shared context with every task.";

pub use sable_config::model::member_id;

/// A member agent and what the leader should send it.
#[derive(Debug, Clone)]
pub struct TeamMember {
    pub name: String,
    pub role: Option<String>,
    pub agent: Agent,
}

impl TeamMember {
    pub fn new(agent: Agent, role: Option<String>) -> Self {
        Self {
            name: agent.name().to_string(),
            role,
            agent,
        }
    }

    pub fn id(&self) -> String {
        member_id(&self.name)
    }
}

/// Context the leader writes and members read.
#[derive(Debug, Clone, Default)]
pub struct SharedContext(Arc<Mutex<Option<String>>>);

impl SharedContext {
    pub fn get(&self) -> Option<String> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn set(&self, state: impl Into<String>) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = Some(state.into());
    }
}

/// Member answers waiting to be reported as [`RunEvent::MemberResponse`].
#[derive(Debug, Clone, Default)]
struct MemberLog(Arc<Mutex<Vec<(String, String)>>>);

impl MemberLog {
    fn record(&self, member: &str, content: &str) {
        self.0
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((member.to_string(), content.to_string()));
    }
}

impl EventSource for MemberLog {
    fn reset(&self) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    fn drain(&self) -> Vec<RunEvent> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(|e| e.into_inner()))
            .into_iter()
            .map(|(member, content)| RunEvent::MemberResponse { member, content })
            .collect()
    }
}

struct TransferTaskTool {
    members: Arc<Vec<TeamMember>>,
    shared: Option<SharedContext>,
    log: MemberLog,
}

#[async_trait]
impl Tool for TransferTaskTool {
    fn name(&self) -> &str {
        "transfer_task_to_member"
    }

    fn description(&self) -> &str {
        "Transfer a task to a member of the team and return the member's answer."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        let ids: Vec<String> = self.members.iter().map(TeamMember::id).collect();
        serde_json::json!({
            "type": "object",
            "properties": {
                "member_id": {
                    "type": "string",
                    "enum": ids,
                    "description": "The id of the member to transfer the task to."
                },
                "task_description": {
                    "type": "string",
                    "description": "A clear and concise description of the task."
                },
                "expected_output": {
                    "type": "string",
                    "description": "The output the member should produce."
                }
            },
            "required": ["member_id", "task_description"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let requested = member_id(required_str(&input, "member_id")?);
        let task = required_str(&input, "task_description")?;

        let Some(member) = self.members.iter().find(|m| m.id() == requested) else {
            let known: Vec<String> = self.members.iter().map(TeamMember::id).collect();
            warn!(member = requested.as_str(), "transfer to unknown member");
            return Ok(ToolOutput::error(format!(
                "Member {requested} not found in the team. Available members: {}",
                known.join(", ")
            )));
        };

        let mut prompt = task.to_string();
        if let Some(expected) = optional_str(&input, "expected_output") {
            prompt.push_str(&format!("\n\n<expected_output>\n{expected}\n</expected_output>"));
        }
        if let Some(state) = self.shared.as_ref().and_then(SharedContext::get) {
            prompt.push_str(&format!("\n\n<shared_context>\n{state}\n</shared_context>"));
        }

        info!(member = member.name.as_str(), "transferring task to member");
        let response = member.agent.run(&prompt).await?;
        self.log.record(&member.name, &response.content);
        Ok(ToolOutput::ok(response.content))
    }

    fn instructions(&self) -> Option<String> {
        Some(TRANSFER_INSTRUCTIONS.to_string())
    }
}

struct SetSharedContextTool {
    shared: SharedContext,
}

#[async_trait]
impl Tool for SetSharedContextTool {
    fn name(&self) -> &str {
        "set_shared_context"
    }

    fn description(&self) -> &str {
        "Replace the context shared with every member of the team."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "state": {
                    "type": "string",
                    "description": "The full shared context."
                }
            },
            "required": ["state"]
        })
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        let state = required_str(&input, "state")?;
        self.shared.set(state);
        Ok(ToolOutput::ok("Shared context updated"))
    }

    fn instructions(&self) -> Option<String> {
        Some(CONTEXT_INSTRUCTIONS.to_string())
    }
}

/// Describes the members, the success criteria and the shared context to
/// the leader.
struct TeamContextProvider {
    members: Arc<Vec<TeamMember>>,
    success_criteria: Option<String>,
    shared: Option<SharedContext>,
}

impl TeamContextProvider {
    fn members_section(&self) -> String {
        let mut out = String::from("<team_members>");
        for (i, member) in self.members.iter().enumerate() {
            out.push_str(&format!(
                "\n- Agent {}:\n  - ID: {}\n  - Name: {}",
                i + 1,
                member.id(),
                member.name
            ));
            if let Some(role) = &member.role {
                out.push_str(&format!("\n  - Role: {role}"));
            }
            let tools = member.agent.tools().list();
            if !tools.is_empty() {
                out.push_str("\n  - Available tools:");
                for (name, _) in tools {
                    out.push_str(&format!("\n    - {name}"));
                }
            }
        }
        out.push_str("\n</team_members>");
        out
    }
}

#[async_trait]
impl ContextProvider for TeamContextProvider {
    async fn provide_context(
        &self,
        _request: &ContextRequest<'_>,
    ) -> Result<Option<String>, SableError> {
        let mut sections = vec![self.members_section()];
        if let Some(criteria) = &self.success_criteria {
            sections.push(format!(
                "<success_criteria>\n{criteria}\n</success_criteria>\nStop the team run when the success criteria are met."
            ));
        }
        if let Some(state) = self.shared.as_ref().and_then(SharedContext::get) {
            sections.push(format!("<shared_context>\n{state}\n</shared_context>"));
        }
        Ok(Some(sections.join("\n\n")))
    }
}

/// A leader agent coordinating member agents.
#[derive(Debug, Clone)]
pub struct Team {
    leader: Agent,
    members: Arc<Vec<TeamMember>>,
    shared: Option<SharedContext>,
}

/// Builder for [`Team`].
pub struct TeamBuilder {
    name: String,
    provider: Arc<dyn ProviderAdapter>,
    model: String,
    max_tokens: u32,
    template: PromptTemplate,
    success_criteria: Option<String>,
    show_members_responses: bool,
    enable_agentic_context: bool,
    toolbox: Toolbox,
    members: Vec<TeamMember>,
    max_tool_iterations: usize,
    cancel: CancellationToken,
}

impl TeamBuilder {
    pub fn new(provider: Arc<dyn ProviderAdapter>, model: impl Into<String>) -> Self {
        Self {
            name: "team".to_string(),
            provider,
            model: model.into(),
            max_tokens: 4096,
            template: PromptTemplate::default(),
            success_criteria: None,
            show_members_responses: false,
            enable_agentic_context: false,
            toolbox: Toolbox::default(),
            members: Vec::new(),
            max_tool_iterations: 10,
            cancel: CancellationToken::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Description, instructions and formatting flags of the leader.
    pub fn template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn success_criteria(mut self, criteria: Option<String>) -> Self {
        self.success_criteria = criteria;
        self
    }

    pub fn show_members_responses(mut self, show: bool) -> Self {
        self.show_members_responses = show;
        self
    }

    pub fn enable_agentic_context(mut self, enable: bool) -> Self {
        self.enable_agentic_context = enable;
        self
    }

    /// Leader toolkits, typically reasoning.
    pub fn toolbox(mut self, toolbox: Toolbox) -> Self {
        self.toolbox = toolbox;
        self
    }

    pub fn member(mut self, member: TeamMember) -> Self {
        self.members.push(member);
        self
    }

    pub fn max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max;
        self
    }

    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> Result<Team, SableError> {
        if self.members.is_empty() {
            return Err(SableError::Config(format!(
                "team {} has no members",
                self.name
            )));
        }
        let members = Arc::new(self.members);
        let shared = self.enable_agentic_context.then(SharedContext::default);
        let log = MemberLog::default();

        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(TransferTaskTool {
            members: members.clone(),
            shared: shared.clone(),
            log: log.clone(),
        }));
        if let Some(shared) = &shared {
            tools.register(Arc::new(SetSharedContextTool {
                shared: shared.clone(),
            }));
        }

        let mut context = ContextEngine::new(
            SystemPrompt::generated(self.template),
            HistoryWindow::disabled(),
        );
        context.add_provider(Arc::new(TeamContextProvider {
            members: members.clone(),
            success_criteria: self.success_criteria,
            shared: shared.clone(),
        }));

        let mut leader = Agent::builder(self.provider, self.model)
            .name(self.name)
            .max_tokens(self.max_tokens)
            .context(context)
            .tools(tools)
            .toolbox(self.toolbox)
            .max_tool_iterations(self.max_tool_iterations)
            .cancel_token(self.cancel);
        if self.show_members_responses {
            leader = leader.event_source(Arc::new(log));
        }

        Ok(Team {
            leader: leader.build(),
            members,
            shared,
        })
    }
}

impl Team {
    pub fn builder(provider: Arc<dyn ProviderAdapter>, model: impl Into<String>) -> TeamBuilder {
        TeamBuilder::new(provider, model)
    }

    pub fn leader(&self) -> &Agent {
        &self.leader
    }

    pub fn members(&self) -> &[TeamMember] {
        &self.members
    }

    /// The shared context, when agentic context is enabled and set.
    pub fn shared_context(&self) -> Option<String> {
        self.shared.as_ref().and_then(SharedContext::get)
    }

    pub async fn run(&self, input: &str) -> Result<RunResponse, SableError> {
        self.leader.run(input).await
    }

    pub fn run_stream(&self, input: impl Into<String>) -> RunStream {
        self.leader.run_stream(input)
    }

    pub async fn print_response(
        &self,
        input: &str,
        stream: bool,
    ) -> Result<RunResponse, SableError> {
        self.leader.print_response(input, stream).await
    }

    pub async fn write_response<W: std::io::Write>(
        &self,
        input: &str,
        stream: bool,
        printer: &mut ResponsePrinter<W>,
    ) -> Result<RunResponse, SableError> {
        self.leader.write_response(input, stream, printer).await
    }
}
