// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The agent run loop.
//!
//! A run assembles the context, then alternates model turns and tool calls
//! until the model answers without calling a tool or the iteration limit is
//! reached. The finished run is persisted with its messages, after which the
//! memory and session summary hooks run.

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use futures::channel::mpsc;
use sable_context::{ContextEngine, ContextRequest, HistoryWindow, PromptTemplate, SystemPrompt};
use sable_core::SableError;
use sable_core::traits::{ProviderAdapter, StorageAdapter};
use sable_core::types::{
    ContentBlock, ProviderMessage, ProviderRequest, RunRecord, Session, StreamEventType,
    TokenUsage, ToolUseData, now_timestamp,
};
use sable_memory::{DEFAULT_USER_ID, MemoryManager, SessionSummarizer};
use sable_tools::{Tool, ToolRegistry, Toolbox};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::event::{EventSource, RunEvent, RunResponse, RunStream, ToolCallRecord};

/// Runs of a session fed to the summarizer.
const SUMMARY_WINDOW_RUNS: usize = 20;

/// An agent: a model, its tools and context, and optional persistence.
///
/// Cloning is cheap; clones share the session and every backend.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    name: String,
    user_id: Option<String>,
    provider: Arc<dyn ProviderAdapter>,
    model: String,
    max_tokens: u32,
    context: ContextEngine,
    tools: ToolRegistry,
    sources: Vec<Arc<dyn EventSource>>,
    storage: Option<Arc<dyn StorageAdapter>>,
    memory: Option<Arc<MemoryManager>>,
    summarizer: Option<SessionSummarizer>,
    max_tool_iterations: usize,
    show_tool_calls: bool,
    session_id: Mutex<Option<String>>,
    cancel: CancellationToken,
}

/// Builder for [`Agent`].
pub struct AgentBuilder {
    name: String,
    user_id: Option<String>,
    provider: Arc<dyn ProviderAdapter>,
    model: String,
    max_tokens: u32,
    context: Option<ContextEngine>,
    tools: ToolRegistry,
    sources: Vec<Arc<dyn EventSource>>,
    storage: Option<Arc<dyn StorageAdapter>>,
    memory: Option<Arc<MemoryManager>>,
    summarizer: Option<SessionSummarizer>,
    max_tool_iterations: usize,
    show_tool_calls: bool,
    session_id: Option<String>,
    cancel: CancellationToken,
}

impl AgentBuilder {
    pub fn new(provider: Arc<dyn ProviderAdapter>, model: impl Into<String>) -> Self {
        Self {
            name: "sable".to_string(),
            user_id: None,
            provider,
            model: model.into(),
            max_tokens: 4096,
            context: None,
            tools: ToolRegistry::new(),
            sources: Vec::new(),
            storage: None,
            memory: None,
            summarizer: None,
            max_tool_iterations: 10,
            show_tool_calls: true,
            session_id: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// System message and history settings. Defaults to an empty generated
    /// prompt without history.
    pub fn context(mut self, context: ContextEngine) -> Self {
        self.context = Some(context);
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.register(tool);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools.extend(tools);
        self
    }

    /// Built-in toolkits. The reasoning log, if any, becomes an event source.
    pub fn toolbox(mut self, toolbox: Toolbox) -> Self {
        self.tools.extend(toolbox.registry);
        if let Some(log) = toolbox.reasoning {
            self.sources.push(Arc::new(log));
        }
        self
    }

    pub fn event_source(mut self, source: Arc<dyn EventSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Persist sessions and runs; required for history and summaries.
    pub fn storage(mut self, storage: Arc<dyn StorageAdapter>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Extract user memories after every run.
    pub fn memory_extraction(mut self, manager: Arc<MemoryManager>) -> Self {
        self.memory = Some(manager);
        self
    }

    /// Refresh the session summary after every run.
    pub fn session_summaries(mut self, summarizer: SessionSummarizer) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn max_tool_iterations(mut self, max: usize) -> Self {
        self.max_tool_iterations = max;
        self
    }

    pub fn show_tool_calls(mut self, show: bool) -> Self {
        self.show_tool_calls = show;
        self
    }

    /// Continue an existing session instead of starting a new one.
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn build(self) -> Agent {
        let context = self.context.unwrap_or_else(|| {
            ContextEngine::new(
                SystemPrompt::generated(PromptTemplate::default()),
                HistoryWindow::disabled(),
            )
        });
        Agent {
            inner: Arc::new(AgentInner {
                name: self.name,
                user_id: self.user_id,
                provider: self.provider,
                model: self.model,
                max_tokens: self.max_tokens,
                context,
                tools: self.tools,
                sources: self.sources,
                storage: self.storage,
                memory: self.memory,
                summarizer: self.summarizer,
                max_tool_iterations: self.max_tool_iterations.max(1),
                show_tool_calls: self.show_tool_calls,
                session_id: Mutex::new(self.session_id),
                cancel: self.cancel,
            }),
        }
    }
}

/// One model turn.
#[derive(Default)]
struct Turn {
    text: String,
    tool_uses: Vec<ToolUseData>,
    usage: TokenUsage,
}

/// Where run events go: nowhere, or a channel.
struct Sink(Option<mpsc::UnboundedSender<Result<RunEvent, SableError>>>);

impl Sink {
    fn emit(&self, event: RunEvent) {
        if let Some(tx) = &self.0 {
            let _ = tx.unbounded_send(Ok(event));
        }
    }
}

/// Streams report input tokens on start and output tokens on the final
/// delta; each count is the latest seen, not a sum.
fn merge_usage(total: &mut TokenUsage, chunk: &TokenUsage) {
    total.input_tokens = total.input_tokens.max(chunk.input_tokens);
    total.output_tokens = total.output_tokens.max(chunk.output_tokens);
    total.cache_read_tokens = total.cache_read_tokens.max(chunk.cache_read_tokens);
    total.cache_creation_tokens = total.cache_creation_tokens.max(chunk.cache_creation_tokens);
}

fn assistant_message(text: &str, tool_uses: &[ToolUseData]) -> Option<ProviderMessage> {
    let mut content = Vec::new();
    if !text.is_empty() {
        content.push(ContentBlock::Text {
            text: text.to_string(),
        });
    }
    content.extend(tool_uses.iter().map(|call| ContentBlock::ToolUse {
        id: call.id.clone(),
        name: call.name.clone(),
        input: call.input.clone(),
    }));
    (!content.is_empty()).then(|| ProviderMessage {
        role: "assistant".to_string(),
        content,
    })
}

impl Agent {
    pub fn builder(provider: Arc<dyn ProviderAdapter>, model: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(provider, model)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn user_id(&self) -> Option<&str> {
        self.inner.user_id.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.inner.model
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.inner.tools
    }

    pub fn storage(&self) -> Option<&Arc<dyn StorageAdapter>> {
        self.inner.storage.as_ref()
    }

    pub fn show_tool_calls(&self) -> bool {
        self.inner.show_tool_calls
    }

    /// The current session, once the first run has started.
    pub fn session_id(&self) -> Option<String> {
        self.inner
            .session_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Forget the current session; the next run starts a new one.
    pub fn new_session(&self) {
        *self
            .inner
            .session_id
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Continue `session_id` from the next run on. The session is created if
    /// storage does not know it yet.
    pub fn resume_session(&self, session_id: impl Into<String>) {
        *self
            .inner
            .session_id
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(session_id.into());
    }

    /// The system message the next run would send.
    pub async fn system_message(&self, input: &str) -> Result<String, SableError> {
        let session_id = self.session_id().unwrap_or_default();
        let request = ContextRequest {
            session_id: &session_id,
            user_id: self.user_id(),
            input,
        };
        self.inner
            .context
            .system_message(&request, &self.inner.tools.instructions())
            .await
    }

    /// Runs to completion without streaming model output.
    pub async fn run(&self, input: &str) -> Result<RunResponse, SableError> {
        self.execute(input, false, &Sink(None)).await
    }

    /// Runs with streaming model output. The stream ends with
    /// [`RunEvent::RunCompleted`] or an error.
    pub fn run_stream(&self, input: impl Into<String>) -> RunStream {
        self.spawn_run(input.into(), true)
    }

    pub(crate) fn spawn_run(&self, input: String, stream: bool) -> RunStream {
        let (tx, rx) = mpsc::unbounded();
        let agent = self.clone();
        tokio::spawn(async move {
            let sink = Sink(Some(tx.clone()));
            let result = agent.execute(&input, stream, &sink).await;
            let _ = tx.unbounded_send(result.map(RunEvent::RunCompleted));
        });
        Box::pin(rx)
    }

    async fn ensure_session(&self) -> Result<String, SableError> {
        let session_id = {
            let mut current = self
                .inner
                .session_id
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            current
                .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
                .clone()
        };

        if let Some(storage) = &self.inner.storage
            && storage.get_session(&session_id).await?.is_none()
        {
            let now = now_timestamp();
            storage
                .create_session(&Session {
                    id: session_id.clone(),
                    agent_name: self.inner.name.clone(),
                    user_id: self.inner.user_id.clone(),
                    state: "active".to_string(),
                    session_data: serde_json::json!({}),
                    created_at: now.clone(),
                    updated_at: now,
                })
                .await?;
            info!(session_id = session_id.as_str(), agent = self.inner.name.as_str(), "session created");
        }
        Ok(session_id)
    }

    async fn execute(
        &self,
        input: &str,
        stream: bool,
        sink: &Sink,
    ) -> Result<RunResponse, SableError> {
        let inner = &self.inner;
        let run_id = uuid::Uuid::new_v4().to_string();
        let session_id = self.ensure_session().await?;
        sink.emit(RunEvent::RunStarted {
            run_id: run_id.clone(),
            session_id: session_id.clone(),
        });
        for source in &inner.sources {
            source.reset();
        }

        let request = ContextRequest {
            session_id: &session_id,
            user_id: inner.user_id.as_deref(),
            input,
        };
        let assembled = inner
            .context
            .assemble(inner.storage.as_deref(), &request, &inner.tools.instructions())
            .await?;
        let history_len = assembled.messages.len().saturating_sub(1);
        let mut messages = assembled.messages;
        let system_prompt =
            (!assembled.system_prompt.is_empty()).then_some(assembled.system_prompt);
        let tool_definitions =
            (!inner.tools.is_empty()).then(|| inner.tools.tool_definitions());

        debug!(
            run_id = run_id.as_str(),
            session_id = session_id.as_str(),
            history = history_len,
            tools = inner.tools.len(),
            stream,
            "run started"
        );

        let mut usage = TokenUsage::default();
        let mut content = String::new();
        let mut tool_calls = Vec::new();
        let mut reasoning_steps = Vec::new();
        let mut answered = false;

        for iteration in 0..inner.max_tool_iterations {
            let provider_request = ProviderRequest {
                model: inner.model.clone(),
                system_prompt: system_prompt.clone(),
                messages: messages.clone(),
                max_tokens: inner.max_tokens,
                stream,
                tools: tool_definitions.clone(),
                ..Default::default()
            };
            let separate = !content.is_empty();
            let turn = if stream {
                self.stream_turn(provider_request, sink, separate).await?
            } else {
                self.complete_turn(provider_request, sink, separate).await?
            };
            usage.accumulate(&turn.usage);

            if !turn.text.is_empty() {
                if separate {
                    content.push_str("\n\n");
                }
                content.push_str(&turn.text);
            }
            if let Some(message) = assistant_message(&turn.text, &turn.tool_uses) {
                messages.push(message);
            }
            if turn.tool_uses.is_empty() {
                answered = true;
                break;
            }

            debug!(iteration, calls = turn.tool_uses.len(), "executing tool calls");
            let mut results = Vec::with_capacity(turn.tool_uses.len());
            for call in turn.tool_uses {
                if inner.cancel.is_cancelled() {
                    return Err(SableError::Cancelled);
                }
                sink.emit(RunEvent::ToolCallStarted {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.input.clone(),
                });
                let output = inner.tools.execute(&call.name, call.input.clone()).await;
                sink.emit(RunEvent::ToolCallCompleted {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    output: output.content.clone(),
                    is_error: output.is_error,
                });
                for source in &inner.sources {
                    for event in source.drain() {
                        if let RunEvent::ReasoningStep(step) = &event {
                            reasoning_steps.push(step.clone());
                        }
                        sink.emit(event);
                    }
                }

                results.push(ContentBlock::ToolResult {
                    tool_use_id: call.id.clone(),
                    content: output.content.clone(),
                    is_error: output.is_error.then_some(true),
                });
                tool_calls.push(ToolCallRecord {
                    id: call.id,
                    name: call.name,
                    input: call.input,
                    output: output.content,
                    is_error: output.is_error,
                });
            }
            messages.push(ProviderMessage {
                role: "user".to_string(),
                content: results,
            });
        }

        if !answered {
            warn!(
                run_id = run_id.as_str(),
                max = inner.max_tool_iterations,
                "tool iteration limit reached, returning the text produced so far"
            );
        }

        let run_messages = messages.split_off(history_len);
        if let Some(storage) = &inner.storage {
            storage
                .insert_run(&RunRecord {
                    id: run_id.clone(),
                    session_id: session_id.clone(),
                    user_id: inner.user_id.clone(),
                    input: input.to_string(),
                    output: content.clone(),
                    messages: run_messages.clone(),
                    usage,
                    created_at: now_timestamp(),
                })
                .await?;
        }

        self.after_run(&session_id, &run_messages).await;

        info!(
            run_id = run_id.as_str(),
            session_id = session_id.as_str(),
            tool_calls = tool_calls.len(),
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "run completed"
        );

        Ok(RunResponse {
            run_id,
            session_id,
            content,
            tool_calls,
            reasoning_steps,
            usage,
            messages: run_messages,
        })
    }

    async fn stream_turn(
        &self,
        request: ProviderRequest,
        sink: &Sink,
        separate: bool,
    ) -> Result<Turn, SableError> {
        let cancel = &self.inner.cancel;
        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SableError::Cancelled),
            result = self.inner.provider.stream(request) => result?,
        };

        let mut turn = Turn::default();
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("run cancelled while streaming");
                    return Err(SableError::Cancelled);
                }
                next = stream.next() => next,
            };
            let Some(chunk) = next else { break };
            let chunk = chunk?;
            match chunk.event_type {
                StreamEventType::ContentBlockDelta => {
                    if let Some(text) = chunk.text {
                        if separate && turn.text.is_empty() {
                            sink.emit(RunEvent::Content("\n\n".to_string()));
                        }
                        turn.text.push_str(&text);
                        sink.emit(RunEvent::Content(text));
                    }
                }
                StreamEventType::ContentBlockStop => {
                    if let Some(tool_use) = chunk.tool_use {
                        turn.tool_uses.push(tool_use);
                    }
                }
                StreamEventType::MessageStart | StreamEventType::MessageDelta => {
                    if let Some(usage) = chunk.usage {
                        merge_usage(&mut turn.usage, &usage);
                    }
                }
                StreamEventType::MessageStop => break,
                StreamEventType::Error => {
                    let message = chunk.error.unwrap_or_else(|| "stream error".to_string());
                    return Err(SableError::provider(message));
                }
                StreamEventType::ContentBlockStart => {}
            }
        }
        Ok(turn)
    }

    async fn complete_turn(
        &self,
        request: ProviderRequest,
        sink: &Sink,
        separate: bool,
    ) -> Result<Turn, SableError> {
        let response = tokio::select! {
            biased;
            _ = self.inner.cancel.cancelled() => return Err(SableError::Cancelled),
            result = self.inner.provider.complete(request) => result?,
        };
        if !response.content.is_empty() {
            if separate {
                sink.emit(RunEvent::Content("\n\n".to_string()));
            }
            sink.emit(RunEvent::Content(response.content.clone()));
        }
        Ok(Turn {
            text: response.content,
            tool_uses: response.tool_uses,
            usage: response.usage,
        })
    }

    /// Memory extraction and session summary. Failures are logged, never
    /// returned: the answer has already been produced.
    async fn after_run(&self, session_id: &str, run_messages: &[ProviderMessage]) {
        let inner = &self.inner;
        if let Some(manager) = &inner.memory {
            let user_id = inner.user_id.as_deref().unwrap_or(DEFAULT_USER_ID);
            match manager.create_user_memories(user_id, run_messages).await {
                Ok(update) => debug!(user_id, changes = update.ops.len(), "user memories updated"),
                Err(e) => warn!(error = %e, user_id, "memory extraction failed"),
            }
        }
        if let (Some(summarizer), Some(storage)) = (&inner.summarizer, &inner.storage)
            && let Err(e) = summarizer
                .update(storage.as_ref(), session_id, SUMMARY_WINDOW_RUNS)
                .await
        {
            warn!(error = %e, session_id, "session summary failed");
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.inner.name)
            .field("model", &self.inner.model)
            .field("tools", &self.inner.tools)
            .field("storage", &self.inner.storage.is_some())
            .field("memory", &self.inner.memory.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_usage_keeps_latest_counts() {
        let mut total = TokenUsage::default();
        merge_usage(
            &mut total,
            &TokenUsage {
                input_tokens: 15,
                output_tokens: 1,
                ..Default::default()
            },
        );
        merge_usage(
            &mut total,
            &TokenUsage {
                output_tokens: 9,
                ..Default::default()
            },
        );
        assert_eq!(total.input_tokens, 15);
        assert_eq!(total.output_tokens, 9);
    }

    #[test]
    fn assistant_message_orders_text_before_tool_calls() {
        let calls = vec![ToolUseData {
            id: "toolu_1".into(),
            name: "think".into(),
            input: serde_json::json!({}),
        }];
        let message = assistant_message("Let me think.", &calls).unwrap();
        assert_eq!(message.role, "assistant");
        assert!(matches!(message.content[0], ContentBlock::Text { .. }));
        assert!(matches!(message.content[1], ContentBlock::ToolUse { .. }));
        assert!(assistant_message("", &[]).is_none());
    }
}
