// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prompt assembly for Sable agents.
//!
//! A run's request is assembled from:
//! - **System message**: fixed or generated from the agent config, with tool
//!   instructions and the sections returned by registered [`ContextProvider`]s
//! - **History**: text turns of the last runs of the session
//! - **Input**: the new user message

pub mod history;
pub mod provider;
pub mod system;

use std::sync::Arc;

use chrono::Local;
use sable_config::model::AgentConfig;
use sable_core::SableError;
use sable_core::traits::StorageAdapter;
use sable_core::types::ProviderMessage;

pub use history::{HistoryWindow, replay_messages};
pub use provider::{ContextProvider, ContextRequest};
pub use system::{PromptTemplate, SystemPrompt, tagged_list};

/// System message and messages for one provider request.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledContext {
    pub system_prompt: String,
    /// History followed by the new user message.
    pub messages: Vec<ProviderMessage>,
}

/// Assembles the system message and history for each run of one agent.
#[derive(Clone)]
pub struct ContextEngine {
    system: SystemPrompt,
    history: HistoryWindow,
    providers: Vec<Arc<dyn ContextProvider>>,
}

impl ContextEngine {
    pub fn new(system: SystemPrompt, history: HistoryWindow) -> Self {
        Self {
            system,
            history,
            providers: Vec::new(),
        }
    }

    /// Loads the system prompt and history settings from agent config.
    pub async fn from_agent(config: &AgentConfig) -> Result<Self, SableError> {
        Ok(Self::new(
            SystemPrompt::from_agent(config).await?,
            HistoryWindow::from_agent(config),
        ))
    }

    /// Registers a context provider. Providers are called in registration order.
    pub fn add_provider(&mut self, provider: Arc<dyn ContextProvider>) {
        self.providers.push(provider);
    }

    pub fn system_prompt(&self) -> &SystemPrompt {
        &self.system
    }

    pub fn history(&self) -> HistoryWindow {
        self.history
    }

    /// Builds the system message alone.
    pub async fn system_message(
        &self,
        request: &ContextRequest<'_>,
        tool_instructions: &[String],
    ) -> Result<String, SableError> {
        let mut sections = Vec::new();
        for provider in &self.providers {
            if let Some(section) = provider.provide_context(request).await? {
                sections.push(section);
            }
        }
        Ok(self.system.render(tool_instructions, &sections, Local::now()))
    }

    /// Assembles the system message, history and new input for one run.
    ///
    /// History is skipped when no storage is attached.
    pub async fn assemble(
        &self,
        storage: Option<&dyn StorageAdapter>,
        request: &ContextRequest<'_>,
        tool_instructions: &[String],
    ) -> Result<AssembledContext, SableError> {
        let system_prompt = self.system_message(request, tool_instructions).await?;

        let mut messages = match storage {
            Some(storage) => self.history.load(storage, request.session_id).await?,
            None => Vec::new(),
        };
        messages.push(ProviderMessage::text("user", request.input));

        Ok(AssembledContext {
            system_prompt,
            messages,
        })
    }
}

impl std::fmt::Debug for ContextEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextEngine")
            .field("system", &self.system)
            .field("history", &self.history)
            .field("providers", &self.providers.len())
            .finish()
    }
}
