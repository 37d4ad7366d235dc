// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assembles agents and teams from [`SableConfig`].
//!
//! Remote adapters come from an [`AdapterFactory`]: [`ConfigAdapters`]
//! builds the real HTTP clients, tests substitute mocks.

use std::sync::Arc;

use sable_anthropic::AnthropicProvider;
use sable_cohere::CohereReranker;
use sable_config::SableConfig;
use sable_config::model::{
    AnthropicConfig, CohereConfig, EmbedderConfig, ModelConfig, OpenAiConfig, ProviderKind,
    RerankerConfig, StorageConfig, ToolsConfig,
};
use sable_context::{ContextEngine, HistoryWindow, PromptTemplate, SystemPrompt};
use sable_core::SableError;
use sable_core::traits::{EmbeddingAdapter, ProviderAdapter, RerankerAdapter, StorageAdapter};
use sable_knowledge::{SearchKnowledgeBase, UrlKnowledge};
use sable_memory::{
    DEFAULT_USER_ID, MemoryContextProvider, MemoryDb, MemoryManager, SessionSummarizer,
    SessionSummaryProvider, UpdateUserMemoryTool,
};
use sable_openai::{OpenAiEmbedder, OpenAiProvider};
use sable_storage::SqliteStorage;
use sable_tools::build_tools;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::Agent;
use crate::team::{Team, TeamMember};

/// Creates the remote adapters an agent talks to.
pub trait AdapterFactory: Send + Sync {
    fn provider(&self, model: &ModelConfig) -> Result<Arc<dyn ProviderAdapter>, SableError>;

    fn embedder(&self, config: &EmbedderConfig) -> Result<Arc<dyn EmbeddingAdapter>, SableError>;

    fn reranker(&self, config: &RerankerConfig) -> Result<Arc<dyn RerankerAdapter>, SableError>;
}

/// Adapters backed by the Anthropic, OpenAI and Cohere APIs.
#[derive(Debug, Clone)]
pub struct ConfigAdapters {
    anthropic: AnthropicConfig,
    openai: OpenAiConfig,
    cohere: CohereConfig,
}

impl ConfigAdapters {
    pub fn new(config: &SableConfig) -> Self {
        Self {
            anthropic: config.anthropic.clone(),
            openai: config.openai.clone(),
            cohere: config.cohere.clone(),
        }
    }
}

impl AdapterFactory for ConfigAdapters {
    fn provider(&self, model: &ModelConfig) -> Result<Arc<dyn ProviderAdapter>, SableError> {
        Ok(match model.provider {
            ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(&self.anthropic, model)?),
            ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(&self.openai, model)?),
        })
    }

    fn embedder(&self, config: &EmbedderConfig) -> Result<Arc<dyn EmbeddingAdapter>, SableError> {
        Ok(Arc::new(OpenAiEmbedder::new(&self.openai, config)?))
    }

    fn reranker(&self, config: &RerankerConfig) -> Result<Arc<dyn RerankerAdapter>, SableError> {
        Ok(Arc::new(CohereReranker::new(&self.cohere, config)?))
    }
}

/// Opens and initializes session storage.
pub async fn open_storage(config: &StorageConfig) -> Result<Arc<SqliteStorage>, SableError> {
    let storage = SqliteStorage::new(config.clone())?;
    storage.initialize().await?;
    Ok(Arc::new(storage))
}

/// Opens the knowledge base, or `None` when no URLs are configured.
pub async fn build_knowledge(
    config: &SableConfig,
    adapters: &dyn AdapterFactory,
) -> Result<Option<Arc<UrlKnowledge>>, SableError> {
    if !config.knowledge.is_enabled() {
        return Ok(None);
    }
    let vector_db = &config.knowledge.vector_db;
    let embedder = adapters.embedder(&vector_db.embedder)?;
    let reranker = vector_db
        .reranker
        .as_ref()
        .map(|r| adapters.reranker(r))
        .transpose()?;
    let knowledge = UrlKnowledge::new(&config.knowledge, embedder, reranker).await?;
    Ok(Some(Arc::new(knowledge)))
}

/// Session storage is needed for history and session summaries.
fn needs_storage(config: &SableConfig) -> bool {
    config.agent.add_history_to_messages
        || (config.memory.enabled && config.memory.enable_session_summaries)
}

/// Builds the agent described by `config`.
pub async fn build_agent(
    config: &SableConfig,
    adapters: &dyn AdapterFactory,
    cancel: CancellationToken,
) -> Result<Agent, SableError> {
    let knowledge = build_knowledge(config, adapters).await?;
    build_agent_with_knowledge(config, adapters, knowledge, cancel).await
}

/// Builds the agent described by `config` around an already opened
/// knowledge base. `config.knowledge` is not consulted.
pub async fn build_agent_with_knowledge(
    config: &SableConfig,
    adapters: &dyn AdapterFactory,
    knowledge: Option<Arc<UrlKnowledge>>,
    cancel: CancellationToken,
) -> Result<Agent, SableError> {
    let agent_config = &config.agent;
    let provider = adapters.provider(&config.model)?;
    let mut context = ContextEngine::from_agent(agent_config).await?;

    let mut builder = Agent::builder(provider, config.model.id.clone())
        .name(agent_config.name.clone())
        .user_id(agent_config.user_id.clone())
        .max_tokens(config.model.max_tokens)
        .max_tool_iterations(agent_config.max_tool_iterations)
        .show_tool_calls(agent_config.show_tool_calls)
        .toolbox(build_tools(&config.tools)?)
        .cancel_token(cancel);

    if let Some(knowledge) = knowledge {
        if agent_config.search_knowledge {
            builder = builder.tool(Arc::new(SearchKnowledgeBase::new(knowledge)));
        } else {
            debug!("knowledge base configured but search_knowledge is off");
        }
    }

    let storage: Option<Arc<dyn StorageAdapter>> = if needs_storage(config) {
        let storage: Arc<dyn StorageAdapter> = open_storage(&config.storage).await?;
        builder = builder.storage(storage.clone());
        Some(storage)
    } else {
        None
    };

    let memory = &config.memory;
    if memory.enabled {
        let memory_model = memory.model.clone().unwrap_or_else(|| config.model.clone());
        let memory_provider = adapters.provider(&memory_model)?;
        let db = MemoryDb::open(memory).await?;

        context.add_provider(Arc::new(
            MemoryContextProvider::new(db.clone(), memory.retrieval, memory.max_in_context)
                .announce_empty(agent_config.enable_agentic_memory),
        ));

        let manager = Arc::new(
            MemoryManager::new(db, memory_provider.clone(), memory_model.id.clone())
                .with_permissions(memory.delete_memories, memory.clear_memories)
                .with_max_tokens(memory_model.max_tokens),
        );
        let user_id = agent_config
            .user_id
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_ID.to_string());
        if agent_config.enable_agentic_memory {
            builder = builder.tool(Arc::new(UpdateUserMemoryTool::new(manager, user_id)));
        } else if memory.enable_user_memories {
            builder = builder.memory_extraction(manager);
        }

        if memory.enable_session_summaries
            && let Some(storage) = &storage
        {
            context.add_provider(Arc::new(SessionSummaryProvider::new(storage.clone())));
            builder = builder.session_summaries(SessionSummarizer::new(
                memory_provider,
                memory_model.id.clone(),
            ));
        }
    } else if agent_config.enable_agentic_memory || memory.enable_user_memories {
        warn!("memory features requested but [memory] enabled = false");
    }

    let agent = builder.context(context).build();
    info!(
        agent = agent.name(),
        model = agent.model(),
        tools = agent.tools().len(),
        storage = agent.storage().is_some(),
        "agent ready"
    );
    Ok(agent)
}

/// Builds the team described by `config.team`.
pub async fn build_team(
    config: &SableConfig,
    adapters: &dyn AdapterFactory,
    cancel: CancellationToken,
) -> Result<Team, SableError> {
    let team = &config.team;
    let leader_model = team.model.clone().unwrap_or_else(|| config.model.clone());

    let leader_tools = build_tools(&ToolsConfig {
        reasoning: team.reasoning.clone(),
        ..Default::default()
    })?;

    let mut builder = Team::builder(adapters.provider(&leader_model)?, leader_model.id.clone())
        .name(team.name.clone())
        .max_tokens(leader_model.max_tokens)
        .template(PromptTemplate {
            description: team.description.clone(),
            role: None,
            instructions: team.instructions.clone(),
            markdown: team.markdown,
            add_datetime: team.add_datetime_to_instructions,
        })
        .success_criteria(team.success_criteria.clone())
        .show_members_responses(team.show_members_responses)
        .enable_agentic_context(team.enable_agentic_context)
        .toolbox(leader_tools)
        .max_tool_iterations(config.agent.max_tool_iterations)
        .cancel_token(cancel.clone());

    for member in &team.members {
        let model = member.model.clone().unwrap_or_else(|| config.model.clone());
        let context = ContextEngine::new(
            SystemPrompt::generated(PromptTemplate {
                description: None,
                role: member.role.clone(),
                instructions: member.instructions.clone(),
                markdown: member.markdown,
                add_datetime: member.add_datetime_to_instructions,
            }),
            HistoryWindow::disabled(),
        );
        let agent = Agent::builder(adapters.provider(&model)?, model.id.clone())
            .name(member.name.clone())
            .max_tokens(model.max_tokens)
            .context(context)
            .toolbox(build_tools(&member.tools)?)
            .max_tool_iterations(config.agent.max_tool_iterations)
            .cancel_token(cancel.clone())
            .build();
        builder = builder.member(TeamMember::new(agent, member.role.clone()));
    }

    let team = builder.build()?;
    info!(
        team = team.leader().name(),
        members = team.members().len(),
        "team ready"
    );
    Ok(team)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::traits::PluginAdapter;
    use sable_test_utils::TestHarness;
    use tracing_test::traced_test;

    struct Mocks<'a>(&'a TestHarness);

    impl AdapterFactory for Mocks<'_> {
        fn provider(&self, _: &ModelConfig) -> Result<Arc<dyn ProviderAdapter>, SableError> {
            Ok(self.0.provider.clone())
        }

        fn embedder(&self, _: &EmbedderConfig) -> Result<Arc<dyn EmbeddingAdapter>, SableError> {
            Ok(self.0.embedder.clone())
        }

        fn reranker(&self, _: &RerankerConfig) -> Result<Arc<dyn RerankerAdapter>, SableError> {
            Ok(self.0.reranker.clone())
        }
    }

    #[test]
    fn storage_follows_history_and_summaries() {
        let mut config = SableConfig::default();
        assert!(!needs_storage(&config));
        config.agent.add_history_to_messages = true;
        assert!(needs_storage(&config));

        let mut config = SableConfig::default();
        config.memory.enable_session_summaries = true;
        assert!(!needs_storage(&config), "summaries need memory enabled");
        config.memory.enabled = true;
        assert!(needs_storage(&config));
    }

    #[test]
    fn config_adapters_pick_provider_by_kind() {
        let mut config = SableConfig::default();
        config.anthropic.api_key = Some("sk-ant-test".into());
        config.openai.api_key = Some("sk-test".into());
        let adapters = ConfigAdapters::new(&config);

        let claude = adapters
            .provider(&ModelConfig::new(ProviderKind::Anthropic, "claude-3-7-sonnet-latest"))
            .unwrap();
        assert_eq!(claude.name(), "anthropic");
        let gpt = adapters
            .provider(&ModelConfig::new(ProviderKind::OpenAi, "gpt-4.1"))
            .unwrap();
        assert_eq!(gpt.name(), "openai");
    }

    #[tokio::test]
    #[traced_test]
    async fn memory_flags_without_memory_are_reported() {
        let harness = TestHarness::builder()
            .configure(|c| c.agent.enable_agentic_memory = true)
            .build()
            .unwrap();
        let agent = build_agent(&harness.config, &Mocks(&harness), CancellationToken::new())
            .await
            .unwrap();
        assert!(agent.tools().get("update_user_memory").is_none());
        assert!(logs_contain("memory features requested"));
    }

    #[tokio::test]
    async fn teams_use_the_leader_model() {
        let harness = TestHarness::builder()
            .configure(|c| {
                c.team.model = Some(ModelConfig::new(ProviderKind::Anthropic, "claude-3-7-sonnet-latest"));
                c.team.members = vec![sable_config::model::MemberConfig {
                    name: "Finance Agent".into(),
                    role: None,
                    model: None,
                    instructions: Vec::new(),
                    markdown: false,
                    add_datetime_to_instructions: false,
                    tools: ToolsConfig::default(),
                }];
            })
            .build()
            .unwrap();
        let team = build_team(&harness.config, &Mocks(&harness), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(team.leader().model(), "claude-3-7-sonnet-latest");
        assert_eq!(team.members()[0].agent.model(), harness.config.model.id);
        assert!(team.leader().tools().get("set_shared_context").is_none());
    }
}
