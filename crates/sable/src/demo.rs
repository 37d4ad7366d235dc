// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sable demo` command implementation.
//!
//! Four presets, from a single web search agent up to a reasoning team.
//! A preset only rewrites the agent-shaping sections of the loaded config;
//! API keys and endpoints still come from `sable.toml` and the environment.

use std::io::Write;

use clap::ValueEnum;
use sable_agent::{
    AdapterFactory, ResponsePrinter, build_agent_with_knowledge, build_knowledge, build_team,
};
use sable_config::SableConfig;
use sable_config::model::{
    AgentConfig, KnowledgeConfig, MemberConfig, MemoryConfig, ModelConfig, ProviderKind,
    RerankerConfig, SearchType, StorageConfig, TeamConfig, TeamMode, ToolsConfig,
};
use sable_core::SableError;
use tokio_util::sync::CancellationToken;
use tracing::info;

const AGNO_DESCRIPTION: &str = "You are \"Agno AGI, an autonomous AI Agent that can build agents using the Agno framework. Your goal is to help developers understand and use Agno by providing explanations, working code examples, and optional visual and audio explanations of key concepts.";

const AGNO_DOCS_URL: &str = "https://docs.agno.com/introduction.md";

const TARIFF_QUERY: &str = "Analyze the impact of recent US tariffs on market performance across
these key sectors:
- Steel & Aluminum: (X, NUE, AA)
- Technology Hardware: (AAPL, DELL, HPQ)

For each sector:
1. Compare stock performance before and after tariff implementation
2. Identify supply chain disruptions and cost impact percentages
3. Analyze companies' strategic responses (reshoring, price adjustments, supplier
diversification)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Demo {
    /// Web search agent.
    Web,
    /// Knowledge base, session storage and history.
    Knowledge,
    /// Long-term memory and reasoning on top of `knowledge`.
    Memory,
    /// Reasoning leader coordinating a web and a finance agent.
    Team,
}

/// A preset config and the prompts it is run with.
#[derive(Debug, Clone)]
pub struct DemoPlan {
    pub demo: Demo,
    pub config: SableConfig,
    pub prompts: Vec<String>,
}

fn agno_agent() -> AgentConfig {
    AgentConfig {
        name: "Agno AGI".to_string(),
        description: Some(AGNO_DESCRIPTION.to_string()),
        instructions: vec!["Search the web for information about Agno.".to_string()],
        add_datetime_to_instructions: true,
        markdown: true,
        ..AgentConfig::default()
    }
}

fn agno_knowledge() -> KnowledgeConfig {
    let mut knowledge = KnowledgeConfig {
        urls: vec![AGNO_DOCS_URL.to_string()],
        ..KnowledgeConfig::default()
    };
    knowledge.vector_db.uri = "tmp/lancedb".to_string();
    knowledge.vector_db.table_name = "agno_docs".to_string();
    knowledge.vector_db.search_type = SearchType::Hybrid;
    knowledge.vector_db.embedder.id = "text-embedding-3-small".to_string();
    knowledge.vector_db.reranker = Some(RerankerConfig {
        model: "rerank-multilingual-v3.0".to_string(),
        top_n: None,
    });
    knowledge
}

fn agent_storage() -> StorageConfig {
    StorageConfig {
        db_file: "tmp/agent.db".to_string(),
        table_name: "agent_sessions".to_string(),
        ..StorageConfig::default()
    }
}

fn member(name: &str, role: &str, instructions: &[&str], tools: ToolsConfig) -> MemberConfig {
    MemberConfig {
        name: name.to_string(),
        role: Some(role.to_string()),
        model: Some(ModelConfig::new(ProviderKind::OpenAi, "gpt-4o-mini")),
        instructions: instructions.iter().map(|s| s.to_string()).collect(),
        markdown: false,
        add_datetime_to_instructions: false,
        tools,
    }
}

impl DemoPlan {
    /// Applies the preset for `demo` on top of `base`.
    pub fn new(demo: Demo, base: SableConfig) -> Self {
        let mut config = base;
        let mut tools = ToolsConfig::default();
        tools.python.base_dir = config.tools.python.base_dir.clone();

        let prompts = match demo {
            Demo::Web => {
                config.agent = agno_agent();
                config.model = ModelConfig::new(ProviderKind::OpenAi, "gpt-4.1");
                tools.duckduckgo.enabled = true;
                config.knowledge = KnowledgeConfig::default();
                config.memory.enabled = false;
                vec!["What is Agno?".to_string()]
            }
            Demo::Knowledge => {
                config.agent = agno_agent();
                config.model = ModelConfig::new(ProviderKind::OpenAi, "gpt-4.1");
                config.agent.add_history_to_messages = true;
                config.agent.num_history_runs = 3;
                tools.python.enabled = true;
                tools.duckduckgo.enabled = true;
                config.knowledge = agno_knowledge();
                config.storage = agent_storage();
                config.memory.enabled = false;
                vec!["What is Agno?".to_string()]
            }
            Demo::Memory => {
                config.agent = agno_agent();
                config.model =
                    ModelConfig::new(ProviderKind::Anthropic, "claude-3-7-sonnet-latest");
                config.agent.user_id = Some("ava".to_string());
                config.agent.add_history_to_messages = true;
                config.agent.num_history_runs = 3;
                config.agent.enable_agentic_memory = true;
                tools.python.enabled = true;
                tools.duckduckgo.enabled = true;
                tools.reasoning.enabled = true;
                tools.reasoning.add_instructions = true;
                config.knowledge = agno_knowledge();
                config.storage = agent_storage();
                config.memory = MemoryConfig {
                    enabled: true,
                    db_file: "tmp/agent.db".to_string(),
                    table_name: "user_memories".to_string(),
                    model: Some(ModelConfig::new(ProviderKind::OpenAi, "gpt-4.1")),
                    delete_memories: true,
                    clear_memories: true,
                    ..MemoryConfig::default()
                };
                vec![
                    "Always start your messages with 'hi ava'".to_string(),
                    "What is Agno?".to_string(),
                ]
            }
            Demo::Team => {
                let mut web_tools = ToolsConfig::default();
                web_tools.duckduckgo.enabled = true;
                let mut finance_tools = ToolsConfig::default();
                finance_tools.yfinance.enabled = true;

                let mut team = TeamConfig {
                    name: "Reasoning Finance Team Leader".to_string(),
                    mode: TeamMode::Coordinate,
                    model: Some(ModelConfig::new(
                        ProviderKind::Anthropic,
                        "claude-3-7-sonnet-latest",
                    )),
                    instructions: vec![
                        "Use tables to display data".to_string(),
                        "Only output the final answer, no other text.".to_string(),
                    ],
                    success_criteria: Some(
                        "The team has successfully completed the task.".to_string(),
                    ),
                    show_members_responses: true,
                    enable_agentic_context: true,
                    add_datetime_to_instructions: true,
                    members: vec![
                        member(
                            "Web Search Agent",
                            "Handle web search requests",
                            &["Always include sources in your responses."],
                            web_tools,
                        ),
                        member(
                            "Finance Agent",
                            "Handle financial data requests",
                            &[
                                "You are a financial data specialist. Provide concise and accurate data.",
                                "Use tables to display stock prices, fundamentals (P/E, Market Cap)",
                            ],
                            finance_tools,
                        ),
                    ],
                    ..TeamConfig::default()
                };
                team.reasoning.enabled = true;
                team.reasoning.add_instructions = true;
                config.team = team;
                vec![TARIFF_QUERY.to_string()]
            }
        };
        config.tools = tools;

        Self {
            demo,
            config,
            prompts,
        }
    }

    /// Replaces the preset prompts with a single one.
    pub fn with_prompt(mut self, prompt: Option<String>) -> Self {
        if let Some(prompt) = prompt {
            self.prompts = vec![prompt];
        }
        self
    }

    /// Runs every prompt in order, printing each response.
    pub async fn run<W: Write>(
        &self,
        adapters: &dyn AdapterFactory,
        cancel: CancellationToken,
        stream: bool,
        printer: &mut ResponsePrinter<W>,
    ) -> Result<(), SableError> {
        info!(demo = ?self.demo, prompts = self.prompts.len(), "running demo");
        if self.demo == Demo::Team {
            let team = build_team(&self.config, adapters, cancel).await?;
            for prompt in &self.prompts {
                team.write_response(prompt, stream, printer).await?;
            }
            return Ok(());
        }

        // Load on first use only; reruns reuse the stored vectors.
        let knowledge = build_knowledge(&self.config, adapters).await?;
        if let Some(knowledge) = &knowledge
            && !knowledge.vector_db().exists().await?
        {
            let report = knowledge.load(false).await?;
            info!(chunks = report.inserted, "knowledge base loaded");
        }

        let agent = build_agent_with_knowledge(&self.config, adapters, knowledge, cancel).await?;
        for prompt in &self.prompts {
            agent.write_response(prompt, stream, printer).await?;
        }
        Ok(())
    }
}
