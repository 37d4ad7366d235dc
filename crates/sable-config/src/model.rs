// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Sable agent runtime.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Top-level Sable configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SableConfig {
    /// Agent identity, instructions and behaviour flags.
    #[serde(default)]
    pub agent: AgentConfig,

    /// The language model driving the agent.
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub anthropic: AnthropicConfig,

    #[serde(default)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    pub cohere: CohereConfig,

    /// Retrieval knowledge base.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Session history storage.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Long-term user memory.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Built-in toolkits available to the agent.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Multi-agent team. A team with no members is disabled.
    #[serde(default)]
    pub team: TeamConfig,
}

/// Agent identity and behaviour configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Display name of the agent.
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// User the agent is talking to; scopes sessions and memories.
    #[serde(default)]
    pub user_id: Option<String>,

    /// Opening paragraph of the system message.
    #[serde(default)]
    pub description: Option<String>,

    /// Rendered as an `<instructions>` bullet list in the system message.
    #[serde(default)]
    pub instructions: Vec<String>,

    /// Role description shown to a team leader.
    #[serde(default)]
    pub role: Option<String>,

    /// Ask the model to format answers as markdown.
    #[serde(default)]
    pub markdown: bool,

    /// Add the current date and time to the system message.
    #[serde(default)]
    pub add_datetime_to_instructions: bool,

    /// Replay previous runs of the session before the new input.
    #[serde(default)]
    pub add_history_to_messages: bool,

    /// Number of previous runs replayed when history is enabled.
    #[serde(default = "default_num_history_runs")]
    pub num_history_runs: usize,

    /// Give the model an `update_user_memory` tool.
    #[serde(default)]
    pub enable_agentic_memory: bool,

    /// Give the model a `search_knowledge_base` tool when a knowledge base is configured.
    #[serde(default = "default_true")]
    pub search_knowledge: bool,

    /// Upper bound on model/tool round trips in a single run.
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,

    /// Print tool calls while responding.
    #[serde(default = "default_true")]
    pub show_tool_calls: bool,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Inline system message. Replaces the generated one when set.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Path to a markdown file containing the system message.
    /// Takes precedence over `system_prompt` if both are set.
    #[serde(default)]
    pub system_prompt_file: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            user_id: None,
            description: None,
            instructions: Vec::new(),
            role: None,
            markdown: false,
            add_datetime_to_instructions: false,
            add_history_to_messages: false,
            num_history_runs: default_num_history_runs(),
            enable_agentic_memory: false,
            search_knowledge: true,
            max_tool_iterations: default_max_tool_iterations(),
            show_tool_calls: true,
            log_level: default_log_level(),
            system_prompt: None,
            system_prompt_file: None,
        }
    }
}

fn default_agent_name() -> String {
    "sable".to_string()
}

fn default_num_history_runs() -> usize {
    3
}

fn default_max_tool_iterations() -> usize {
    10
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_true() -> bool {
    true
}

/// Which API serves a model.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Anthropic,
    OpenAi,
}

/// A language model selection.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Model id as understood by the provider.
    #[serde(default = "default_model_id")]
    pub id: String,

    /// Maximum tokens to generate per response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Anthropic,
            id: default_model_id(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl ModelConfig {
    /// Convenience constructor used by presets.
    pub fn new(provider: ProviderKind, id: impl Into<String>) -> Self {
        Self {
            provider,
            id: id.into(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_model_id() -> String {
    "claude-3-7-sonnet-latest".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

/// Anthropic API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// Anthropic API key. Falls back to `ANTHROPIC_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Anthropic API version header.
    #[serde(default = "default_anthropic_version")]
    pub api_version: String,

    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_version: default_anthropic_version(),
            base_url: default_anthropic_base_url(),
        }
    }
}

fn default_anthropic_version() -> String {
    "2023-06-01".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

/// OpenAI API configuration (chat completions and embeddings).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OpenAiConfig {
    /// OpenAI API key. Falls back to `OPENAI_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_base_url(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

/// Cohere API configuration (reranking).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CohereConfig {
    /// Cohere API key. Falls back to `CO_API_KEY` then `COHERE_API_KEY`.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_cohere_base_url")]
    pub base_url: String,
}

impl Default for CohereConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_cohere_base_url(),
        }
    }
}

fn default_cohere_base_url() -> String {
    "https://api.cohere.com".to_string()
}

/// Knowledge base configuration. An empty `urls` list disables the knowledge base.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KnowledgeConfig {
    /// Documents to load.
    #[serde(default)]
    pub urls: Vec<String>,

    /// Documents returned per search.
    #[serde(default = "default_num_documents")]
    pub num_documents: usize,

    /// Maximum characters per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks.
    #[serde(default)]
    pub chunk_overlap: usize,

    #[serde(default)]
    pub vector_db: VectorDbConfig,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            num_documents: default_num_documents(),
            chunk_size: default_chunk_size(),
            chunk_overlap: 0,
            vector_db: VectorDbConfig::default(),
        }
    }
}

impl KnowledgeConfig {
    pub fn is_enabled(&self) -> bool {
        !self.urls.is_empty()
    }
}

fn default_num_documents() -> usize {
    5
}

fn default_chunk_size() -> usize {
    5000
}

/// How the knowledge base ranks documents for a query.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SearchType {
    /// Nearest neighbours by embedding cosine distance.
    #[default]
    Vector,
    /// Full-text BM25.
    Keyword,
    /// Reciprocal rank fusion of vector and keyword results.
    Hybrid,
}

/// Vector table location and search settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VectorDbConfig {
    /// Directory holding the vector database.
    #[serde(default = "default_vector_uri")]
    pub uri: String,

    #[serde(default = "default_vector_table")]
    pub table_name: String,

    #[serde(default)]
    pub search_type: SearchType,

    #[serde(default)]
    pub embedder: EmbedderConfig,

    /// Second-stage reranking of search results.
    #[serde(default)]
    pub reranker: Option<RerankerConfig>,
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            uri: default_vector_uri(),
            table_name: default_vector_table(),
            search_type: SearchType::default(),
            embedder: EmbedderConfig::default(),
            reranker: None,
        }
    }
}

fn default_vector_uri() -> String {
    "tmp/knowledge".to_string()
}

fn default_vector_table() -> String {
    "documents".to_string()
}

/// OpenAI embedding model selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbedderConfig {
    #[serde(default = "default_embedder_id")]
    pub id: String,

    #[serde(default = "default_embedder_dimensions")]
    pub dimensions: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            id: default_embedder_id(),
            dimensions: default_embedder_dimensions(),
        }
    }
}

fn default_embedder_id() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedder_dimensions() -> usize {
    1536
}

/// Cohere reranker selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RerankerConfig {
    #[serde(default = "default_reranker_model")]
    pub model: String,

    /// Keep only the best `top_n` documents after reranking.
    #[serde(default)]
    pub top_n: Option<usize>,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            model: default_reranker_model(),
            top_n: None,
        }
    }
}

fn default_reranker_model() -> String {
    "rerank-multilingual-v3.0".to_string()
}

/// Session storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_file")]
    pub db_file: String,

    /// Sessions table; runs are kept in `<table_name>_runs`.
    #[serde(default = "default_sessions_table")]
    pub table_name: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_file: default_db_file(),
            table_name: default_sessions_table(),
            wal_mode: true,
        }
    }
}

fn default_db_file() -> String {
    dirs::data_dir()
        .map(|p| p.join("sable").join("sable.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "sable.db".to_string())
}

fn default_sessions_table() -> String {
    "agent_sessions".to_string()
}

/// Which stored memories are placed in the system message.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MemoryRetrieval {
    /// Most recently updated memories.
    #[default]
    LastN,
    /// Oldest memories.
    FirstN,
    /// Memories matching the current input by BM25.
    Keyword,
}

/// Long-term user memory configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_db_file")]
    pub db_file: String,

    #[serde(default = "default_memory_table")]
    pub table_name: String,

    /// Model that manages and summarizes memories. Defaults to the agent model.
    #[serde(default)]
    pub model: Option<ModelConfig>,

    /// Allow the memory manager to delete individual memories.
    #[serde(default)]
    pub delete_memories: bool,

    /// Allow the memory manager to clear all memories of a user.
    #[serde(default)]
    pub clear_memories: bool,

    /// Extract memories automatically after every run.
    #[serde(default)]
    pub enable_user_memories: bool,

    /// Maintain a running summary of each session.
    #[serde(default)]
    pub enable_session_summaries: bool,

    #[serde(default)]
    pub retrieval: MemoryRetrieval,

    /// Maximum memories placed in the system message.
    #[serde(default = "default_max_in_context")]
    pub max_in_context: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            db_file: default_db_file(),
            table_name: default_memory_table(),
            model: None,
            delete_memories: false,
            clear_memories: false,
            enable_user_memories: false,
            enable_session_summaries: false,
            retrieval: MemoryRetrieval::default(),
            max_in_context: default_max_in_context(),
        }
    }
}

fn default_memory_table() -> String {
    "user_memories".to_string()
}

fn default_max_in_context() -> usize {
    50
}

/// Built-in toolkits.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    #[serde(default)]
    pub python: PythonToolsConfig,

    #[serde(default)]
    pub duckduckgo: DuckDuckGoConfig,

    #[serde(default)]
    pub reasoning: ReasoningToolsConfig,

    #[serde(default)]
    pub yfinance: YFinanceConfig,
}

/// Python execution toolkit.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PythonToolsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Working directory for scripts and file tools.
    #[serde(default = "default_python_base_dir")]
    pub base_dir: String,

    /// Interpreter to run.
    #[serde(default = "default_python_bin")]
    pub python_bin: String,

    /// Expose `pip_install_package`.
    #[serde(default)]
    pub pip_install: bool,

    #[serde(default = "default_python_timeout")]
    pub timeout_secs: u64,
}

impl Default for PythonToolsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_dir: default_python_base_dir(),
            python_bin: default_python_bin(),
            pip_install: false,
            timeout_secs: default_python_timeout(),
        }
    }
}

fn default_python_base_dir() -> String {
    "tmp/python".to_string()
}

fn default_python_bin() -> String {
    "python3".to_string()
}

fn default_python_timeout() -> u64 {
    60
}

/// DuckDuckGo web search toolkit.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DuckDuckGoConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Expose `duckduckgo_search`.
    #[serde(default = "default_true")]
    pub search: bool,

    /// Expose `duckduckgo_news`.
    #[serde(default = "default_true")]
    pub news: bool,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_ddg_base_url")]
    pub base_url: String,
}

impl Default for DuckDuckGoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            search: true,
            news: true,
            max_results: default_max_results(),
            base_url: default_ddg_base_url(),
        }
    }
}

fn default_max_results() -> usize {
    5
}

fn default_ddg_base_url() -> String {
    "https://html.duckduckgo.com".to_string()
}

/// Step-by-step reasoning toolkit.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReasoningToolsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub think: bool,

    #[serde(default = "default_true")]
    pub analyze: bool,

    /// Append the reasoning usage guide to the system message.
    #[serde(default)]
    pub add_instructions: bool,
}

impl Default for ReasoningToolsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            think: true,
            analyze: true,
            add_instructions: false,
        }
    }
}

/// Stock market data toolkit.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct YFinanceConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_yfinance_base_url")]
    pub base_url: String,
}

impl Default for YFinanceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_yfinance_base_url(),
        }
    }
}

fn default_yfinance_base_url() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

/// How a team leader works with its members.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TeamMode {
    /// The leader delegates sub-tasks and synthesizes the final answer.
    #[default]
    Coordinate,
}

/// A team of member agents coordinated by a leader model.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TeamConfig {
    #[serde(default = "default_team_name")]
    pub name: String,

    #[serde(default)]
    pub mode: TeamMode,

    /// Leader model. Defaults to `[model]`.
    #[serde(default)]
    pub model: Option<ModelConfig>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub instructions: Vec<String>,

    /// Condition the leader checks before giving its final answer.
    #[serde(default)]
    pub success_criteria: Option<String>,

    /// Print each member's answer as it arrives.
    #[serde(default)]
    pub show_members_responses: bool,

    /// Give the leader a shared context it can write and members can read.
    #[serde(default)]
    pub enable_agentic_context: bool,

    #[serde(default)]
    pub add_datetime_to_instructions: bool,

    #[serde(default)]
    pub markdown: bool,

    /// Leader reasoning toolkit.
    #[serde(default)]
    pub reasoning: ReasoningToolsConfig,

    #[serde(default)]
    pub members: Vec<MemberConfig>,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            name: default_team_name(),
            mode: TeamMode::default(),
            model: None,
            description: None,
            instructions: Vec::new(),
            success_criteria: None,
            show_members_responses: false,
            enable_agentic_context: false,
            add_datetime_to_instructions: false,
            markdown: false,
            reasoning: ReasoningToolsConfig::default(),
            members: Vec::new(),
        }
    }
}

impl TeamConfig {
    pub fn is_enabled(&self) -> bool {
        !self.members.is_empty()
    }
}

fn default_team_name() -> String {
    "team".to_string()
}

/// One member agent of a team.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemberConfig {
    pub name: String,

    /// What the leader should send this member.
    #[serde(default)]
    pub role: Option<String>,

    /// Member model. Defaults to `[model]`.
    #[serde(default)]
    pub model: Option<ModelConfig>,

    #[serde(default)]
    pub instructions: Vec<String>,

    #[serde(default)]
    pub markdown: bool,

    #[serde(default)]
    pub add_datetime_to_instructions: bool,

    #[serde(default)]
    pub tools: ToolsConfig,
}

impl MemberConfig {
    /// The id the team leader addresses this member by.
    pub fn id(&self) -> String {
        member_id(&self.name)
    }
}

/// URL-safe id of a member: lowercase words joined by `-`.
///
/// Names that differ only in case or punctuation share an id.
pub fn member_id(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
