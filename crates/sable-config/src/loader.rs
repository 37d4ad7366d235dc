// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Merge order (later overrides earlier): compiled defaults,
//! `/etc/sable/sable.toml`, `~/.config/sable/sable.toml`, `./sable.toml`,
//! then `SABLE_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SableConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/sable/sable.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "sable.toml";

/// Environment sections, longest prefix first so nested tables win over
/// their parents (`SABLE_KNOWLEDGE_VECTOR_DB_URI` -> `knowledge.vector_db.uri`).
const ENV_SECTIONS: &[(&str, &str)] = &[
    ("knowledge_vector_db_embedder_", "knowledge.vector_db.embedder."),
    ("knowledge_vector_db_reranker_", "knowledge.vector_db.reranker."),
    ("knowledge_vector_db_", "knowledge.vector_db."),
    ("tools_python_", "tools.python."),
    ("tools_duckduckgo_", "tools.duckduckgo."),
    ("tools_reasoning_", "tools.reasoning."),
    ("tools_yfinance_", "tools.yfinance."),
    ("memory_model_", "memory.model."),
    ("team_model_", "team.model."),
    ("agent_", "agent."),
    ("model_", "model."),
    ("anthropic_", "anthropic."),
    ("openai_", "openai."),
    ("cohere_", "cohere."),
    ("knowledge_", "knowledge."),
    ("storage_", "storage."),
    ("memory_", "memory."),
    ("team_", "team."),
];

/// User config file under the XDG config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("sable").join("sable.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<SableConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string on top of the defaults (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<SableConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SableConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SableConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SableConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used for hierarchy loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(SableConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Map a prefix-stripped env var name to a dotted config path.
///
/// Figment hands the key over in its original case and lowercases only
/// after mapping, so matching is done on the lowercased name.
///
/// Only the section prefix is rewritten; underscores inside key names are
/// kept, so `storage_table_name` becomes `storage.table_name`.
pub fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for (prefix, section) in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(prefix) {
            return format!("{section}{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("SABLE_").map(|key| map_env_key(key.as_str()).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_keys_map_to_sections() {
        assert_eq!(map_env_key("agent_name"), "agent.name");
        assert_eq!(map_env_key("storage_table_name"), "storage.table_name");
        assert_eq!(map_env_key("openai_api_key"), "openai.api_key");
    }

    #[test]
    fn nested_sections_take_precedence() {
        assert_eq!(
            map_env_key("knowledge_vector_db_search_type"),
            "knowledge.vector_db.search_type"
        );
        assert_eq!(
            map_env_key("knowledge_vector_db_embedder_dimensions"),
            "knowledge.vector_db.embedder.dimensions"
        );
        assert_eq!(map_env_key("knowledge_num_documents"), "knowledge.num_documents");
        assert_eq!(map_env_key("memory_model_id"), "memory.model.id");
        assert_eq!(map_env_key("tools_python_base_dir"), "tools.python.base_dir");
    }

    #[test]
    fn unknown_sections_pass_through() {
        assert_eq!(map_env_key("bogus_key"), "bogus_key");
    }

    #[test]
    fn uppercase_env_names_map_to_sections() {
        assert_eq!(map_env_key("AGENT_NAME"), "agent.name");
        assert_eq!(
            map_env_key("KNOWLEDGE_VECTOR_DB_TABLE_NAME"),
            "knowledge.vector_db.table_name"
        );
    }

    #[test]
    #[serial_test::serial]
    fn env_provider_overrides_nested_fields() {
        // SAFETY: serialized with every other test touching SABLE_* variables.
        unsafe {
            std::env::set_var("SABLE_AGENT_NAME", "from-env");
            std::env::set_var("SABLE_KNOWLEDGE_VECTOR_DB_SEARCH_TYPE", "hybrid");
        }
        let loaded: Result<SableConfig, _> = Figment::new()
            .merge(Serialized::defaults(SableConfig::default()))
            .merge(env_provider())
            .extract();
        unsafe {
            std::env::remove_var("SABLE_AGENT_NAME");
            std::env::remove_var("SABLE_KNOWLEDGE_VECTOR_DB_SEARCH_TYPE");
        }

        let config = loaded.unwrap();
        assert_eq!(config.agent.name, "from-env");
        assert_eq!(
            config.knowledge.vector_db.search_type,
            crate::model::SearchType::Hybrid
        );
    }

    #[test]
    fn dotted_override_reaches_nested_field() {
        let config: SableConfig = Figment::new()
            .merge(Serialized::defaults(SableConfig::default()))
            .merge((map_env_key("knowledge_vector_db_table_name"), "from_env"))
            .extract()
            .unwrap();
        assert_eq!(config.knowledge.vector_db.table_name, "from_env");
    }

    #[test]
    fn file_loading_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sable.toml");
        std::fs::write(&path, "[agent]\nname = \"from-file\"\n").unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.agent.name, "from-file");
        assert_eq!(config.agent.num_history_runs, 3);
    }
}
