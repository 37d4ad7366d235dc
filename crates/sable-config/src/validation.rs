// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde cannot express: SQL table names, chunking
//! bounds, URL schemes and team member uniqueness.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{SableConfig, ToolsConfig};

/// True if `name` can be interpolated into DDL as a bare SQLite identifier.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validate a deserialized configuration.
///
/// Collects every failure rather than stopping at the first.
pub fn validate_config(config: &SableConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    for (key, value) in [
        ("storage.table_name", &config.storage.table_name),
        ("memory.table_name", &config.memory.table_name),
        (
            "knowledge.vector_db.table_name",
            &config.knowledge.vector_db.table_name,
        ),
    ] {
        if !is_sql_identifier(value) {
            fail(format!(
                "{key} `{value}` must start with a letter or underscore and contain only letters, digits and underscores"
            ));
        }
    }

    if config.storage.db_file.trim().is_empty() {
        fail("storage.db_file must not be empty".to_string());
    }
    if config.memory.enabled && config.memory.db_file.trim().is_empty() {
        fail("memory.db_file must not be empty".to_string());
    }

    if config.agent.add_history_to_messages && config.agent.num_history_runs == 0 {
        fail("agent.num_history_runs must be at least 1 when add_history_to_messages is set".to_string());
    }
    if config.agent.max_tool_iterations == 0 {
        fail("agent.max_tool_iterations must be at least 1".to_string());
    }
    if config.model.max_tokens == 0 {
        fail("model.max_tokens must be greater than 0".to_string());
    }
    if config.memory.max_in_context == 0 {
        fail("memory.max_in_context must be at least 1".to_string());
    }

    let knowledge = &config.knowledge;
    if knowledge.chunk_size == 0 {
        fail("knowledge.chunk_size must be greater than 0".to_string());
    } else if knowledge.chunk_overlap >= knowledge.chunk_size {
        fail(format!(
            "knowledge.chunk_overlap ({}) must be smaller than knowledge.chunk_size ({})",
            knowledge.chunk_overlap, knowledge.chunk_size
        ));
    }
    if knowledge.num_documents == 0 {
        fail("knowledge.num_documents must be at least 1".to_string());
    }
    if knowledge.vector_db.embedder.dimensions == 0 {
        fail("knowledge.vector_db.embedder.dimensions must be greater than 0".to_string());
    }
    if let Some(reranker) = &knowledge.vector_db.reranker
        && reranker.top_n == Some(0)
    {
        fail("knowledge.vector_db.reranker.top_n must be at least 1".to_string());
    }
    for url in &knowledge.urls {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            fail(format!("knowledge.urls entry `{url}` must be an http(s) URL"));
        }
    }

    validate_tools("tools", &config.tools, &mut fail);

    let mut seen = HashSet::new();
    for (i, member) in config.team.members.iter().enumerate() {
        let id = member.id();
        if id.is_empty() {
            fail(format!(
                "team.members[{i}].name must contain at least one letter or digit"
            ));
        } else if !seen.insert(id.clone()) {
            fail(format!(
                "duplicate member id `{id}` in [[team.members]] (from name `{}`)",
                member.name
            ));
        }
        validate_tools(&format!("team.members[{i}].tools"), &member.tools, &mut fail);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_tools(prefix: &str, tools: &ToolsConfig, fail: &mut impl FnMut(String)) {
    if tools.python.enabled && tools.python.timeout_secs == 0 {
        fail(format!("{prefix}.python.timeout_secs must be greater than 0"));
    }
    if tools.duckduckgo.enabled && tools.duckduckgo.max_results == 0 {
        fail(format!("{prefix}.duckduckgo.max_results must be at least 1"));
    }
    if tools.reasoning.enabled && !tools.reasoning.think && !tools.reasoning.analyze {
        fail(format!(
            "{prefix}.reasoning is enabled but both think and analyze are off"
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MemberConfig;

    fn messages(config: &SableConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&SableConfig::default()).is_ok());
    }

    #[test]
    fn identifiers() {
        assert!(is_sql_identifier("agent_sessions"));
        assert!(is_sql_identifier("_t1"));
        assert!(!is_sql_identifier("1table"));
        assert!(!is_sql_identifier("drop table; --"));
        assert!(!is_sql_identifier(""));
    }

    #[test]
    fn bad_table_name_rejected() {
        let mut config = SableConfig::default();
        config.storage.table_name = "agent-sessions".into();
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("storage.table_name"));
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let mut config = SableConfig::default();
        config.knowledge.chunk_size = 100;
        config.knowledge.chunk_overlap = 100;
        assert!(messages(&config)[0].contains("chunk_overlap"));
    }

    #[test]
    fn non_http_urls_rejected() {
        let mut config = SableConfig::default();
        config.knowledge.urls = vec!["file:///etc/passwd".into()];
        assert!(messages(&config)[0].contains("http(s)"));
    }

    #[test]
    fn zero_history_runs_rejected_only_when_history_enabled() {
        let mut config = SableConfig::default();
        config.agent.num_history_runs = 0;
        assert!(validate_config(&config).is_ok());
        config.agent.add_history_to_messages = true;
        assert!(messages(&config)[0].contains("num_history_runs"));
    }

    fn member(name: &str) -> MemberConfig {
        MemberConfig {
            name: name.into(),
            role: None,
            model: None,
            instructions: vec![],
            markdown: false,
            add_datetime_to_instructions: false,
            tools: ToolsConfig::default(),
        }
    }

    #[test]
    fn duplicate_member_names_rejected() {
        let mut config = SableConfig::default();
        config.team.members = vec![member("web"), member("web")];
        assert!(messages(&config)[0].contains("duplicate member id `web`"));
    }

    #[test]
    fn member_names_with_the_same_id_rejected() {
        let mut config = SableConfig::default();
        config.team.members = vec![member("Web Agent"), member("web-agent")];
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 1);
        assert!(msgs[0].contains("duplicate member id `web-agent`"));
        assert!(msgs[0].contains("`web-agent`)"));
    }

    #[test]
    fn member_names_need_a_word() {
        let mut config = SableConfig::default();
        config.team.members = vec![member("  "), member("?!")];
        let msgs = messages(&config);
        assert_eq!(msgs.len(), 2);
        assert!(msgs[1].contains("team.members[1].name"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = SableConfig::default();
        config.memory.table_name = "bad name".into();
        config.model.max_tokens = 0;
        config.knowledge.num_documents = 0;
        assert_eq!(messages(&config).len(), 3);
    }
}
