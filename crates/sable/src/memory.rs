// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sable memory` command implementation.

use colored::Colorize;
use sable_config::SableConfig;
use sable_config::model::MemoryRetrieval;
use sable_core::SableError;
use sable_memory::{DEFAULT_USER_ID, MemoryDb, UserMemory};

/// `--user`, then `[agent] user_id`, then the default user.
fn resolve_user(config: &SableConfig, user: Option<String>) -> String {
    user.or_else(|| config.agent.user_id.clone())
        .unwrap_or_else(|| DEFAULT_USER_ID.to_string())
}

fn format_memory(memory: &UserMemory) -> String {
    let mut line = format!("- {}", memory.memory);
    if !memory.topics.is_empty() {
        line.push_str(&format!(" {}", format!("[{}]", memory.topics.join(", ")).dimmed()));
    }
    line
}

pub async fn list(config: &SableConfig, user: Option<String>) -> Result<(), SableError> {
    let user = resolve_user(config, user);
    let db = MemoryDb::open(&config.memory).await?;
    let memories = db.list(&user, MemoryRetrieval::LastN, usize::MAX).await?;
    if memories.is_empty() {
        println!("{}", format!("no memories for user {user}").dimmed());
        return Ok(());
    }
    println!("{} memories for user {}:", memories.len(), user.bold());
    for memory in &memories {
        println!("{}", format_memory(memory));
    }
    Ok(())
}

pub async fn clear(config: &SableConfig, user: Option<String>) -> Result<(), SableError> {
    let user = resolve_user(config, user);
    let db = MemoryDb::open(&config.memory).await?;
    let removed = db.clear(&user).await?;
    println!("cleared {removed} memories for user {user}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_falls_back_to_agent_then_default() {
        let mut config = SableConfig::default();
        assert_eq!(resolve_user(&config, None), "default");
        config.agent.user_id = Some("ava".into());
        assert_eq!(resolve_user(&config, None), "ava");
        assert_eq!(resolve_user(&config, Some("bob".into())), "bob");
    }

    #[test]
    fn topics_follow_the_memory() {
        colored::control::set_override(false);
        let memory = UserMemory::new("ava", "Ava likes short answers")
            .with_topics(vec!["style".into(), "preferences".into()]);
        assert_eq!(
            format_memory(&memory),
            "- Ava likes short answers [style, preferences]"
        );
    }
}
