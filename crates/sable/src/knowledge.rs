// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sable knowledge` command implementation.

use std::sync::Arc;

use colored::Colorize;
use sable_agent::{ConfigAdapters, build_knowledge};
use sable_config::SableConfig;
use sable_core::SableError;
use sable_knowledge::{ScoredDocument, UrlKnowledge};

async fn open(config: &SableConfig) -> Result<Arc<UrlKnowledge>, SableError> {
    build_knowledge(config, &ConfigAdapters::new(config))
        .await?
        .ok_or_else(|| SableError::Config("no knowledge urls configured ([knowledge] urls)".into()))
}

/// Fetches, chunks and embeds every configured URL.
pub async fn load(config: &SableConfig, recreate: bool) -> Result<(), SableError> {
    let knowledge = open(config).await?;
    let report = knowledge.load(recreate).await?;
    println!(
        "loaded {} chunks from {} urls into {} ({} already present)",
        report.inserted.to_string().bold(),
        report.urls,
        knowledge.vector_db().table_name(),
        report.skipped
    );
    Ok(())
}

/// Prints the best matches for `query`.
pub async fn search(
    config: &SableConfig,
    query: &str,
    limit: Option<usize>,
) -> Result<(), SableError> {
    let knowledge = open(config).await?;
    let hits = knowledge.search(query, limit).await?;
    if hits.is_empty() {
        println!("{}", "no matching documents".dimmed());
    }
    for hit in &hits {
        println!("{}", format_hit(hit));
    }
    Ok(())
}

const PREVIEW_CHARS: usize = 160;

fn format_hit(hit: &ScoredDocument) -> String {
    let preview: String = hit
        .document
        .content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(PREVIEW_CHARS)
        .collect();
    format!(
        "{:.3}  {}\n       {}",
        hit.score,
        hit.document.name.bold(),
        preview.dimmed()
    )
}

#[cfg(test)]
mod tests {
    use sable_knowledge::Document;

    use super::*;

    #[test]
    fn hit_preview_collapses_whitespace() {
        colored::control::set_override(false);
        let hit = ScoredDocument {
            document: Document::new("intro_1", "introduction", "Agno is\n\na   framework"),
            score: 0.8765,
        };
        assert_eq!(format_hit(&hit), "0.877  introduction\n       Agno is a framework");
    }
}
