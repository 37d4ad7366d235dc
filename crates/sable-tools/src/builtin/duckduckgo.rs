// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! DuckDuckGo search toolkit over the HTML endpoint.
//!
//! Results are scraped from `/html/` and returned as a JSON array of
//! `{title, href, body}` objects.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Url;
use sable_config::model::DuckDuckGoConfig;
use sable_core::SableError;
use serde::Serialize;
use tracing::debug;

use crate::tool::{Tool, ToolOutput, ToolRegistry, required_str};

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a[^>]*class="result__a"[^>]*href="([^"]*)"[^>]*>(.*?)</a>"#)
        .unwrap_or_else(|e| panic!("invalid title regex: {e}"))
});

static SNIPPET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)class="result__snippet"[^>]*>(.*?)</(?:a|td|div)>"#)
        .unwrap_or_else(|e| panic!("invalid snippet regex: {e}"))
});

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub href: String,
    pub body: String,
}

/// HTTP client shared by both tools.
#[derive(Debug)]
pub struct DuckDuckGoClient {
    client: reqwest::Client,
    base_url: String,
    max_results: usize,
}

impl DuckDuckGoClient {
    pub fn new(config: &DuckDuckGoConfig) -> Result<Self, SableError> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) sable-agent")
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| SableError::Tool {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_results: config.max_results,
        })
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        news: bool,
    ) -> Result<Vec<SearchResult>, SableError> {
        let mut params = vec![("q", query)];
        if news {
            params.extend([("iar", "news"), ("ia", "news")]);
        }
        let url = Url::parse_with_params(&format!("{}/html/", self.base_url), &params)
            .map_err(|e| SableError::Tool {
                message: format!("invalid search URL: {e}"),
                source: Some(Box::new(e)),
            })?;
        debug!(%url, news, "duckduckgo search");

        let response = self.client.get(url).send().await.map_err(|e| SableError::Tool {
            message: format!("search request failed: {e}"),
            source: Some(Box::new(e)),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SableError::Tool {
                message: format!("DuckDuckGo returned {status}"),
                source: None,
            });
        }
        let html = response.text().await.map_err(|e| SableError::Tool {
            message: format!("failed to read search results: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(parse_results(&html, max_results))
    }

    async fn run(&self, input: &serde_json::Value, news: bool) -> Result<ToolOutput, SableError> {
        let query = required_str(input, "query")?;
        let max_results = input["max_results"]
            .as_u64()
            .map(|n| n as usize)
            .filter(|n| *n > 0)
            .unwrap_or(self.max_results);
        let results = self.search(query, max_results, news).await?;
        Ok(ToolOutput::ok(
            serde_json::to_string_pretty(&results).unwrap_or_else(|_| "[]".to_string()),
        ))
    }
}

/// Extracts up to `limit` results from a DuckDuckGo HTML page.
pub fn parse_results(html: &str, limit: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();
    // Each organic result lives in its own result__body block.
    for block in html.split("result__body").skip(1) {
        if results.len() >= limit {
            break;
        }
        let Some(title) = TITLE_RE.captures(block) else {
            continue;
        };
        let href = resolve_redirect(&decode_entities(&title[1]));
        if href.is_empty() || href.contains("duckduckgo.com/y.js") {
            continue; // ads
        }
        let body = SNIPPET_RE
            .captures(block)
            .map(|c| fragment_text(&c[1]))
            .unwrap_or_default();
        results.push(SearchResult {
            title: fragment_text(&title[2]),
            href,
            body,
        });
    }
    results
}

/// Unwraps `//duckduckgo.com/l/?uddg=<target>` redirect links.
fn resolve_redirect(href: &str) -> String {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    match Url::parse(&absolute) {
        Ok(url) if url.path() == "/l/" => url
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned())
            .unwrap_or(absolute),
        _ => absolute,
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
}

/// Plain text of an HTML fragment with whitespace collapsed.
fn fragment_text(fragment: &str) -> String {
    let text = html2text::config::with_decorator(html2text::render::TrivialDecorator::new())
        .string_from_read(fragment.as_bytes(), 10_000)
        .unwrap_or_else(|_| fragment.to_string());
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn search_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "query": {"type": "string", "description": "The query to search for"},
            "max_results": {"type": "integer", "description": "Maximum number of results"}
        },
        "required": ["query"]
    })
}

pub struct DuckDuckGoSearch(pub Arc<DuckDuckGoClient>);

#[async_trait]
impl Tool for DuckDuckGoSearch {
    fn name(&self) -> &str {
        "duckduckgo_search"
    }

    fn description(&self) -> &str {
        "Search the web with DuckDuckGo. Returns a JSON list of {title, href, body}"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        search_schema()
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        self.0.run(&input, false).await
    }
}

pub struct DuckDuckGoNews(pub Arc<DuckDuckGoClient>);

#[async_trait]
impl Tool for DuckDuckGoNews {
    fn name(&self) -> &str {
        "duckduckgo_news"
    }

    fn description(&self) -> &str {
        "Get the latest news from DuckDuckGo. Returns a JSON list of {title, href, body}"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        search_schema()
    }

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, SableError> {
        self.0.run(&input, true).await
    }
}

pub fn register(registry: &mut ToolRegistry, config: &DuckDuckGoConfig) -> Result<(), SableError> {
    let client = Arc::new(DuckDuckGoClient::new(config)?);
    if config.search {
        registry.register(Arc::new(DuckDuckGoSearch(client.clone())));
    }
    if config.news {
        registry.register(Arc::new(DuckDuckGoNews(client)));
    }
    Ok(())
}
