// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fetches knowledge sources over HTTP.

use std::time::Duration;

use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use sable_core::SableError;
use tracing::debug;

use crate::document::Document;

/// Column width used when rendering HTML to text.
const TEXT_WIDTH: usize = 120;

#[derive(Debug, Clone)]
pub struct UrlReader {
    client: reqwest::Client,
}

impl UrlReader {
    pub fn new() -> Result<Self, SableError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sable/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SableError::Knowledge {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self { client })
    }

    /// Fetches one URL as a single document. HTML is converted to text;
    /// markdown and plain text are kept as-is.
    pub async fn read(&self, url: &str) -> Result<Document, SableError> {
        let parsed = Url::parse(url).map_err(|e| SableError::Knowledge {
            message: format!("invalid knowledge url {url}: {e}"),
            source: Some(Box::new(e)),
        })?;
        let name = document_name(&parsed);

        let response = self.client.get(parsed).send().await.map_err(|e| SableError::Knowledge {
            message: format!("failed to fetch {url}: {e}"),
            source: Some(Box::new(e)),
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SableError::knowledge(format!("fetching {url} returned {status}")));
        }
        let is_html = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("html"));
        let bytes = response.bytes().await.map_err(|e| SableError::Knowledge {
            message: format!("failed to read {url}: {e}"),
            source: Some(Box::new(e)),
        })?;

        let content = if is_html {
            html2text::from_read(&bytes[..], TEXT_WIDTH).map_err(|e| SableError::Knowledge {
                message: format!("failed to convert {url} to text: {e}"),
                source: Some(Box::new(e)),
            })?
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        };
        debug!(url, name, is_html, chars = content.len(), "fetched knowledge source");

        Ok(Document::new(name.clone(), name, content.trim().to_string())
            .with_meta(serde_json::json!({ "url": url })))
    }
}

/// `https://docs.agno.com/introduction.md` is named `introduction`.
pub fn document_name(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut s| s.rfind(|seg| !seg.is_empty()))
        .unwrap_or_default();
    let stem = segment.split('.').next().unwrap_or_default();
    if stem.is_empty() {
        url.host_str().unwrap_or("document").to_string()
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn names_from_urls() {
        let name = |u: &str| document_name(&Url::parse(u).unwrap());
        assert_eq!(name("https://docs.agno.com/introduction.md"), "introduction");
        assert_eq!(name("https://docs.agno.com/agents/memory/"), "memory");
        assert_eq!(name("https://docs.agno.com/"), "docs.agno.com");
    }

    #[tokio::test]
    async fn markdown_is_kept_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/introduction.md"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/markdown")
                    .set_body_string("# What is Agno?\n\nAgno is a framework.\n"),
            )
            .mount(&server)
            .await;

        let url = format!("{}/introduction.md", server.uri());
        let doc = UrlReader::new().unwrap().read(&url).await.unwrap();
        assert_eq!(doc.name, "introduction");
        assert_eq!(doc.content, "# What is Agno?\n\nAgno is a framework.");
        assert_eq!(doc.meta["url"], url);
    }

    #[tokio::test]
    async fn html_is_converted_to_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string("<html><body><p>Agents with <b>memory</b></p><script></script></body></html>"),
            )
            .mount(&server)
            .await;

        let doc = UrlReader::new()
            .unwrap()
            .read(&format!("{}/page.html", server.uri()))
            .await
            .unwrap();
        assert!(doc.content.contains("Agents with"));
        assert!(!doc.content.contains("<p>"));
    }

    #[tokio::test]
    async fn http_errors_are_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let err = UrlReader::new()
            .unwrap()
            .read(&format!("{}/missing.md", server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
