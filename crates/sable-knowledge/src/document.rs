// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge document types.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A unit of retrievable text, usually one chunk of a fetched page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Source name, derived from the URL.
    pub name: String,
    pub content: String,
    /// Free-form metadata: source url, chunk number, chunk size.
    #[serde(default)]
    pub meta: serde_json::Value,
    /// Hex SHA-256 of `content`; identical chunks are stored once.
    pub content_hash: String,
}

impl Document {
    pub fn new(id: impl Into<String>, name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            id: id.into(),
            name: name.into(),
            content_hash: content_hash(&content),
            content,
            meta: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = meta;
        self
    }
}

/// A search hit. Higher scores are better.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredDocument {
    #[serde(flatten)]
    pub document: Document,
    pub score: f32,
}

pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
