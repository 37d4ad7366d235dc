// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-size chunking with overlap.
//!
//! Sizes are counted in characters. A chunk boundary is moved back to the
//! nearest whitespace when one exists inside the window, so words are not
//! split unless a single word is longer than the chunk.

use crate::document::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedSizeChunking {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl FixedSizeChunking {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Splits text into trimmed, non-empty chunks.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let mut end = (start + self.chunk_size).min(chars.len());
            if end < chars.len() {
                // Break after the last whitespace inside the window.
                if let Some(ws) = chars[start..end].iter().rposition(|c| c.is_whitespace())
                    && ws > 0
                {
                    end = start + ws + 1;
                }
            }

            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }

            if end >= chars.len() {
                break;
            }
            start = end.saturating_sub(self.overlap).max(start + 1);
        }
        chunks
    }

    /// Splits a document into chunk documents named `<name>_<n>`, numbered from 1.
    pub fn chunk(&self, document: &Document) -> Vec<Document> {
        self.split(&document.content)
            .into_iter()
            .enumerate()
            .map(|(i, piece)| {
                let size = piece.chars().count();
                Document::new(format!("{}_{}", document.name, i + 1), &document.name, piece)
                    .with_meta(with_chunk_meta(&document.meta, i + 1, size))
            })
            .collect()
    }
}

fn with_chunk_meta(meta: &serde_json::Value, chunk: usize, size: usize) -> serde_json::Value {
    let mut meta = match meta {
        serde_json::Value::Object(map) => map.clone(),
        _ => serde_json::Map::new(),
    };
    meta.insert("chunk".into(), chunk.into());
    meta.insert("chunk_size".into(), size.into());
    serde_json::Value::Object(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = FixedSizeChunking::new(100, 0).split("Agno is a framework.");
        assert_eq!(chunks, ["Agno is a framework."]);
    }

    #[test]
    fn breaks_on_whitespace() {
        let chunks = FixedSizeChunking::new(12, 0).split("alpha beta gamma delta");
        assert_eq!(chunks, ["alpha beta", "gamma delta"]);
    }

    #[test]
    fn long_words_are_split_hard() {
        let chunks = FixedSizeChunking::new(4, 0).split("abcdefghij");
        assert_eq!(chunks, ["abcd", "efgh", "ij"]);
    }

    #[test]
    fn overlap_repeats_tail() {
        let chunks = FixedSizeChunking::new(6, 2).split("abcdefghij");
        assert_eq!(chunks, ["abcdef", "efghij"]);
    }

    #[test]
    fn multibyte_text_is_safe() {
        let chunks = FixedSizeChunking::new(3, 1).split("héllo wörld");
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
    }

    #[test]
    fn chunk_documents_are_numbered_and_carry_meta() {
        let doc = Document::new("intro", "intro", "one two three four five six")
            .with_meta(serde_json::json!({"url": "https://docs.agno.com/introduction.md"}));
        let chunks = FixedSizeChunking::new(10, 0).chunk(&doc);
        assert_eq!(chunks[0].id, "intro_1");
        assert_eq!(chunks[1].id, "intro_2");
        assert_eq!(chunks[1].meta["chunk"], 2);
        assert_eq!(chunks[1].meta["url"], "https://docs.agno.com/introduction.md");
        assert_ne!(chunks[0].content_hash, chunks[1].content_hash);
    }

    proptest! {
        #[test]
        fn chunks_never_exceed_size(text in "[a-z ]{0,300}", size in 1usize..40, overlap in 0usize..10) {
            let chunking = FixedSizeChunking::new(size, overlap);
            for chunk in chunking.split(&text) {
                prop_assert!(chunk.chars().count() <= size);
                prop_assert!(!chunk.is_empty());
            }
        }

        #[test]
        fn no_overlap_preserves_content(text in "[a-z ]{0,300}", size in 1usize..40) {
            let joined: String = FixedSizeChunking::new(size, 0).split(&text).concat();
            let strip = |s: &str| s.chars().filter(|c| !c.is_whitespace()).collect::<String>();
            prop_assert_eq!(strip(&joined), strip(&text));
        }
    }
}
