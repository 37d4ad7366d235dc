// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retrieval knowledge base for the Sable agent runtime.
//!
//! Documents are fetched from URLs, split into fixed-size chunks, embedded
//! and stored in SQLite: rows in a plain table, vectors in a sqlite-vec
//! `vec0` table and text in an FTS5 index. Searches run by vector distance,
//! BM25 or a reciprocal rank fusion of both, then optionally through a
//! reranker.
//!
//! ## Layout
//!
//! - **document**: `Document`, `ScoredDocument`, content hashing
//! - **reader**: URL fetch and HTML-to-text
//! - **chunking**: fixed-size chunks with overlap
//! - **store**: `VectorDb` over SQLite
//! - **knowledge**: `UrlKnowledge` load and search
//! - **tool**: the `search_knowledge_base` tool

pub mod chunking;
pub mod document;
pub mod knowledge;
pub mod reader;
pub mod store;
pub mod tool;

pub use chunking::FixedSizeChunking;
pub use document::{Document, ScoredDocument};
pub use knowledge::{LoadReport, UrlKnowledge, reciprocal_rank_fusion};
pub use reader::UrlReader;
pub use store::VectorDb;
pub use tool::SearchKnowledgeBase;
