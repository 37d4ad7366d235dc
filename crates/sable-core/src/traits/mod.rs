// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod embedding;
pub mod provider;
pub mod reranker;
pub mod storage;

pub use adapter::PluginAdapter;
pub use embedding::EmbeddingAdapter;
pub use provider::{ProviderAdapter, ProviderStream};
pub use reranker::RerankerAdapter;
pub use storage::StorageAdapter;
