// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI adapters for the Sable agent runtime: a chat-completions
//! [`ProviderAdapter`](sable_core::ProviderAdapter) with streaming tool calls
//! and an [`EmbeddingAdapter`](sable_core::EmbeddingAdapter) used by the
//! knowledge base.

pub mod chat;
pub mod client;
pub mod embedding;
pub mod types;

pub use chat::OpenAiProvider;
pub use client::OpenAiClient;
pub use embedding::OpenAiEmbedder;
