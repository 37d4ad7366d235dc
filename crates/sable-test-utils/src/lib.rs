// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Sable integration tests.
//!
//! Mock adapters and a harness for fast, deterministic tests without
//! external services.
//!
//! - [`MockProvider`] scripted LLM turns (text and tool calls), with request capture
//! - [`MockEmbedder`] deterministic bag-of-words embeddings
//! - [`MockReranker`] keyword-overlap reranking
//! - [`TestHarness`] temp directories and a config pointing into them

pub mod harness;
pub mod mock_adapters;
pub mod mock_provider;

pub use harness::TestHarness;
pub use mock_adapters::{MockEmbedder, MockReranker};
pub use mock_provider::{MockProvider, MockTurn};
