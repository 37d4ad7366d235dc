// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Sable agent runtime.
//!
//! Provides the error type, the provider-neutral message model, and the
//! adapter traits implemented by the provider, storage and knowledge crates.

pub mod credentials;
pub mod error;
pub mod traits;
pub mod types;

pub use credentials::resolve_api_key;
pub use error::SableError;
pub use types::{AdapterType, HealthStatus};

pub use traits::{
    EmbeddingAdapter, PluginAdapter, ProviderAdapter, ProviderStream, RerankerAdapter,
    StorageAdapter,
};
