// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Sable agent runtime.

use thiserror::Error;

/// The primary error type used across all Sable adapter traits and core operations.
#[derive(Debug, Error)]
pub enum SableError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// LLM, embedding or reranking provider errors.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Tool invocation errors that could not be reported back to the model.
    #[error("tool error: {message}")]
    Tool {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Knowledge base errors (document fetch, chunking, vector table).
    #[error("knowledge error: {message}")]
    Knowledge {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Long-term memory errors.
    #[error("memory error: {0}")]
    Memory(String),

    /// A provider request did not complete in time.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// The run was cancelled by a shutdown signal.
    #[error("run cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SableError {
    /// Shorthand for a [`SableError::Provider`] without a source.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            source: None,
        }
    }

    /// Shorthand for a [`SableError::Knowledge`] without a source.
    pub fn knowledge(message: impl Into<String>) -> Self {
        Self::Knowledge {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps any error as a [`SableError::Storage`].
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage {
            source: Box::new(source),
        }
    }
}
