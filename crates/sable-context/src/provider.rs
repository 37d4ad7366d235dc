// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait for context providers that add run-specific sections (memories,
//! session summaries, team context) to the system message.

use async_trait::async_trait;
use sable_core::SableError;

/// What a provider knows about the run being assembled.
#[derive(Debug, Clone, Copy)]
pub struct ContextRequest<'a> {
    pub session_id: &'a str,
    pub user_id: Option<&'a str>,
    /// The new user input, used by providers that search by relevance.
    pub input: &'a str,
}

/// A provider that supplies one section of the system message.
///
/// The context engine calls every registered provider during assembly and
/// appends their sections, in registration order, after the generated
/// instructions.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// Returns the section text, or `None` if nothing applies to this run.
    async fn provide_context(
        &self,
        request: &ContextRequest<'_>,
    ) -> Result<Option<String>, SableError>;
}
