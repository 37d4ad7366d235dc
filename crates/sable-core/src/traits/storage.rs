// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for session persistence backends.

use async_trait::async_trait;

use crate::error::SableError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{RunRecord, Session};

/// Adapter for session and run-history persistence.
///
/// Agents create a session on first use, append one [`RunRecord`] per
/// completed run, and replay recent runs as conversation history.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (opens the database, creates tables).
    async fn initialize(&self) -> Result<(), SableError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), SableError>;

    async fn create_session(&self, session: &Session) -> Result<(), SableError>;

    async fn get_session(&self, id: &str) -> Result<Option<Session>, SableError>;

    /// Lists sessions, newest first, optionally restricted to one user.
    async fn list_sessions(&self, user_id: Option<&str>) -> Result<Vec<Session>, SableError>;

    /// Replaces the session's free-form data blob.
    async fn update_session_data(
        &self,
        id: &str,
        data: &serde_json::Value,
    ) -> Result<(), SableError>;

    /// Deletes a session and all of its runs.
    async fn delete_session(&self, id: &str) -> Result<(), SableError>;

    async fn insert_run(&self, run: &RunRecord) -> Result<(), SableError>;

    /// Returns the last `n` runs of a session in chronological order.
    async fn get_recent_runs(
        &self,
        session_id: &str,
        n: usize,
    ) -> Result<Vec<RunRecord>, SableError>;
}
