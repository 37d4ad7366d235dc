// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use sable_config::model::StorageConfig;
use sable_core::types::{RunRecord, Session};
use sable_core::{AdapterType, HealthStatus, PluginAdapter, SableError, StorageAdapter};

use crate::database::{Database, map_tr_err};
use crate::queries;
use crate::schema::{SessionTables, ensure_schema};

/// SQLite-backed session storage.
///
/// The database is opened and the tables are created on the first call to
/// [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    tables: SessionTables,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create storage for the given configuration. Fails on an invalid table name.
    pub fn new(config: StorageConfig) -> Result<Self, SableError> {
        let tables = SessionTables::new(&config.table_name)?;
        Ok(Self {
            config,
            tables,
            db: OnceCell::new(),
        })
    }

    pub fn tables(&self) -> &SessionTables {
        &self.tables
    }

    fn db(&self) -> Result<&Database, SableError> {
        self.db.get().ok_or_else(|| SableError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, SableError> {
        self.db()?
            .connection()
            .call(|conn| conn.execute_batch("SELECT 1;"))
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), SableError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), SableError> {
        let db = Database::open_with(&self.config.db_file, self.config.wal_mode).await?;
        ensure_schema(&db, &self.tables).await?;
        self.db.set(db).map_err(|_| SableError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(
            path = %self.config.db_file,
            table = %self.tables.sessions,
            "session storage initialized"
        );
        Ok(())
    }

    async fn close(&self) -> Result<(), SableError> {
        self.db()?.checkpoint().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn create_session(&self, session: &Session) -> Result<(), SableError> {
        queries::sessions::create_session(self.db()?, &self.tables, session).await
    }

    async fn get_session(&self, id: &str) -> Result<Option<Session>, SableError> {
        queries::sessions::get_session(self.db()?, &self.tables, id).await
    }

    async fn list_sessions(&self, user_id: Option<&str>) -> Result<Vec<Session>, SableError> {
        queries::sessions::list_sessions(self.db()?, &self.tables, user_id).await
    }

    async fn update_session_data(
        &self,
        id: &str,
        data: &serde_json::Value,
    ) -> Result<(), SableError> {
        queries::sessions::update_session_data(self.db()?, &self.tables, id, data).await
    }

    async fn delete_session(&self, id: &str) -> Result<(), SableError> {
        queries::sessions::delete_session(self.db()?, &self.tables, id).await
    }

    async fn insert_run(&self, run: &RunRecord) -> Result<(), SableError> {
        let db = self.db()?;
        queries::runs::insert_run(db, &self.tables, run).await?;
        queries::sessions::touch_session(db, &self.tables, &run.session_id).await
    }

    async fn get_recent_runs(
        &self,
        session_id: &str,
        n: usize,
    ) -> Result<Vec<RunRecord>, SableError> {
        queries::runs::get_recent_runs(self.db()?, &self.tables, session_id, n).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_core::types::{ProviderMessage, TokenUsage};
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            db_file: path.to_string(),
            table_name: "agent_sessions".to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn adapter_identity() {
        let storage = SqliteStorage::new(make_config("unused.db")).unwrap();
        assert_eq!(storage.name(), "sqlite");
        assert_eq!(storage.adapter_type(), AdapterType::Storage);
    }

    #[test]
    fn invalid_table_name_is_rejected_up_front() {
        let mut config = make_config("unused.db");
        config.table_name = "agent-sessions".into();
        assert!(SqliteStorage::new(config).is_err());
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("twice.db");
        let storage = SqliteStorage::new(make_config(path.to_str().unwrap())).unwrap();
        storage.initialize().await.unwrap();
        assert!(storage.initialize().await.is_err());
    }

    #[tokio::test]
    async fn health_check_requires_initialize() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("health.db");
        let storage = SqliteStorage::new(make_config(path.to_str().unwrap())).unwrap();
        assert!(storage.health_check().await.is_err());
        storage.initialize().await.unwrap();
        assert_eq!(storage.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn history_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agent.db");
        let path = path.to_str().unwrap();

        {
            let storage = SqliteStorage::new(make_config(path)).unwrap();
            storage.initialize().await.unwrap();
            storage
                .create_session(&Session {
                    id: "s1".into(),
                    agent_name: "agno".into(),
                    user_id: Some("ava".into()),
                    state: "active".into(),
                    session_data: serde_json::json!({}),
                    created_at: "2026-01-01T00:00:00.000Z".into(),
                    updated_at: "2026-01-01T00:00:00.000Z".into(),
                })
                .await
                .unwrap();
            storage
                .insert_run(&RunRecord {
                    id: "r1".into(),
                    session_id: "s1".into(),
                    user_id: Some("ava".into()),
                    input: "What is Agno?".into(),
                    output: "A framework.".into(),
                    messages: vec![
                        ProviderMessage::text("user", "What is Agno?"),
                        ProviderMessage::text("assistant", "A framework."),
                    ],
                    usage: TokenUsage::default(),
                    created_at: "2026-01-01T00:00:01.000Z".into(),
                })
                .await
                .unwrap();
            storage.shutdown().await.unwrap();
        }

        let storage = SqliteStorage::new(make_config(path)).unwrap();
        storage.initialize().await.unwrap();
        let runs = storage.get_recent_runs("s1", 3).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].output, "A framework.");
        let session = storage.get_session("s1").await.unwrap().unwrap();
        assert!(session.updated_at.as_str() > "2026-01-01T00:00:00.000Z");
        storage.close().await.unwrap();
    }
}
