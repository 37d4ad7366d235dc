// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime DDL for session storage.
//!
//! Table names come from configuration, so the schema is created at
//! runtime instead of through embedded migrations. Names are validated as
//! bare SQL identifiers before they are interpolated.

use sable_config::validation::is_sql_identifier;
use sable_core::SableError;

use crate::database::{Database, map_tr_err};

/// The pair of tables backing one session store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTables {
    /// Session rows.
    pub sessions: String,
    /// Run rows, one per completed agent run.
    pub runs: String,
}

impl SessionTables {
    /// Tables for a configured base name: `<name>` and `<name>_runs`.
    pub fn new(name: &str) -> Result<Self, SableError> {
        if !is_sql_identifier(name) {
            return Err(SableError::Config(format!(
                "invalid storage table name `{name}`"
            )));
        }
        Ok(Self {
            sessions: name.to_string(),
            runs: format!("{name}_runs"),
        })
    }

    fn ddl(&self) -> String {
        let Self { sessions, runs } = self;
        format!(
            "CREATE TABLE IF NOT EXISTS {sessions} (
                id TEXT PRIMARY KEY NOT NULL,
                agent_name TEXT NOT NULL,
                user_id TEXT,
                state TEXT NOT NULL DEFAULT 'active',
                session_data TEXT NOT NULL DEFAULT '{{}}',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{sessions}_user ON {sessions}(user_id);

            CREATE TABLE IF NOT EXISTS {runs} (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT UNIQUE NOT NULL,
                session_id TEXT NOT NULL REFERENCES {sessions}(id) ON DELETE CASCADE,
                user_id TEXT,
                input TEXT NOT NULL,
                output TEXT NOT NULL,
                messages TEXT NOT NULL,
                usage TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{runs}_session ON {runs}(session_id, seq);"
        )
    }
}

/// Create the session and run tables if they do not exist.
pub async fn ensure_schema(db: &Database, tables: &SessionTables) -> Result<(), SableError> {
    let ddl = tables.ddl();
    db.connection()
        .call(move |conn| conn.execute_batch(&ddl))
        .await
        .map_err(map_tr_err)
}
