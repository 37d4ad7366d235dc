// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed memory table with an FTS5 index for keyword retrieval.

use rusqlite::{OptionalExtension, Row, params};
use sable_config::model::{MemoryConfig, MemoryRetrieval};
use sable_config::validation::is_sql_identifier;
use sable_core::SableError;
use sable_storage::{Database, map_tr_err};
use tracing::debug;

use crate::types::UserMemory;

const COLUMNS: &str = "id, user_id, memory, topics, input, created_at, updated_at";

fn row_to_memory(row: &Row<'_>) -> Result<UserMemory, rusqlite::Error> {
    let topics: String = row.get(3)?;
    Ok(UserMemory {
        id: row.get(0)?,
        user_id: row.get(1)?,
        memory: row.get(2)?,
        topics: serde_json::from_str(&topics).unwrap_or_default(),
        input: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Quotes each word and ORs them so user text cannot break FTS5 syntax.
fn fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
        .map(|t| format!("\"{}\"", t.to_lowercase()))
        .collect();
    (!terms.is_empty()).then(|| terms.join(" OR "))
}

/// Persistent store for user memories.
#[derive(Clone)]
pub struct MemoryDb {
    db: Database,
    table: String,
    fts: String,
}

impl MemoryDb {
    /// Wraps an open database. Fails on an invalid table name.
    pub fn new(db: Database, table_name: &str) -> Result<Self, SableError> {
        if !is_sql_identifier(table_name) {
            return Err(SableError::Config(format!(
                "invalid memory table name `{table_name}`"
            )));
        }
        Ok(Self {
            db,
            table: table_name.to_string(),
            fts: format!("{table_name}_fts"),
        })
    }

    /// Opens the configured database file and creates the table.
    pub async fn open(config: &MemoryConfig) -> Result<Self, SableError> {
        let store = Self::new(Database::open(&config.db_file).await?, &config.table_name)?;
        store.create().await?;
        debug!(path = %config.db_file, table = %store.table, "memory store ready");
        Ok(store)
    }

    pub async fn open_in_memory(table_name: &str) -> Result<Self, SableError> {
        let store = Self::new(Database::open_in_memory().await?, table_name)?;
        store.create().await?;
        Ok(store)
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    async fn create(&self) -> Result<(), SableError> {
        let Self { table, fts, .. } = self;
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT UNIQUE NOT NULL,
                user_id TEXT NOT NULL,
                memory TEXT NOT NULL,
                topics TEXT NOT NULL DEFAULT '[]',
                input TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_user ON {table}(user_id, updated_at);

            CREATE VIRTUAL TABLE IF NOT EXISTS {fts} USING fts5(
                memory,
                content='{table}',
                content_rowid='seq'
            );

            CREATE TRIGGER IF NOT EXISTS {table}_ai AFTER INSERT ON {table} BEGIN
                INSERT INTO {fts}(rowid, memory) VALUES (new.seq, new.memory);
            END;

            CREATE TRIGGER IF NOT EXISTS {table}_ad AFTER DELETE ON {table} BEGIN
                INSERT INTO {fts}({fts}, rowid, memory) VALUES('delete', old.seq, old.memory);
            END;

            CREATE TRIGGER IF NOT EXISTS {table}_au AFTER UPDATE OF memory ON {table} BEGIN
                INSERT INTO {fts}({fts}, rowid, memory) VALUES('delete', old.seq, old.memory);
                INSERT INTO {fts}(rowid, memory) VALUES (new.seq, new.memory);
            END;"
        );
        self.db
            .connection()
            .call(move |conn| conn.execute_batch(&ddl))
            .await
            .map_err(map_tr_err)
    }

    /// Inserts a memory, or replaces the text, topics and input of the
    /// memory with the same id.
    pub async fn upsert(&self, memory: &UserMemory) -> Result<(), SableError> {
        let m = memory.clone();
        let topics = serde_json::to_string(&m.topics).map_err(SableError::storage)?;
        let sql = format!(
            "INSERT INTO {} ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                memory = excluded.memory,
                topics = excluded.topics,
                input = COALESCE(excluded.input, input),
                updated_at = excluded.updated_at",
            self.table
        );
        self.db
            .connection()
            .call(move |conn| {
                conn.execute(
                    &sql,
                    params![
                        m.id,
                        m.user_id,
                        m.memory,
                        topics,
                        m.input,
                        m.created_at,
                        m.updated_at
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn get(&self, id: &str) -> Result<Option<UserMemory>, SableError> {
        let sql = format!("SELECT {COLUMNS} FROM {} WHERE id = ?1", self.table);
        let id = id.to_string();
        self.db
            .connection()
            .call(move |conn| conn.query_row(&sql, params![id], row_to_memory).optional())
            .await
            .map_err(map_tr_err)
    }

    /// Up to `limit` memories of a user.
    ///
    /// `LastN` returns the most recently updated first, `FirstN` the oldest
    /// first. `Keyword` needs a query, so it is ordered like `LastN` here;
    /// use [`MemoryDb::search`] for relevance order.
    pub async fn list(
        &self,
        user_id: &str,
        retrieval: MemoryRetrieval,
        limit: usize,
    ) -> Result<Vec<UserMemory>, SableError> {
        let order = match retrieval {
            MemoryRetrieval::FirstN => "seq ASC",
            MemoryRetrieval::LastN | MemoryRetrieval::Keyword => "updated_at DESC, seq DESC",
        };
        let sql = format!(
            "SELECT {COLUMNS} FROM {} WHERE user_id = ?1 ORDER BY {order} LIMIT ?2",
            self.table
        );
        let user_id = user_id.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                stmt.query_map(params![user_id, limit], row_to_memory)?
                    .collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Memories of a user matching `query`, best BM25 match first.
    pub async fn search(
        &self,
        user_id: &str,
        query: &str,
        limit: usize,
    ) -> Result<Vec<UserMemory>, SableError> {
        let Some(fts_query) = fts_query(query) else {
            return Ok(Vec::new());
        };
        let columns = COLUMNS
            .split(", ")
            .map(|c| format!("m.{c}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {columns} FROM {fts} f JOIN {table} m ON m.seq = f.rowid
             WHERE {fts} MATCH ?1 AND m.user_id = ?2
             ORDER BY bm25({fts}) LIMIT ?3",
            fts = self.fts,
            table = self.table,
        );
        let user_id = user_id.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                stmt.query_map(params![fts_query, user_id, limit], row_to_memory)?
                    .collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Deletes one memory. Returns whether it existed.
    pub async fn delete(&self, id: &str) -> Result<bool, SableError> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", self.table);
        let id = id.to_string();
        let changed = self
            .db
            .connection()
            .call(move |conn| conn.execute(&sql, params![id]))
            .await
            .map_err(map_tr_err)?;
        Ok(changed > 0)
    }

    /// Deletes every memory of a user. Returns how many were removed.
    pub async fn clear(&self, user_id: &str) -> Result<usize, SableError> {
        let sql = format!("DELETE FROM {} WHERE user_id = ?1", self.table);
        let user_id = user_id.to_string();
        self.db
            .connection()
            .call(move |conn| conn.execute(&sql, params![user_id]))
            .await
            .map_err(map_tr_err)
    }

    pub async fn count(&self, user_id: &str) -> Result<usize, SableError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE user_id = ?1", self.table);
        let user_id = user_id.to_string();
        let count: i64 = self
            .db
            .connection()
            .call(move |conn| conn.query_row(&sql, params![user_id], |row| row.get(0)))
            .await
            .map_err(map_tr_err)?;
        Ok(count as usize)
    }
}
