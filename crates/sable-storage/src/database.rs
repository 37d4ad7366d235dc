// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. Every store (sessions, memories, knowledge vectors) opens its own
//! [`Database`] and never shares the raw connection.

use std::ffi::{c_char, c_int};
use std::path::Path;
use std::sync::Once;

use rusqlite::ffi::{sqlite3, sqlite3_api_routines, sqlite3_auto_extension};
use sable_core::SableError;
use tracing::debug;

static VEC_INIT: Once = Once::new();

type SqliteExtensionFn =
    unsafe extern "C" fn(*mut sqlite3, *mut *mut c_char, *const sqlite3_api_routines) -> c_int;

/// Register sqlite-vec for every connection opened after this call.
///
/// Idempotent; runs once per process.
pub fn init_sqlite_vec() {
    VEC_INIT.call_once(|| {
        // sqlite-vec exports its init function without the callback signature
        // `sqlite3_auto_extension` expects.
        unsafe {
            sqlite3_auto_extension(Some(std::mem::transmute::<*const (), SqliteExtensionFn>(
                sqlite_vec::sqlite3_vec_init as *const (),
            )));
        }
        debug!("sqlite-vec extension registered");
    });
}

/// Convert a tokio-rusqlite error into [`SableError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> SableError {
    SableError::Storage {
        source: Box::new(e),
    }
}

/// A single SQLite connection driven by a tokio-rusqlite background thread.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (or create) a database file with WAL journaling.
    pub async fn open(path: &str) -> Result<Self, SableError> {
        Self::open_with(path, true).await
    }

    /// Open (or create) a database file, choosing the journal mode.
    ///
    /// Missing parent directories are created.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, SableError> {
        init_sqlite_vec();

        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(SableError::storage)?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(SableError::storage)?;
        let db = Self { conn };
        db.apply_pragmas(wal_mode).await?;
        debug!(path, wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database (tests and scratch use).
    pub async fn open_in_memory() -> Result<Self, SableError> {
        init_sqlite_vec();
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(SableError::storage)?;
        let db = Self { conn };
        db.apply_pragmas(false).await?;
        Ok(db)
    }

    async fn apply_pragmas(&self, wal_mode: bool) -> Result<(), SableError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    // journal_mode returns a row, so it cannot go through execute_batch.
                    let _mode: String =
                        conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
                    conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
                }
                conn.execute_batch(
                    "PRAGMA foreign_keys = ON;
                     PRAGMA busy_timeout = 5000;",
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// The underlying async connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Fold the WAL back into the main database file.
    pub async fn checkpoint(&self) -> Result<(), SableError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Version string reported by the sqlite-vec extension.
    pub async fn vec_version(&self) -> Result<String, SableError> {
        self.conn
            .call(|conn| conn.query_row("SELECT vec_version()", [], |row| row.get(0)))
            .await
            .map_err(map_tr_err)
    }
}
