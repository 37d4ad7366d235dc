// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the Sable agent runtime.
//!
//! WAL-mode SQLite behind a single `tokio-rusqlite` connection per store,
//! session and run-history tables with configurable names, and process-wide
//! sqlite-vec registration used by the knowledge base.

pub mod adapter;
pub mod database;
pub mod queries;
pub mod schema;

pub use adapter::SqliteStorage;
pub use database::{Database, init_sqlite_vec, map_tr_err};
pub use schema::SessionTables;
