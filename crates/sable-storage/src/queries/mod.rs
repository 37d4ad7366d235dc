// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each takes a [`Database`](crate::Database) and the
//! [`SessionTables`](crate::SessionTables) naming the tables to use.

pub mod runs;
pub mod sessions;

/// Wrap a JSON decode failure so it can surface from inside a row mapper.
pub(crate) fn json_column_err(column: usize, e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}
