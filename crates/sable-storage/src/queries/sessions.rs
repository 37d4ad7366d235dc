// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session CRUD operations.

use rusqlite::{Row, params};
use sable_core::SableError;
use sable_core::types::{Session, now_timestamp};

use crate::database::{Database, map_tr_err};
use crate::queries::json_column_err;
use crate::schema::SessionTables;

fn row_to_session(row: &Row<'_>) -> Result<Session, rusqlite::Error> {
    let data: String = row.get(4)?;
    Ok(Session {
        id: row.get(0)?,
        agent_name: row.get(1)?,
        user_id: row.get(2)?,
        state: row.get(3)?,
        session_data: serde_json::from_str(&data).map_err(|e| json_column_err(4, e))?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Create a new session.
pub async fn create_session(
    db: &Database,
    tables: &SessionTables,
    session: &Session,
) -> Result<(), SableError> {
    let session = session.clone();
    let data = serde_json::to_string(&session.session_data).map_err(SableError::storage)?;
    let sql = format!(
        "INSERT INTO {} (id, agent_name, user_id, state, session_data, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        tables.sessions
    );
    db.connection()
        .call(move |conn| {
            conn.execute(
                &sql,
                params![
                    session.id,
                    session.agent_name,
                    session.user_id,
                    session.state,
                    data,
                    session.created_at,
                    session.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a session by ID.
pub async fn get_session(
    db: &Database,
    tables: &SessionTables,
    id: &str,
) -> Result<Option<Session>, SableError> {
    let id = id.to_string();
    let sql = format!(
        "SELECT id, agent_name, user_id, state, session_data, created_at, updated_at
         FROM {} WHERE id = ?1",
        tables.sessions
    );
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            match stmt.query_row(params![id], row_to_session) {
                Ok(session) => Ok(Some(session)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List sessions newest first, optionally filtered by user.
pub async fn list_sessions(
    db: &Database,
    tables: &SessionTables,
    user_id: Option<&str>,
) -> Result<Vec<Session>, SableError> {
    let user_id = user_id.map(str::to_string);
    let base = format!(
        "SELECT id, agent_name, user_id, state, session_data, created_at, updated_at FROM {}",
        tables.sessions
    );
    db.connection()
        .call(move |conn| {
            let rows = match &user_id {
                Some(user) => {
                    let mut stmt = conn.prepare(&format!(
                        "{base} WHERE user_id = ?1 ORDER BY updated_at DESC"
                    ))?;
                    stmt.query_map(params![user], row_to_session)?
                        .collect::<Result<Vec<_>, _>>()?
                }
                None => {
                    let mut stmt = conn.prepare(&format!("{base} ORDER BY updated_at DESC"))?;
                    stmt.query_map([], row_to_session)?
                        .collect::<Result<Vec<_>, _>>()?
                }
            };
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Replace a session's data blob and bump `updated_at`.
pub async fn update_session_data(
    db: &Database,
    tables: &SessionTables,
    id: &str,
    data: &serde_json::Value,
) -> Result<(), SableError> {
    let id = id.to_string();
    let data = serde_json::to_string(data).map_err(SableError::storage)?;
    let now = now_timestamp();
    let sql = format!(
        "UPDATE {} SET session_data = ?1, updated_at = ?2 WHERE id = ?3",
        tables.sessions
    );
    let changed = db
        .connection()
        .call(move |conn| conn.execute(&sql, params![data, now, id]))
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(SableError::Storage {
            source: "session not found".into(),
        });
    }
    Ok(())
}

/// Bump `updated_at` (called after each run).
pub async fn touch_session(
    db: &Database,
    tables: &SessionTables,
    id: &str,
) -> Result<(), SableError> {
    let id = id.to_string();
    let now = now_timestamp();
    let sql = format!("UPDATE {} SET updated_at = ?1 WHERE id = ?2", tables.sessions);
    db.connection()
        .call(move |conn| {
            conn.execute(&sql, params![now, id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a session; its runs go with it via the cascade.
pub async fn delete_session(
    db: &Database,
    tables: &SessionTables,
    id: &str,
) -> Result<(), SableError> {
    let id = id.to_string();
    let sql = format!("DELETE FROM {} WHERE id = ?1", tables.sessions);
    db.connection()
        .call(move |conn| {
            conn.execute(&sql, params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ensure_schema;

    async fn setup() -> (Database, SessionTables) {
        let db = Database::open_in_memory().await.unwrap();
        let tables = SessionTables::new("agent_sessions").unwrap();
        ensure_schema(&db, &tables).await.unwrap();
        (db, tables)
    }

    fn session(id: &str, user: Option<&str>, updated_at: &str) -> Session {
        Session {
            id: id.to_string(),
            agent_name: "agno".to_string(),
            user_id: user.map(str::to_string),
            state: "active".to_string(),
            session_data: serde_json::json!({}),
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: updated_at.to_string(),
        }
    }

    #[tokio::test]
    async fn create_and_get() {
        let (db, tables) = setup().await;
        create_session(&db, &tables, &session("s1", Some("ava"), "2026-01-01T00:00:00.000Z"))
            .await
            .unwrap();

        let got = get_session(&db, &tables, "s1").await.unwrap().unwrap();
        assert_eq!(got.user_id.as_deref(), Some("ava"));
        assert!(get_session(&db, &tables, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_by_user_newest_first() {
        let (db, tables) = setup().await;
        create_session(&db, &tables, &session("old", Some("ava"), "2026-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        create_session(&db, &tables, &session("new", Some("ava"), "2026-01-02T00:00:00.000Z"))
            .await
            .unwrap();
        create_session(&db, &tables, &session("other", Some("bob"), "2026-01-03T00:00:00.000Z"))
            .await
            .unwrap();

        let ava = list_sessions(&db, &tables, Some("ava")).await.unwrap();
        let ids: Vec<_> = ava.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["new", "old"]);
        assert_eq!(list_sessions(&db, &tables, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn session_data_round_trips() {
        let (db, tables) = setup().await;
        create_session(&db, &tables, &session("s1", None, "2026-01-01T00:00:00.000Z"))
            .await
            .unwrap();
        let data = serde_json::json!({"summary": {"summary": "talked about Agno"}});
        update_session_data(&db, &tables, "s1", &data).await.unwrap();

        let got = get_session(&db, &tables, "s1").await.unwrap().unwrap();
        assert_eq!(got.session_data, data);
        assert!(got.updated_at.as_str() > "2026-01-01T00:00:00.000Z");
    }

    #[tokio::test]
    async fn updating_missing_session_fails() {
        let (db, tables) = setup().await;
        let result = update_session_data(&db, &tables, "nope", &serde_json::json!({})).await;
        assert!(result.is_err());
    }
}
