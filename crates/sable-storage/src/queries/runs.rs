// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run history operations.

use rusqlite::{Row, params};
use sable_core::SableError;
use sable_core::types::RunRecord;

use crate::database::{Database, map_tr_err};
use crate::queries::json_column_err;
use crate::schema::SessionTables;

const RUN_COLUMNS: &str = "id, session_id, user_id, input, output, messages, usage, created_at";

fn row_to_run(row: &Row<'_>) -> Result<RunRecord, rusqlite::Error> {
    let messages: String = row.get(5)?;
    let usage: String = row.get(6)?;
    Ok(RunRecord {
        id: row.get(0)?,
        session_id: row.get(1)?,
        user_id: row.get(2)?,
        input: row.get(3)?,
        output: row.get(4)?,
        messages: serde_json::from_str(&messages).map_err(|e| json_column_err(5, e))?,
        usage: serde_json::from_str(&usage).map_err(|e| json_column_err(6, e))?,
        created_at: row.get(7)?,
    })
}

/// Append a completed run to its session.
pub async fn insert_run(
    db: &Database,
    tables: &SessionTables,
    run: &RunRecord,
) -> Result<(), SableError> {
    let run = run.clone();
    let messages = serde_json::to_string(&run.messages).map_err(SableError::storage)?;
    let usage = serde_json::to_string(&run.usage).map_err(SableError::storage)?;
    let sql = format!(
        "INSERT INTO {} ({RUN_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        tables.runs
    );
    db.connection()
        .call(move |conn| {
            conn.execute(
                &sql,
                params![
                    run.id,
                    run.session_id,
                    run.user_id,
                    run.input,
                    run.output,
                    messages,
                    usage,
                    run.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The last `n` runs of a session, oldest first.
pub async fn get_recent_runs(
    db: &Database,
    tables: &SessionTables,
    session_id: &str,
    n: usize,
) -> Result<Vec<RunRecord>, SableError> {
    let session_id = session_id.to_string();
    let limit = i64::try_from(n).unwrap_or(i64::MAX);
    let sql = format!(
        "SELECT {RUN_COLUMNS} FROM (
             SELECT seq, {RUN_COLUMNS} FROM {} WHERE session_id = ?1 ORDER BY seq DESC LIMIT ?2
         ) ORDER BY seq ASC",
        tables.runs
    );
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            stmt.query_map(params![session_id, limit], row_to_run)?
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Number of runs stored for a session.
pub async fn count_runs(
    db: &Database,
    tables: &SessionTables,
    session_id: &str,
) -> Result<usize, SableError> {
    let session_id = session_id.to_string();
    let sql = format!("SELECT COUNT(*) FROM {} WHERE session_id = ?1", tables.runs);
    let count: i64 = db
        .connection()
        .call(move |conn| conn.query_row(&sql, params![session_id], |row| row.get(0)))
        .await
        .map_err(map_tr_err)?;
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::sessions::{create_session, delete_session};
    use crate::schema::ensure_schema;
    use sable_core::types::{ProviderMessage, Session, TokenUsage};

    async fn setup() -> (Database, SessionTables) {
        let db = Database::open_in_memory().await.unwrap();
        let tables = SessionTables::new("agent_sessions").unwrap();
        ensure_schema(&db, &tables).await.unwrap();
        create_session(
            &db,
            &tables,
            &Session {
                id: "s1".into(),
                agent_name: "agno".into(),
                user_id: None,
                state: "active".into(),
                session_data: serde_json::json!({}),
                created_at: "2026-01-01T00:00:00.000Z".into(),
                updated_at: "2026-01-01T00:00:00.000Z".into(),
            },
        )
        .await
        .unwrap();
        (db, tables)
    }

    fn run(i: usize) -> RunRecord {
        RunRecord {
            id: format!("run-{i}"),
            session_id: "s1".into(),
            user_id: None,
            input: format!("question {i}"),
            output: format!("answer {i}"),
            messages: vec![
                ProviderMessage::text("user", format!("question {i}")),
                ProviderMessage::text("assistant", format!("answer {i}")),
            ],
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
                ..Default::default()
            },
            created_at: "2026-01-01T00:00:00.000Z".into(),
        }
    }

    #[tokio::test]
    async fn recent_runs_are_last_n_in_order() {
        let (db, tables) = setup().await;
        for i in 0..5 {
            insert_run(&db, &tables, &run(i)).await.unwrap();
        }

        let recent = get_recent_runs(&db, &tables, "s1", 3).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["run-2", "run-3", "run-4"]);
        assert_eq!(recent[0].messages.len(), 2);
        assert_eq!(recent[0].usage.input_tokens, 10);
    }

    #[tokio::test]
    async fn fewer_runs_than_requested() {
        let (db, tables) = setup().await;
        insert_run(&db, &tables, &run(0)).await.unwrap();
        let recent = get_recent_runs(&db, &tables, "s1", 3).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert!(get_recent_runs(&db, &tables, "other", 3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_session_cascades_to_runs() {
        let (db, tables) = setup().await;
        insert_run(&db, &tables, &run(0)).await.unwrap();
        assert_eq!(count_runs(&db, &tables, "s1").await.unwrap(), 1);

        delete_session(&db, &tables, "s1").await.unwrap();
        assert_eq!(count_runs(&db, &tables, "s1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn run_for_unknown_session_is_rejected() {
        let (db, tables) = setup().await;
        let mut orphan = run(9);
        orphan.session_id = "nope".into();
        assert!(insert_run(&db, &tables, &orphan).await.is_err());
    }
}
