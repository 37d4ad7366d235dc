// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite-backed vector table with an FTS5 index for BM25.
//!
//! One knowledge table `<name>` holds documents. `<name>_vec` is a
//! sqlite-vec `vec0` table keyed by the document's `seq`, and `<name>_fts`
//! is an external-content FTS5 index kept in sync by triggers.

use std::path::Path;

use rusqlite::OptionalExtension;
use sable_config::model::VectorDbConfig;
use sable_config::validation::is_sql_identifier;
use sable_core::SableError;
use sable_storage::{Database, map_tr_err};
use tracing::{debug, info};

use crate::document::Document;

/// File created inside the configured `uri` directory.
pub const DB_FILE_NAME: &str = "vectors.db";

#[derive(Debug, Clone)]
struct Tables {
    docs: String,
    vectors: String,
    fts: String,
}

impl Tables {
    fn new(name: &str) -> Result<Self, SableError> {
        if !is_sql_identifier(name) {
            return Err(SableError::Config(format!(
                "invalid knowledge table name `{name}`"
            )));
        }
        Ok(Self {
            docs: name.to_string(),
            vectors: format!("{name}_vec"),
            fts: format!("{name}_fts"),
        })
    }

    fn create_ddl(&self, dimensions: usize) -> String {
        let Self { docs, vectors, fts } = self;
        format!(
            "CREATE TABLE IF NOT EXISTS {docs} (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                doc_id TEXT NOT NULL,
                name TEXT NOT NULL,
                content TEXT NOT NULL,
                meta TEXT NOT NULL DEFAULT '{{}}',
                content_hash TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{docs}_name ON {docs}(name);

            CREATE VIRTUAL TABLE IF NOT EXISTS {vectors} USING vec0(
                embedding float[{dimensions}] distance_metric=cosine
            );

            CREATE VIRTUAL TABLE IF NOT EXISTS {fts} USING fts5(
                content,
                content='{docs}',
                content_rowid='seq'
            );

            CREATE TRIGGER IF NOT EXISTS {docs}_ai AFTER INSERT ON {docs} BEGIN
                INSERT INTO {fts}(rowid, content) VALUES (new.seq, new.content);
            END;

            CREATE TRIGGER IF NOT EXISTS {docs}_ad AFTER DELETE ON {docs} BEGIN
                INSERT INTO {fts}({fts}, rowid, content) VALUES('delete', old.seq, old.content);
            END;"
        )
    }

    fn drop_ddl(&self) -> String {
        let Self { docs, vectors, fts } = self;
        format!(
            "DROP TRIGGER IF EXISTS {docs}_ai;
             DROP TRIGGER IF EXISTS {docs}_ad;
             DROP TABLE IF EXISTS {fts};
             DROP TABLE IF EXISTS {vectors};
             DROP TABLE IF EXISTS {docs};"
        )
    }
}

/// Little-endian f32 bytes, the blob layout `vec0` expects.
fn vector_blob(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// Quotes each word of a free-text query and ORs them, so punctuation in
/// user input cannot break FTS5 query syntax.
pub fn fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t.to_lowercase()))
        .collect();
    (!terms.is_empty()).then(|| terms.join(" OR "))
}

/// A document table with vector and keyword indexes.
#[derive(Clone)]
pub struct VectorDb {
    db: Database,
    tables: Tables,
    dimensions: usize,
}

impl VectorDb {
    /// Opens `<uri>/vectors.db` for the configured table. Tables are not
    /// created until [`VectorDb::create`].
    pub async fn open(config: &VectorDbConfig) -> Result<Self, SableError> {
        let tables = Tables::new(&config.table_name)?;
        let path = Path::new(&config.uri).join(DB_FILE_NAME);
        let db = Database::open(&path.to_string_lossy()).await?;
        Ok(Self {
            db,
            tables,
            dimensions: config.embedder.dimensions,
        })
    }

    pub async fn open_in_memory(table_name: &str, dimensions: usize) -> Result<Self, SableError> {
        Ok(Self {
            db: Database::open_in_memory().await?,
            tables: Tables::new(table_name)?,
            dimensions,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn table_name(&self) -> &str {
        &self.tables.docs
    }

    pub async fn create(&self) -> Result<(), SableError> {
        let ddl = self.tables.create_ddl(self.dimensions);
        self.db
            .connection()
            .call(move |conn| conn.execute_batch(&ddl))
            .await
            .map_err(map_tr_err)
    }

    pub async fn exists(&self) -> Result<bool, SableError> {
        let name = self.tables.docs.clone();
        self.db
            .connection()
            .call(move |conn| {
                conn.query_row(
                    "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [name],
                    |_| Ok(()),
                )
                .optional()
                .map(|row| row.is_some())
            })
            .await
            .map_err(map_tr_err)
    }

    /// Drops the document table and both indexes.
    pub async fn drop_tables(&self) -> Result<(), SableError> {
        let ddl = self.tables.drop_ddl();
        self.db
            .connection()
            .call(move |conn| conn.execute_batch(&ddl))
            .await
            .map_err(map_tr_err)?;
        info!(table = %self.tables.docs, "knowledge table dropped");
        Ok(())
    }

    pub async fn content_hash_exists(&self, hash: &str) -> Result<bool, SableError> {
        let sql = format!("SELECT 1 FROM {} WHERE content_hash = ?1", self.tables.docs);
        let hash = hash.to_string();
        self.db
            .connection()
            .call(move |conn| {
                conn.query_row(&sql, [hash], |_| Ok(()))
                    .optional()
                    .map(|row| row.is_some())
            })
            .await
            .map_err(map_tr_err)
    }

    pub async fn count(&self) -> Result<usize, SableError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.tables.docs);
        self.db
            .connection()
            .call(move |conn| conn.query_row(&sql, [], |row| row.get::<_, i64>(0)))
            .await
            .map(|n| n as usize)
            .map_err(map_tr_err)
    }

    /// Inserts documents with their embeddings in one transaction.
    ///
    /// Documents whose content hash is already stored are skipped. Returns
    /// the number of rows inserted.
    pub async fn insert(&self, rows: Vec<(Document, Vec<f32>)>) -> Result<usize, SableError> {
        if let Some((doc, v)) = rows.iter().find(|(_, v)| v.len() != self.dimensions) {
            return Err(SableError::knowledge(format!(
                "embedding for {} has {} dimensions, table expects {}",
                doc.id,
                v.len(),
                self.dimensions
            )));
        }
        let Tables { docs, vectors, .. } = self.tables.clone();
        let created_at = sable_core::types::now_timestamp();

        let inserted = self
            .db
            .connection()
            .call(move |conn| -> Result<usize, rusqlite::Error> {
                let tx = conn.transaction()?;
                let mut inserted = 0;
                {
                    let mut insert_doc = tx.prepare(&format!(
                        "INSERT OR IGNORE INTO {docs} (doc_id, name, content, meta, content_hash, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
                    ))?;
                    let mut insert_vec =
                        tx.prepare(&format!("INSERT INTO {vectors} (rowid, embedding) VALUES (?1, ?2)"))?;
                    for (doc, embedding) in &rows {
                        let changed = insert_doc.execute(rusqlite::params![
                            doc.id,
                            doc.name,
                            doc.content,
                            doc.meta.to_string(),
                            doc.content_hash,
                            created_at,
                        ])?;
                        if changed == 0 {
                            continue;
                        }
                        let seq = tx.last_insert_rowid();
                        insert_vec.execute(rusqlite::params![seq, vector_blob(embedding)])?;
                        inserted += 1;
                    }
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await
            .map_err(map_tr_err)?;
        debug!(table = %self.tables.docs, inserted, "documents inserted");
        Ok(inserted)
    }

    /// Nearest neighbours as `(seq, cosine distance)`, closest first.
    pub async fn vector_search(
        &self,
        embedding: &[f32],
        k: usize,
    ) -> Result<Vec<(i64, f32)>, SableError> {
        if embedding.len() != self.dimensions {
            return Err(SableError::knowledge(format!(
                "query embedding has {} dimensions, table expects {}",
                embedding.len(),
                self.dimensions
            )));
        }
        let sql = format!(
            "SELECT rowid, distance FROM {} WHERE embedding MATCH ?1 AND k = ?2 ORDER BY distance",
            self.tables.vectors
        );
        let blob = vector_blob(embedding);
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                stmt.query_map(rusqlite::params![blob, k as i64], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)? as f32))
                })?
                .collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)
    }

    /// BM25 matches as `(seq, bm25)`. BM25 is negative; most relevant first.
    pub async fn keyword_search(&self, query: &str, k: usize) -> Result<Vec<(i64, f64)>, SableError> {
        let Some(fts_query) = fts_query(query) else {
            return Ok(Vec::new());
        };
        let Tables { docs, fts, .. } = self.tables.clone();
        let sql = format!(
            "SELECT d.seq, bm25({fts}) FROM {fts} JOIN {docs} d ON d.seq = {fts}.rowid
             WHERE {fts} MATCH ?1 ORDER BY bm25({fts}) LIMIT ?2"
        );
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                stmt.query_map(rusqlite::params![fts_query, k as i64], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, f64>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)
    }

    /// Fetches documents by `seq`, in no particular order.
    pub async fn get_documents(&self, seqs: &[i64]) -> Result<Vec<(i64, Document)>, SableError> {
        if seqs.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders: Vec<String> = (1..=seqs.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "SELECT seq, doc_id, name, content, meta, content_hash FROM {} WHERE seq IN ({})",
            self.tables.docs,
            placeholders.join(", ")
        );
        let seqs = seqs.to_vec();
        self.db
            .connection()
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                stmt.query_map(rusqlite::params_from_iter(seqs.iter()), |row| {
                    let meta: String = row.get(4)?;
                    Ok((
                        row.get::<_, i64>(0)?,
                        Document {
                            id: row.get(1)?,
                            name: row.get(2)?,
                            content: row.get(3)?,
                            meta: serde_json::from_str(&meta).unwrap_or_default(),
                            content_hash: row.get(5)?,
                        },
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()
            })
            .await
            .map_err(map_tr_err)
    }
}
