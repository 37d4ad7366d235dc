// SPDX-FileCopyrightText: 2026 Sable Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! URL knowledge base: load and search.

use std::collections::HashMap;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use sable_config::model::{KnowledgeConfig, SearchType};
use sable_core::SableError;
use sable_core::traits::{EmbeddingAdapter, RerankerAdapter};
use sable_core::types::{EmbeddingInput, RerankInput};
use tracing::{debug, info, warn};

use crate::chunking::FixedSizeChunking;
use crate::document::ScoredDocument;
use crate::reader::UrlReader;
use crate::store::VectorDb;

/// Reciprocal rank fusion constant.
const RRF_K: f32 = 60.0;

/// Candidates fetched from each index before fusion and reranking.
const CANDIDATE_MULTIPLIER: usize = 4;

/// Outcome of [`UrlKnowledge::load`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub urls: usize,
    pub chunks: usize,
    pub inserted: usize,
    /// Chunks already present by content hash.
    pub skipped: usize,
}

/// A knowledge base built from a list of URLs.
pub struct UrlKnowledge {
    urls: Vec<String>,
    db: VectorDb,
    embedder: Arc<dyn EmbeddingAdapter>,
    reranker: Option<Arc<dyn RerankerAdapter>>,
    reranker_top_n: Option<usize>,
    reader: UrlReader,
    chunking: FixedSizeChunking,
    search_type: SearchType,
    num_documents: usize,
    show_progress: bool,
}

impl UrlKnowledge {
    /// Opens the vector database described by `config`.
    pub async fn new(
        config: &KnowledgeConfig,
        embedder: Arc<dyn EmbeddingAdapter>,
        reranker: Option<Arc<dyn RerankerAdapter>>,
    ) -> Result<Self, SableError> {
        let db = VectorDb::open(&config.vector_db).await?;
        Self::with_db(config, db, embedder, reranker)
    }

    /// Uses an already opened vector database.
    pub fn with_db(
        config: &KnowledgeConfig,
        db: VectorDb,
        embedder: Arc<dyn EmbeddingAdapter>,
        reranker: Option<Arc<dyn RerankerAdapter>>,
    ) -> Result<Self, SableError> {
        if embedder.dimensions() != db.dimensions() {
            return Err(SableError::Config(format!(
                "embedder produces {} dimensions but knowledge.vector_db.embedder.dimensions is {}",
                embedder.dimensions(),
                db.dimensions()
            )));
        }
        Ok(Self {
            urls: config.urls.clone(),
            db,
            embedder,
            reranker,
            reranker_top_n: config.vector_db.reranker.as_ref().and_then(|r| r.top_n),
            reader: UrlReader::new()?,
            chunking: FixedSizeChunking::new(config.chunk_size, config.chunk_overlap),
            search_type: config.vector_db.search_type,
            num_documents: config.num_documents,
            show_progress: false,
        })
    }

    /// Draw a progress bar on stderr while loading.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn num_documents(&self) -> usize {
        self.num_documents
    }

    pub fn search_type(&self) -> SearchType {
        self.search_type
    }

    pub fn vector_db(&self) -> &VectorDb {
        &self.db
    }

    /// Fetches, chunks, embeds and stores every URL.
    ///
    /// With `recreate` the table is dropped first. Otherwise chunks whose
    /// content is already stored are skipped, so loading twice is cheap.
    pub async fn load(&self, recreate: bool) -> Result<LoadReport, SableError> {
        if recreate && self.db.exists().await? {
            info!(table = self.db.table_name(), "recreating knowledge table");
            self.db.drop_tables().await?;
        }
        self.db.create().await?;

        let progress = self.progress_bar();
        let mut report = LoadReport {
            urls: self.urls.len(),
            ..LoadReport::default()
        };

        for url in &self.urls {
            progress.set_message(url.clone());
            let document = self.reader.read(url).await?;
            let chunks = self.chunking.chunk(&document);
            report.chunks += chunks.len();

            let mut fresh = Vec::with_capacity(chunks.len());
            for chunk in chunks {
                if self.db.content_hash_exists(&chunk.content_hash).await? {
                    report.skipped += 1;
                } else {
                    fresh.push(chunk);
                }
            }
            if !fresh.is_empty() {
                let output = self
                    .embedder
                    .embed(EmbeddingInput {
                        texts: fresh.iter().map(|d| d.content.clone()).collect(),
                    })
                    .await?;
                if output.embeddings.len() != fresh.len() {
                    return Err(SableError::knowledge(format!(
                        "embedder returned {} vectors for {} chunks",
                        output.embeddings.len(),
                        fresh.len()
                    )));
                }
                let inserted = self
                    .db
                    .insert(fresh.into_iter().zip(output.embeddings).collect())
                    .await?;
                report.inserted += inserted;
            }
            debug!(url, chunks = report.chunks, "knowledge source loaded");
            progress.inc(1);
        }

        progress.finish_with_message(format!(
            "loaded {} chunks ({} new)",
            report.chunks, report.inserted
        ));
        info!(
            urls = report.urls,
            chunks = report.chunks,
            inserted = report.inserted,
            skipped = report.skipped,
            "knowledge base loaded"
        );
        Ok(report)
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(self.urls.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar
    }

    /// Searches the knowledge base, returning at most `limit` documents
    /// (default `num_documents`), best first.
    pub async fn search(
        &self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ScoredDocument>, SableError> {
        if !self.db.exists().await? {
            warn!("knowledge base searched before it was loaded");
            return Ok(Vec::new());
        }
        let limit = limit.unwrap_or(self.num_documents).max(1);
        let candidates = if self.reranker.is_some() {
            limit * CANDIDATE_MULTIPLIER
        } else {
            limit
        };

        let ranked: Vec<(i64, f32)> = match self.search_type {
            SearchType::Vector => self
                .vector_hits(query, candidates)
                .await?
                .into_iter()
                .map(|(seq, distance)| (seq, 1.0 - distance))
                .collect(),
            SearchType::Keyword => self
                .db
                .keyword_search(query, candidates)
                .await?
                .into_iter()
                .map(|(seq, bm25)| (seq, -bm25 as f32))
                .collect(),
            SearchType::Hybrid => {
                let vector = self.vector_hits(query, candidates).await?;
                let keyword = self.db.keyword_search(query, candidates).await?;
                let mut fused = reciprocal_rank_fusion(&vector, &keyword);
                fused.truncate(candidates);
                fused
            }
        };

        let mut docs = self.hydrate(&ranked).await?;
        if let Some(reranker) = &self.reranker
            && !docs.is_empty()
        {
            docs = self.rerank(reranker.as_ref(), query, docs).await?;
        }
        docs.truncate(limit);
        debug!(query, search_type = %self.search_type, hits = docs.len(), "knowledge search");
        Ok(docs)
    }

    async fn vector_hits(&self, query: &str, k: usize) -> Result<Vec<(i64, f32)>, SableError> {
        let output = self
            .embedder
            .embed(EmbeddingInput {
                texts: vec![query.to_string()],
            })
            .await?;
        let embedding = output
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| SableError::knowledge("embedder returned no vector for the query"))?;
        self.db.vector_search(&embedding, k).await
    }

    /// Loads documents for ranked `seq`s, keeping rank order.
    async fn hydrate(&self, ranked: &[(i64, f32)]) -> Result<Vec<ScoredDocument>, SableError> {
        let seqs: Vec<i64> = ranked.iter().map(|(seq, _)| *seq).collect();
        let mut by_seq: HashMap<i64, _> = self.db.get_documents(&seqs).await?.into_iter().collect();
        Ok(ranked
            .iter()
            .filter_map(|(seq, score)| {
                by_seq.remove(seq).map(|document| ScoredDocument {
                    document,
                    score: *score,
                })
            })
            .collect())
    }

    async fn rerank(
        &self,
        reranker: &dyn RerankerAdapter,
        query: &str,
        docs: Vec<ScoredDocument>,
    ) -> Result<Vec<ScoredDocument>, SableError> {
        let results = reranker
            .rerank(RerankInput {
                query: query.to_string(),
                documents: docs.iter().map(|d| d.document.content.clone()).collect(),
                top_n: self.reranker_top_n,
            })
            .await?;
        let mut slots: Vec<Option<ScoredDocument>> = docs.into_iter().map(Some).collect();
        Ok(results
            .into_iter()
            .filter_map(|r| {
                slots.get_mut(r.index).and_then(Option::take).map(|mut d| {
                    d.score = r.relevance_score;
                    d
                })
            })
            .collect())
    }
}

/// Merges two ranked lists: each id scores `sum(1 / (k + rank))` over the
/// lists it appears in. Inputs must be sorted best first.
pub fn reciprocal_rank_fusion(vector: &[(i64, f32)], keyword: &[(i64, f64)]) -> Vec<(i64, f32)> {
    let mut scores: HashMap<i64, f32> = HashMap::new();
    let ranks = vector
        .iter()
        .map(|(id, _)| *id)
        .enumerate()
        .chain(keyword.iter().map(|(id, _)| *id).enumerate());
    for (rank, id) in ranks {
        *scores.entry(id).or_insert(0.0) += 1.0 / (RRF_K + rank as f32 + 1.0);
    }

    let mut fused: Vec<(i64, f32)> = scores.into_iter().collect();
    fused.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    fused
}
