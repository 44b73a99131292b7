//! File-backed vector index with linear-scan cosine retrieval.
//!
//! The whole collection is loaded into memory for every operation and
//! rewritten in full after every mutation. That bounds practical scale to
//! collections that fit in memory and tolerate O(n) rewrite and scan costs,
//! which is the intended target (a small support knowledge base).

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::chunker::chunk_text;
use crate::embedder::{Embedder, EmbeddingTask};

/// Source attribution stored alongside each chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Display name of the originating document (e.g. `faq.txt`).
    pub source: String,
    /// Full path or URI the document was loaded from.
    pub path: String,
}

/// Persisted unit: one chunk of text with its metadata and embedding vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Chunk body submitted to the embedding model.
    pub text: String,
    /// Source attribution.
    pub meta: ChunkMetadata,
    /// Embedding vector produced at ingest time.
    pub vector: Vec<f32>,
}

/// One retrieval result; lives only for the duration of a query.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Stored chunk text.
    pub text: String,
    /// Stored chunk metadata.
    pub meta: ChunkMetadata,
    /// Distance score defined as `1.0 - cosine_similarity`.
    ///
    /// Lower means MORE similar: an exact match scores 0.0. This inversion is
    /// deliberate (it matches the citation payload consumers already parse)
    /// and easy to misread, hence the emphasis. Hits are always returned in
    /// most-similar-first order regardless of this convention.
    pub score: f32,
}

/// Totals reported by [`VectorIndex::summary`].
#[derive(Debug, Clone, Serialize)]
pub struct IndexSummary {
    /// Number of stored chunks.
    pub total_chunks: usize,
    /// Chunk count per source document name.
    pub by_source: BTreeMap<String, usize>,
}

/// File-backed vector index. Owns the persisted collection exclusively;
/// mutations serialize on an internal lock around the whole
/// load-append-rewrite cycle, so concurrent writers queue rather than race.
/// Reads never block other reads.
pub struct VectorIndex {
    path: PathBuf,
    embedder: Box<dyn Embedder>,
    write_lock: Mutex<()>,
}

impl VectorIndex {
    /// Opens an index backed by `path`. A missing file is treated as the
    /// empty collection; nothing is created until the first `add`.
    pub fn new(path: impl Into<PathBuf>, embedder: Box<dyn Embedder>) -> Self {
        Self {
            path: path.into(),
            embedder,
            write_lock: Mutex::new(()),
        }
    }

    /// Embeds `texts` in one batch and appends the resulting records.
    ///
    /// Length mismatch between `texts` and `metas` fails before any external
    /// call or file write. Embedding failures also leave the persisted
    /// collection untouched: the rewrite only happens once every vector is in
    /// hand.
    pub fn add(&self, texts: &[String], metas: &[ChunkMetadata]) -> Result<()> {
        anyhow::ensure!(
            texts.len() == metas.len(),
            "documents and metadatas length mismatch: {} texts vs {} metas",
            texts.len(),
            metas.len()
        );
        if texts.is_empty() {
            return Ok(());
        }
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let vectors = self
            .embedder
            .embed(&inputs, EmbeddingTask::Document)
            .context("batch embedding failed; nothing was written to the index")?;
        anyhow::ensure!(
            vectors.len() == texts.len(),
            "embedder returned {} vectors for {} texts",
            vectors.len(),
            texts.len()
        );

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("index write lock poisoned"))?;
        let mut records = self.load()?;
        for ((text, meta), vector) in texts.iter().zip(metas).zip(vectors) {
            records.push(IndexRecord {
                text: text.clone(),
                meta: meta.clone(),
                vector,
            });
        }
        self.save(&records)
    }

    /// Chunks a raw document and adds every chunk under `name`. Returns the
    /// number of chunks added.
    pub fn add_document_text(
        &self,
        name: &str,
        text: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) -> Result<usize> {
        let chunks = chunk_text(text, chunk_size, chunk_overlap);
        let metas: Vec<ChunkMetadata> = chunks
            .iter()
            .map(|_| ChunkMetadata {
                source: name.to_string(),
                path: format!("uploaded://{name}"),
            })
            .collect();
        let added = chunks.len();
        self.add(&chunks, &metas)?;
        Ok(added)
    }

    /// Embeds `query` and returns the `k` most similar records, best first.
    ///
    /// Similarity ties keep insertion order (the underlying sort is stable),
    /// so repeated searches against unchanged data are fully deterministic.
    /// An empty index returns an empty Vec without contacting the embedding
    /// service.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let records = self.load()?;
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let qvec = self
            .embedder
            .embed(&[query], EmbeddingTask::Query)
            .context("failed to embed query")?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("embedder returned no vector for the query"))?;

        let mut ranked: Vec<(f32, &IndexRecord)> = records
            .iter()
            .map(|record| (cosine_similarity(&qvec, &record.vector), record))
            .collect();
        ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        ranked.truncate(k);
        Ok(ranked
            .into_iter()
            .map(|(similarity, record)| SearchHit {
                text: record.text.clone(),
                meta: record.meta.clone(),
                score: 1.0 - similarity,
            })
            .collect())
    }

    /// Number of stored records.
    pub fn count(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }

    /// Discards the entire stored collection. Idempotent: resetting an index
    /// that was never written is not an error.
    pub fn reset(&self) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("index write lock poisoned"))?;
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove index file {}", self.path.display()))?;
        }
        Ok(())
    }

    /// Total record count plus per-source chunk counts.
    pub fn summary(&self) -> Result<IndexSummary> {
        let records = self.load()?;
        let mut by_source: BTreeMap<String, usize> = BTreeMap::new();
        for record in &records {
            *by_source.entry(record.meta.source.clone()).or_default() += 1;
        }
        Ok(IndexSummary {
            total_chunks: records.len(),
            by_source,
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<IndexRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes = fs::read(&self.path)
            .with_context(|| format!("failed to read index file {}", self.path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("invalid index file {}", self.path.display()))
    }

    // Write-temp-then-rename keeps a crash mid-write from truncating the
    // live index file.
    fn save(&self, records: &[IndexRecord]) -> Result<()> {
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_vec(records).context("failed to serialize index records")?;
        fs::write(&tmp, data)
            .with_context(|| format!("failed to write temp index file {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace index file {}", self.path.display()))?;
        Ok(())
    }
}

/// Cosine similarity between two equal-length vectors.
///
/// Zero norms are substituted by 1.0 to avoid division by zero, so the zero
/// vector scores 0.0 against everything by construction. Deliberate
/// degenerate-case policy, not an accident.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_a = if norm_a == 0.0 { 1.0 } else { norm_a };
    let norm_b = if norm_b == 0.0 { 1.0 } else { norm_b };
    dot / (norm_a * norm_b)
}
