use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::embeddings::{embed_in_batches, Embedder, DEFAULT_EMBED_BATCH_SIZE};
use crate::error::StoreError;
use crate::index::FlatIndex;
use crate::models::{AddReport, Chunk, ChunkRecord};

pub const DEFAULT_STORE_DIR: &str = "vector_store";
pub const INDEX_FILE_NAME: &str = "vector_index.bin";
pub const RECORDS_FILE_NAME: &str = "chunk_records.bin";
pub const DEFAULT_TOP_K: usize = 5;

/// The store's in-memory state: the vector index plus one chunk record per
/// insertion ordinal. Both halves persist as sibling artifacts in the store
/// directory and are only meaningful together.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    pub index: FlatIndex,
    pub records: BTreeMap<u64, ChunkRecord>,
}

/// Disk-backed semantic store over text chunks.
///
/// State is loaded once when the store is opened and mutated in memory;
/// every successful `add` writes both artifacts back out. A single async
/// mutex serializes all operations, so concurrent ingests in one process
/// observe whole batches and never interleave ordinal assignment. Writers
/// in other processes are not coordinated.
pub struct VectorStore {
    dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    batch_size: usize,
    state: Mutex<StoreSnapshot>,
}

impl VectorStore {
    /// Opens the store rooted at `dir`, loading any existing artifacts.
    /// Unreadable or partially present artifacts degrade to an empty store;
    /// the embedder is only probed for its dimension in that fresh case.
    pub async fn open(
        dir: impl Into<PathBuf>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self, StoreError> {
        let dir = dir.into();
        let state = Self::load_or_default(&dir, embedder.as_ref()).await?;

        Ok(Self {
            dir,
            embedder,
            batch_size: DEFAULT_EMBED_BATCH_SIZE,
            state: Mutex::new(state),
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn load_or_default(
        dir: &Path,
        embedder: &dyn Embedder,
    ) -> Result<StoreSnapshot, StoreError> {
        let index_path = dir.join(INDEX_FILE_NAME);
        let records_path = dir.join(RECORDS_FILE_NAME);

        if index_path.is_file() && records_path.is_file() {
            match Self::read_artifacts(&index_path, &records_path).await {
                Ok(snapshot) => {
                    debug!(
                        vectors = snapshot.index.ntotal(),
                        records = snapshot.records.len(),
                        "loaded vector store"
                    );
                    return Ok(snapshot);
                }
                Err(error) => {
                    warn!(%error, dir = %dir.display(), "unreadable store artifacts, starting fresh");
                }
            }
        }

        let dimension = embedder.dimension().await?;

        Ok(StoreSnapshot {
            index: FlatIndex::new(dimension),
            records: BTreeMap::new(),
        })
    }

    async fn read_artifacts(
        index_path: &Path,
        records_path: &Path,
    ) -> Result<StoreSnapshot, StoreError> {
        let index_bytes = tokio::fs::read(index_path).await?;
        let records_bytes = tokio::fs::read(records_path).await?;

        let index: FlatIndex = bincode::deserialize(&index_bytes)?;
        let records: BTreeMap<u64, ChunkRecord> = bincode::deserialize(&records_bytes)?;

        Ok(StoreSnapshot { index, records })
    }

    /// Embeds `chunks` and appends them under a fresh run of ordinals,
    /// tagging every record with the owning document. An empty batch is a
    /// no-op and touches nothing on disk. A failed persist is reported in
    /// the returned [`AddReport`] rather than as an error; the batch stays
    /// queryable in memory.
    pub async fn add(
        &self,
        chunks: &[Chunk],
        document_id: &str,
        source_filename: &str,
    ) -> Result<AddReport, StoreError> {
        let mut state = self.state.lock().await;

        if chunks.is_empty() {
            let total = state.index.ntotal();
            return Ok(AddReport {
                added: 0,
                start_ordinal: total,
                total_vectors: total,
                persist_error: None,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = embed_in_batches(self.embedder.as_ref(), &texts, self.batch_size).await?;

        let start_ordinal = state.index.ntotal();
        state.index.add(&embeddings)?;

        for (offset, chunk) in chunks.iter().enumerate() {
            state.records.insert(
                start_ordinal + offset as u64,
                ChunkRecord {
                    chunk_text: chunk.text.clone(),
                    doc_id: document_id.to_string(),
                    source_filename: source_filename.to_string(),
                },
            );
        }

        let persist_error = match self.persist(&state).await {
            Ok(()) => None,
            Err(error) => {
                warn!(%error, dir = %self.dir.display(), "failed to persist vector store");
                Some(error.to_string())
            }
        };

        let total_vectors = state.index.ntotal();
        info!(
            added = chunks.len(),
            total = total_vectors,
            document_id,
            source_filename,
            "indexed chunk batch"
        );

        Ok(AddReport {
            added: chunks.len(),
            start_ordinal,
            total_vectors,
            persist_error,
        })
    }

    /// Returns the texts of up to `top_k` nearest chunks. An empty store
    /// answers immediately without embedding the query. Hits whose ordinal
    /// has no chunk record are dropped from the result.
    pub async fn search(&self, query_text: &str, top_k: usize) -> Result<Vec<String>, StoreError> {
        let state = self.state.lock().await;

        if state.index.ntotal() == 0 || state.records.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed_one(query_text).await?;
        let hits = state.index.search(&query, top_k)?;

        let mut results = Vec::with_capacity(hits.len());
        for (ordinal, _distance) in hits {
            match state.records.get(&ordinal) {
                Some(record) => results.push(record.chunk_text.clone()),
                None => debug!(ordinal, "hit without a chunk record, skipping"),
            }
        }

        Ok(results)
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        self.state.lock().await.clone()
    }

    async fn persist(&self, state: &StoreSnapshot) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let index_bytes = bincode::serialize(&state.index)?;
        let records_bytes = bincode::serialize(&state.records)?;

        tokio::fs::write(self.dir.join(INDEX_FILE_NAME), index_bytes).await?;
        tokio::fs::write(self.dir.join(RECORDS_FILE_NAME), records_bytes).await?;

        debug!(dir = %self.dir.display(), "persisted vector store artifacts");
        Ok(())
    }
}
