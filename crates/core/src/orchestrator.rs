use crate::chunking::{chunk_sentences, ChunkingConfig, SentenceSplitter};
use crate::cleaner::TextCleaner;
use crate::error::{PipelineError, Result};
use crate::extractor::OCR_ERROR_MARKER;
use crate::models::{AddReport, Chunk};
use crate::store::VectorStore;
use std::sync::Arc;
use tracing::info;

/// What one document produced on its way into the store.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub chunks: Vec<Chunk>,
    pub report: AddReport,
}

/// Runs extracted document text through cleaning, chunking, and indexing,
/// and answers similarity queries against the shared store.
pub struct DocumentPipeline {
    cleaner: TextCleaner,
    splitter: Arc<dyn SentenceSplitter>,
    chunking: ChunkingConfig,
    store: Arc<VectorStore>,
}

impl DocumentPipeline {
    pub fn new(
        splitter: Arc<dyn SentenceSplitter>,
        chunking: ChunkingConfig,
        store: Arc<VectorStore>,
    ) -> Result<Self> {
        if chunking.max_words == 0 {
            return Err(PipelineError::InvalidChunkConfig(
                "max_words must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            cleaner: TextCleaner::new()?,
            splitter,
            chunking,
            store,
        })
    }

    /// Cleans, chunks, embeds, and indexes one document's text under the
    /// given identity. Text carrying an upstream extraction error marker
    /// aborts before cleaning; text that cleans down to nothing indexes
    /// nothing and succeeds.
    pub async fn process_document(
        &self,
        raw_text: &str,
        document_id: &str,
        source_filename: &str,
    ) -> Result<ProcessOutcome> {
        if raw_text.starts_with(OCR_ERROR_MARKER) {
            return Err(PipelineError::OcrFailed(raw_text.trim().to_string()));
        }

        let cleaned = self.cleaner.clean(raw_text);
        let chunks = chunk_sentences(&cleaned, self.splitter.as_ref(), self.chunking);
        let report = self.store.add(&chunks, document_id, source_filename).await?;

        info!(
            document_id,
            source_filename,
            chunks = chunks.len(),
            start_ordinal = report.start_ordinal,
            "processed document"
        );

        Ok(ProcessOutcome { chunks, report })
    }

    pub async fn query(&self, query_text: &str, top_k: usize) -> Result<Vec<String>> {
        Ok(self.store.search(query_text, top_k).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::DocumentPipeline;
    use crate::chunking::{ChunkingConfig, SentenceSplitter, UnicodeSentenceSplitter};
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::error::PipelineError;
    use crate::store::VectorStore;
    use std::sync::Arc;
    use tempfile::tempdir;

    struct PipeSplitter;

    impl SentenceSplitter for PipeSplitter {
        fn split_sentences(&self, text: &str) -> Vec<String> {
            text.split('|').map(|part| part.to_string()).collect()
        }
    }

    async fn pipeline_with_store(
        dir: &std::path::Path,
        splitter: Arc<dyn SentenceSplitter>,
        max_words: usize,
    ) -> (DocumentPipeline, Arc<VectorStore>) {
        let embedder = Arc::new(CharacterNgramEmbedder { dimensions: 64 });
        let store = Arc::new(VectorStore::open(dir, embedder).await.unwrap());
        let pipeline =
            DocumentPipeline::new(splitter, ChunkingConfig { max_words }, store.clone()).unwrap();
        (pipeline, store)
    }

    #[tokio::test]
    async fn zero_max_words_is_rejected() {
        let dir = tempdir().unwrap();
        let embedder = Arc::new(CharacterNgramEmbedder { dimensions: 64 });
        let store = Arc::new(VectorStore::open(dir.path(), embedder).await.unwrap());

        let result = DocumentPipeline::new(
            Arc::new(UnicodeSentenceSplitter),
            ChunkingConfig { max_words: 0 },
            store,
        );

        assert!(matches!(result, Err(PipelineError::InvalidChunkConfig(_))));
    }

    #[tokio::test]
    async fn error_marker_text_aborts_before_indexing() {
        let dir = tempdir().unwrap();
        let (pipeline, store) =
            pipeline_with_store(dir.path(), Arc::new(UnicodeSentenceSplitter), 200).await;

        let result = pipeline
            .process_document("Error: could not read pdf", "doc-1", "broken.pdf")
            .await;

        assert!(matches!(result, Err(PipelineError::OcrFailed(_))));
        assert_eq!(store.snapshot().await.index.ntotal(), 0);
    }

    #[tokio::test]
    async fn empty_text_indexes_nothing_and_succeeds() {
        let dir = tempdir().unwrap();
        let (pipeline, store) =
            pipeline_with_store(dir.path(), Arc::new(UnicodeSentenceSplitter), 200).await;

        let outcome = pipeline
            .process_document("  \n\n  ", "doc-1", "blank.pdf")
            .await
            .unwrap();

        assert!(outcome.chunks.is_empty());
        assert_eq!(outcome.report.added, 0);
        assert_eq!(store.snapshot().await.index.ntotal(), 0);
    }

    #[tokio::test]
    async fn processed_text_is_cleaned_then_queryable() {
        let dir = tempdir().unwrap();
        let (pipeline, _store) =
            pipeline_with_store(dir.path(), Arc::new(UnicodeSentenceSplitter), 200).await;

        let raw = "Page 2 of 10\n\nHELLO WORLD\n\nCapacitors store charge in an electric field.";
        let outcome = pipeline
            .process_document(raw, "doc-1", "circuits.pdf")
            .await
            .unwrap();

        assert_eq!(outcome.chunks.len(), 1);
        assert_eq!(
            outcome.chunks[0].text,
            "Capacitors store charge in an electric field."
        );

        let results = pipeline
            .query("Capacitors store charge in an electric field.", 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].contains("Capacitors"));
    }

    #[tokio::test]
    async fn chunk_boundaries_follow_the_injected_splitter() {
        let dir = tempdir().unwrap();
        let (pipeline, _store) = pipeline_with_store(dir.path(), Arc::new(PipeSplitter), 4).await;

        let outcome = pipeline
            .process_document("one two three|four five six", "doc-1", "notes.pdf")
            .await
            .unwrap();

        assert_eq!(outcome.chunks.len(), 2);
        assert_eq!(outcome.chunks[0].text, "one two three");
        assert_eq!(outcome.chunks[1].text, "four five six");
    }
}
