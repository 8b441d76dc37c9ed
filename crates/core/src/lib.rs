pub mod chunking;
pub mod cleaner;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod registry;
pub mod store;
pub mod study;

pub use chunking::{
    chunk_sentences, ChunkingConfig, SentenceSplitter, UnicodeSentenceSplitter, DEFAULT_MAX_WORDS,
};
pub use cleaner::TextCleaner;
pub use embeddings::{
    embed_in_batches, CharacterNgramEmbedder, Embedder, HttpEmbedder, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_EMBED_BATCH_SIZE,
};
pub use error::{EmbedError, PipelineError, StoreError, StudyError};
pub use extractor::{extract_document_text, LopdfExtractor, PdfExtractor, OCR_ERROR_MARKER};
pub use index::FlatIndex;
pub use ingest::{digest_file, discover_pdf_files, source_file_name};
pub use models::{
    AddReport, Chunk, ChunkRecord, Document, Flashcard, MindMap, MindMapLink, MindMapNode, QaPair,
};
pub use orchestrator::{DocumentPipeline, ProcessOutcome};
pub use registry::DocumentRegistry;
pub use store::{StoreSnapshot, VectorStore, DEFAULT_STORE_DIR, DEFAULT_TOP_K};
pub use study::flashcards::generate_flashcards;
pub use study::llm::{CompletionModel, LlmClient, LlmConfig};
pub use study::mindmap::{generate_mind_map, render_dot};
pub use study::qna::{answer_from_context, generate_qa_pairs, generate_questions};
pub use study::summary::generate_summary;
