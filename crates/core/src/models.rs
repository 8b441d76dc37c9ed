use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A run of sentences joined into one indexable unit of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub word_count: usize,
}

impl Chunk {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let word_count = text.split_whitespace().count();
        Self { text, word_count }
    }
}

/// Metadata persisted alongside each indexed vector, keyed by its ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub chunk_text: String,
    pub doc_id: String,
    pub source_filename: String,
}

/// An uploaded document. Lives in memory for the process lifetime; only its
/// derived chunks are persisted, via the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub source_filename: String,
    pub checksum: String,
    pub text: String,
    pub summary: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

/// Outcome of one vector store add.
#[derive(Debug, Clone)]
pub struct AddReport {
    /// Number of chunks appended by this call.
    pub added: usize,
    /// Ordinal assigned to the first appended chunk.
    pub start_ordinal: u64,
    /// Total vectors in the index after the call.
    pub total_vectors: u64,
    /// Set when the updated store could not be written back to disk. The
    /// appended chunks reported above were still assigned their ordinals.
    pub persist_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flashcard {
    pub concept: String,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindMapNode {
    pub id: String,
    #[serde(rename = "type", default)]
    pub node_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindMapLink {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub relation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindMap {
    pub nodes: Vec<MindMapNode>,
    pub links: Vec<MindMapLink>,
}

#[cfg(test)]
mod tests {
    use super::Chunk;

    #[test]
    fn chunk_counts_whitespace_delimited_words() {
        let chunk = Chunk::new("one  two\tthree\nfour");
        assert_eq!(chunk.word_count, 4);
    }

    #[test]
    fn empty_chunk_has_zero_words() {
        let chunk = Chunk::new("   ");
        assert_eq!(chunk.word_count, 0);
    }
}
