use crate::models::Chunk;
use unicode_segmentation::UnicodeSegmentation;

pub const DEFAULT_MAX_WORDS: usize = 200;

/// Sentence-boundary model. Injected so the chunker can be driven by a
/// deterministic splitter in tests.
pub trait SentenceSplitter: Send + Sync {
    fn split_sentences(&self, text: &str) -> Vec<String>;
}

/// Default splitter backed by Unicode sentence boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSentenceSplitter;

impl SentenceSplitter for UnicodeSentenceSplitter {
    fn split_sentences(&self, text: &str) -> Vec<String> {
        text.unicode_sentences()
            .map(|sentence| sentence.trim().to_string())
            .filter(|sentence| !sentence.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Advisory upper bound on words per chunk. A single sentence longer
    /// than this still becomes its own chunk; sentences are never split.
    pub max_words: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: DEFAULT_MAX_WORDS,
        }
    }
}

/// Greedily packs sentences into chunks of at most `max_words` words,
/// joining the sentences of a chunk with single spaces. Word counts are
/// whitespace-delimited token counts.
pub fn chunk_sentences(
    text: &str,
    splitter: &dyn SentenceSplitter,
    config: ChunkingConfig,
) -> Vec<Chunk> {
    let max_words = config.max_words.max(1);

    let sentences = splitter
        .split_sentences(text)
        .into_iter()
        .map(|sentence| sentence.trim().to_string())
        .filter(|sentence| !sentence.is_empty())
        .collect::<Vec<_>>();

    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_words = 0usize;

    for sentence in sentences {
        let words = sentence.split_whitespace().count();

        if current_words + words <= max_words {
            current.push(sentence);
            current_words += words;
        } else {
            if !current.is_empty() {
                chunks.push(Chunk::new(current.join(" ")));
            }
            current_words = words;
            current = vec![sentence];
        }
    }

    if !current.is_empty() {
        chunks.push(Chunk::new(current.join(" ")));
    }

    chunks
}
