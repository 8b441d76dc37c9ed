use crate::error::EmbedError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use url::Url;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 128;
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 32;
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";

const DIMENSION_PROBE_TEXT: &str = "test";

/// Embedding model capability. Implementations must be deterministic for a
/// fixed model and input, and must return one vector per input text in
/// input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn dimension(&self) -> Result<usize, EmbedError>;

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let texts = [text.to_string()];
        let mut rows = self.embed(&texts).await?;
        rows.pop().ok_or_else(|| EmbedError::BackendResponse {
            backend: "embedding".to_string(),
            details: "no vector returned for a single input".to_string(),
        })
    }
}

/// Embeds `texts` in slices of `batch_size`, concatenating the results in
/// input order. Batching only affects throughput, never output values.
pub async fn embed_in_batches(
    embedder: &dyn Embedder,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, EmbedError> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let batch_size = batch_size.max(1);
    let mut embeddings = Vec::with_capacity(texts.len());

    for batch in texts.chunks(batch_size) {
        embeddings.extend(embedder.embed(batch).await?);
    }

    Ok(embeddings)
}

/// Deterministic local model: hashed character trigrams, L2-normalized.
/// Used as the fallback when no remote embedding endpoint is configured and
/// as the non-degenerate model in tests.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for CharacterNgramEmbedder {
    async fn dimension(&self) -> Result<usize, EmbedError> {
        Ok(self.dimensions.max(1))
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingEndpointConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl EmbeddingEndpointConfig {
    /// Reads `EMBEDDING_ENDPOINT`, `EMBEDDING_MODEL`, and
    /// `EMBEDDING_API_KEY`. Returns `None` when no endpoint is set; a blank
    /// value counts as unset.
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("EMBEDDING_ENDPOINT").ok()?;
        let endpoint = endpoint.trim().to_string();
        if endpoint.is_empty() {
            return None;
        }

        let model = std::env::var("EMBEDDING_MODEL")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());

        let api_key = std::env::var("EMBEDDING_API_KEY").ok().and_then(|value| {
            let key = value.trim().to_string();
            if key.is_empty() {
                None
            } else {
                Some(key)
            }
        });

        Some(Self {
            endpoint,
            model,
            api_key,
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Remote embedding model behind an `/api/embed` endpoint. Dimensionality
/// is probed once by embedding a sentinel string and cached for the
/// lifetime of the instance.
pub struct HttpEmbedder {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    client: Client,
    probed_dimension: OnceCell<usize>,
}

impl HttpEmbedder {
    pub fn new(config: EmbeddingEndpointConfig) -> Result<Self, EmbedError> {
        Url::parse(&config.endpoint)?;

        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model,
            api_key: config.api_key,
            client: Client::new(),
            probed_dimension: OnceCell::new(),
        })
    }

    pub fn from_env() -> Result<Option<Self>, EmbedError> {
        match EmbeddingEndpointConfig::from_env() {
            Some(config) => Ok(Some(Self::new(config)?)),
            None => Ok(None),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn dimension(&self) -> Result<usize, EmbedError> {
        let dimension = self
            .probed_dimension
            .get_or_try_init(|| async {
                let probe = self.embed(&[DIMENSION_PROBE_TEXT.to_string()]).await?;
                probe
                    .first()
                    .map(Vec::len)
                    .ok_or_else(|| EmbedError::BackendResponse {
                        backend: "embedding".to_string(),
                        details: "dimension probe returned no vector".to_string(),
                    })
            })
            .await?;

        Ok(*dimension)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self
            .client
            .post(format!("{}/api/embed", self.endpoint))
            .json(&EmbedRequest {
                model: &self.model,
                input: texts,
            });

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(EmbedError::BackendResponse {
                backend: "embedding".to_string(),
                details: response.status().to_string(),
            });
        }

        let payload: EmbedResponse = response.json().await?;

        if payload.embeddings.len() != texts.len() {
            return Err(EmbedError::BackendResponse {
                backend: "embedding".to_string(),
                details: format!(
                    "expected {} vectors, got {}",
                    texts.len(),
                    payload.embeddings.len()
                ),
            });
        }

        Ok(payload.embeddings)
    }
}
