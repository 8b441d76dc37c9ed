use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ocr extraction failed: {0}")]
    OcrFailed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("embedding failed: {0}")]
    Embed(#[from] EmbedError),

    #[error("vector dimension {actual} does not match index dimension {expected}")]
    Dimension { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum StudyError {
    #[error("llm endpoint not configured: {0}")]
    NotConfigured(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("could not parse model output: {0}")]
    MalformedOutput(String),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
