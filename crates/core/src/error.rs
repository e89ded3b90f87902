use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("embedding dimension {actual} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("text generation failed: {0}")]
    Generation(String),

    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid request: {0}")]
    Request(String),
}
