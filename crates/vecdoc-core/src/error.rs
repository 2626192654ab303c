use thiserror::Error;

/// Errors produced by the document store and its embedding pipeline.
#[derive(Debug, Error)]
pub enum VecDocError {
    /// A malformed document: missing id, empty or absent embedding, non-finite values.
    #[error("validation error: {0}")]
    Validation(String),

    /// An embedding length disagrees with the store-wide dimension.
    #[error("dimension mismatch: embedding has dimension ({actual}) but store expects ({expected})")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An id is repeated within a batch or collides with a stored document.
    #[error("duplicate id: {0}")]
    DuplicateId(String),

    /// The query could not be resolved to a usable vector.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The embedding provider failed or returned an inconsistent response.
    #[error("embedding provider error: {0}")]
    Provider(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl VecDocError {
    /// True for errors describing malformed caller input (documents or queries).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidQuery(_))
    }

    /// True for failures of a single provider call that may succeed when retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider(_) | Self::Timeout(_))
    }
}
