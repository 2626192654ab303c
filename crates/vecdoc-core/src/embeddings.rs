use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::VecDocError;

/// One vector returned by an embedding provider.
///
/// Providers are not required to answer in input order; `index` points back
/// at the position of the source text in the request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingItem {
    pub embedding: Vec<f64>,
    pub index: usize,
}

impl EmbeddingItem {
    pub fn new(embedding: Vec<f64>, index: usize) -> Self {
        Self { embedding, index }
    }
}

/// An embedding provider.
///
/// Implementations turn a batch of texts into vectors using the named model.
/// Callers must re-order the returned items by [`EmbeddingItem::index`].
#[async_trait]
pub trait Embeddings: Send + Sync {
    async fn embed(&self, input: &[&str], model: &str)
        -> Result<Vec<EmbeddingItem>, VecDocError>;
}
