mod batch;
mod fake;
mod order;

pub use batch::{BatchEmbedder, BatchOptions, ProgressCallback};
pub use fake::FakeEmbeddings;
pub use order::{embed_query, sort_by_index};

// Re-export the Embeddings trait from core (forward-declared there).
pub use vecdoc_core::{EmbeddingItem, Embeddings};
