//! In-memory document store with linear-scan similarity search.
//!
//! [`InMemoryVectorStore`] owns a [`DocumentTable`] and layers metadata
//! filtering, scoring, thresholds and pagination on top of it. Documents
//! without embeddings are embedded through an injected
//! [`Embeddings`](vecdoc_core::Embeddings) provider in paced batches.

mod filter;
mod in_memory;
mod query;
mod similarity;
mod table;

pub use filter::{matches, MetadataFilter};
pub use in_memory::{AddOptions, InMemoryVectorStore};
pub use query::{PaginatedResults, SearchOptions, SearchQuery, SearchResult};
pub use similarity::{cosine_similarity, dot_product, euclidean_similarity, SimilarityMethod};
pub use table::{DocumentTable, StoreStats};
