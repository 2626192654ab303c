//! Core types shared by every vecdoc crate.
//!
//! The [`Embeddings`] trait is declared here so that the store, the batch
//! orchestrator and provider adapters can all name it without depending on
//! each other.

mod document;
mod embeddings;
mod error;

pub use document::{Document, Metadata, MetadataValue};
pub use embeddings::{EmbeddingItem, Embeddings};
pub use error::VecDocError;
