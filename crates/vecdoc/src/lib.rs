//! vecdoc: an in-process store for documents annotated with embeddings.
//!
//! This crate re-exports the vecdoc sub-crates for single-import usage.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `default` | `vectorstores` |
//! | `config` | `StoreConfig` and multi-format loading |
//! | `embeddings` | `BatchEmbedder`, `FakeEmbeddings`, response ordering |
//! | `vectorstores` | `config` + `embeddings` + `InMemoryVectorStore` |
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vecdoc::core::Document;
//! use vecdoc::embeddings::FakeEmbeddings;
//! use vecdoc::vectorstores::{AddOptions, InMemoryVectorStore, SearchOptions};
//!
//! let store = InMemoryVectorStore::new().with_embeddings(Arc::new(FakeEmbeddings::new(8)));
//! store.add_documents(vec![Document::new("1", "hello")], AddOptions::default()).await?;
//! let hits = store.search("hello", SearchOptions::new()).await?;
//! ```

/// Core types: Document, MetadataValue, Embeddings, VecDocError. Always available.
pub use vecdoc_core as core;

/// Store configuration: StoreConfig, ConfigFormat, file discovery.
#[cfg(feature = "config")]
pub use vecdoc_config as config;

/// Embedding helpers: BatchEmbedder, FakeEmbeddings, sort_by_index.
#[cfg(feature = "embeddings")]
pub use vecdoc_embeddings as embeddings;

/// The document store: InMemoryVectorStore, DocumentTable, search types.
#[cfg(feature = "vectorstores")]
pub use vecdoc_vectorstores as vectorstores;
