use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use vecdoc_core::{EmbeddingItem, Embeddings, VecDocError};

/// Deterministic embeddings for tests.
///
/// Each text maps to a vector derived from its SHA-256 digest, so equal
/// texts always embed identically. Items are returned in reverse index order
/// to exercise callers' re-sorting.
pub struct FakeEmbeddings {
    dimensions: usize,
    calls: AtomicUsize,
    batch_sizes: Mutex<Vec<usize>>,
}

impl FakeEmbeddings {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            calls: AtomicUsize::new(0),
            batch_sizes: Mutex::new(Vec::new()),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of `embed` calls served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Input length of every call, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_sizes
            .lock()
            .map(|sizes| sizes.clone())
            .unwrap_or_default()
    }

    /// The vector this provider produces for `text`.
    pub fn vector_for(&self, text: &str) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.dimensions);
        let mut block: u32 = 0;
        while out.len() < self.dimensions {
            let mut hasher = Sha256::new();
            hasher.update(block.to_le_bytes());
            hasher.update(text.as_bytes());
            let digest = hasher.finalize();
            for byte in digest.iter().take(self.dimensions - out.len()) {
                out.push(f64::from(*byte) / 127.5 - 1.0);
            }
            block += 1;
        }
        out
    }
}

#[async_trait]
impl Embeddings for FakeEmbeddings {
    async fn embed(
        &self,
        input: &[&str],
        _model: &str,
    ) -> Result<Vec<EmbeddingItem>, VecDocError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut sizes) = self.batch_sizes.lock() {
            sizes.push(input.len());
        }

        Ok(input
            .iter()
            .enumerate()
            .rev()
            .map(|(index, text)| EmbeddingItem::new(self.vector_for(text), index))
            .collect())
    }
}
