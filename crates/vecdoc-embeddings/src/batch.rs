use std::sync::Arc;
use std::time::Duration;

use vecdoc_core::{Embeddings, VecDocError};

use crate::order::sort_by_index;

/// Progress callback invoked as `(processed, total)` after each batch.
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Chunking, pacing and retry settings for [`BatchEmbedder`].
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum texts sent per provider call.
    pub batch_size: usize,
    /// Pause between consecutive provider calls.
    pub batch_delay: Duration,
    /// Upper bound on a single provider call.
    pub timeout: Option<Duration>,
    /// Extra attempts per batch after a provider error or timeout.
    pub max_retries: u32,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 100,
            batch_delay: Duration::from_millis(1000),
            timeout: None,
            max_retries: 0,
        }
    }
}

/// Embeds a list of texts in provider-sized batches.
///
/// Batches run sequentially in input order. After each batch the progress
/// callback sees the cumulative count, then the embedder sleeps for
/// `batch_delay` unless that was the last batch. Any batch that still fails
/// after its retries aborts the whole run and the partial output is dropped.
pub struct BatchEmbedder<'a> {
    provider: &'a dyn Embeddings,
    model: &'a str,
    options: BatchOptions,
    on_progress: Option<ProgressCallback>,
}

impl<'a> BatchEmbedder<'a> {
    pub fn new(provider: &'a dyn Embeddings, model: &'a str, options: BatchOptions) -> Self {
        Self {
            provider,
            model,
            options,
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, on_progress: Option<ProgressCallback>) -> Self {
        self.on_progress = on_progress;
        self
    }

    /// Embed all texts, returning vectors in input order.
    ///
    /// The returned vectors are non-empty, finite and share one dimension.
    pub async fn embed_all(&self, texts: &[&str]) -> Result<Vec<Vec<f64>>, VecDocError> {
        if self.options.batch_size == 0 {
            return Err(VecDocError::Config("batch size must be at least 1".into()));
        }

        let total = texts.len();
        let batch_count = total.div_ceil(self.options.batch_size);
        let mut vectors = Vec::with_capacity(total);

        for (batch_index, chunk) in texts.chunks(self.options.batch_size).enumerate() {
            let batch = self.embed_batch(chunk, batch_index).await?;
            vectors.extend(batch);

            tracing::debug!(
                batch = batch_index + 1,
                batches = batch_count,
                processed = vectors.len(),
                total,
                "embedded batch"
            );
            if let Some(on_progress) = &self.on_progress {
                on_progress(vectors.len(), total);
            }

            let is_last = batch_index + 1 == batch_count;
            if !is_last && !self.options.batch_delay.is_zero() {
                tokio::time::sleep(self.options.batch_delay).await;
            }
        }

        check_consistent(&vectors)?;
        Ok(vectors)
    }

    async fn embed_batch(
        &self,
        chunk: &[&str],
        batch_index: usize,
    ) -> Result<Vec<Vec<f64>>, VecDocError> {
        let mut attempt: u32 = 0;
        loop {
            match self.call_provider(chunk).await {
                Ok(vectors) => return Ok(vectors),
                Err(e) if e.is_retryable() && attempt < self.options.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        batch = batch_index + 1,
                        attempt,
                        max_retries = self.options.max_retries,
                        "embedding batch failed, retrying: {e}"
                    );
                    if !self.options.batch_delay.is_zero() {
                        tokio::time::sleep(self.options.batch_delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn call_provider(&self, chunk: &[&str]) -> Result<Vec<Vec<f64>>, VecDocError> {
        let items = match self.options.timeout {
            Some(limit) => tokio::time::timeout(limit, self.provider.embed(chunk, self.model))
                .await
                .map_err(|_| {
                    VecDocError::Timeout(format!(
                        "embedding provider did not answer within {}ms",
                        limit.as_millis()
                    ))
                })??,
            None => self.provider.embed(chunk, self.model).await?,
        };
        sort_by_index(items, chunk.len())
    }
}

/// Check that generated vectors are usable and agree on one dimension.
fn check_consistent(vectors: &[Vec<f64>]) -> Result<(), VecDocError> {
    let Some(first) = vectors.first() else {
        return Ok(());
    };
    let dimension = first.len();

    for (i, vector) in vectors.iter().enumerate() {
        if vector.is_empty() {
            return Err(VecDocError::Provider(format!(
                "provider returned an empty embedding at position {i}"
            )));
        }
        if vector.len() != dimension {
            return Err(VecDocError::Provider(format!(
                "provider returned inconsistent dimensions: ({}) at position {i}, ({dimension}) at position 0",
                vector.len()
            )));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(VecDocError::Provider(format!(
                "provider returned non-finite values at position {i}"
            )));
        }
    }
    Ok(())
}
