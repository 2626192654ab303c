use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use vecdoc_config::StoreConfig;
use vecdoc_core::{Document, Embeddings, VecDocError};
use vecdoc_embeddings::{embed_query, BatchEmbedder, BatchOptions, ProgressCallback};

use crate::filter::{matches, MetadataFilter};
use crate::query::{
    paginate, paginate_with_totals, rank, validate_query_vector, PaginatedResults, SearchOptions,
    SearchQuery, SearchResult,
};
use crate::similarity::SimilarityMethod;
use crate::table::{check_dimensions, DocumentTable, StoreStats};

/// Per-call settings for [`InMemoryVectorStore::add_documents`].
///
/// Unset batch fields fall back to the store configuration.
#[derive(Clone)]
pub struct AddOptions {
    /// Generate embeddings for documents that lack one.
    pub create_embedding: bool,
    pub batch_size: Option<usize>,
    pub batch_delay: Option<Duration>,
    pub on_progress: Option<ProgressCallback>,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            create_embedding: true,
            batch_size: None,
            batch_delay: None,
            on_progress: None,
        }
    }
}

impl fmt::Debug for AddOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddOptions")
            .field("create_embedding", &self.create_embedding)
            .field("batch_size", &self.batch_size)
            .field("batch_delay", &self.batch_delay)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

impl AddOptions {
    /// Options for documents that already carry embeddings.
    pub fn precomputed() -> Self {
        Self {
            create_embedding: false,
            ..Self::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = Some(delay);
        self
    }

    pub fn with_progress(
        mut self,
        on_progress: impl Fn(usize, usize) + Send + Sync + 'static,
    ) -> Self {
        self.on_progress = Some(Arc::new(on_progress));
        self
    }
}

/// In-memory document store with linear-scan similarity search.
///
/// Reads share the table through an `RwLock`. Every mutation also takes a
/// write gate for its whole duration, including any embedding calls, so a
/// batch's duplicate and dimension checks stay valid until its writes land.
pub struct InMemoryVectorStore {
    table: RwLock<DocumentTable>,
    write_gate: Mutex<()>,
    config: StoreConfig,
    embeddings: Option<Arc<dyn Embeddings>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(DocumentTable::new()),
            write_gate: Mutex::new(()),
            config: StoreConfig::default(),
            embeddings: None,
        }
    }

    /// Build a store from a validated configuration.
    pub fn with_config(config: StoreConfig) -> Result<Self, VecDocError> {
        config.validate()?;
        let table = match config.dimension {
            Some(dimension) => DocumentTable::with_dimension(dimension),
            None => DocumentTable::new(),
        };
        Ok(Self {
            table: RwLock::new(table),
            write_gate: Mutex::new(()),
            config,
            embeddings: None,
        })
    }

    /// Attach the provider used to embed document content and text queries.
    pub fn with_embeddings(mut self, embeddings: Arc<dyn Embeddings>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn embedding_model(&self) -> &str {
        &self.config.embedding_model
    }

    pub fn set_embedding_model(&mut self, model: impl Into<String>) -> Result<(), VecDocError> {
        let model = model.into();
        if model.trim().is_empty() {
            return Err(VecDocError::Config(
                "embedding model must not be empty".to_string(),
            ));
        }
        self.config.embedding_model = model;
        Ok(())
    }

    pub fn batch_size(&self) -> usize {
        self.config.batch_size
    }

    pub fn set_batch_size(&mut self, batch_size: usize) -> Result<(), VecDocError> {
        if batch_size == 0 {
            return Err(VecDocError::Config(
                "batch size must be at least 1".to_string(),
            ));
        }
        self.config.batch_size = batch_size;
        Ok(())
    }

    pub fn batch_delay(&self) -> Duration {
        self.config.batch_delay()
    }

    pub fn set_batch_delay(&mut self, delay: Duration) {
        self.config.batch_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    }

    /// Store one document, generating its embedding from `content` if needed.
    ///
    /// An existing document with the same id is overwritten.
    pub async fn add_document(
        &self,
        mut doc: Document,
        options: AddOptions,
    ) -> Result<String, VecDocError> {
        let _gate = self.write_gate.lock().await;

        if doc.is_pending() && options.create_embedding {
            if doc.id.is_empty() {
                return Err(VecDocError::Validation(
                    "document id must not be empty".to_string(),
                ));
            }
            require_content(&doc, 0)?;
            let provider = self.provider()?;
            let batch = BatchOptions {
                batch_size: 1,
                ..self.batch_options(&options)
            };
            let mut vectors = BatchEmbedder::new(provider, &self.config.embedding_model, batch)
                .embed_all(&[doc.content.as_str()])
                .await?;
            doc.embedding = vectors.pop();
        }

        let id = doc.id.clone();
        self.table.write().await.insert(doc)?;
        tracing::debug!(%id, "document added");
        Ok(id)
    }

    /// Store a batch of documents, generating missing embeddings in batches.
    ///
    /// The batch is checked up front: ids must be non-empty, unique within
    /// the batch and absent from the store, and every document must either
    /// carry a valid embedding or (with `create_embedding`) non-empty content.
    /// Any failure leaves the store exactly as it was. Returns the stored ids
    /// in input order.
    pub async fn add_documents(
        &self,
        mut docs: Vec<Document>,
        options: AddOptions,
    ) -> Result<Vec<String>, VecDocError> {
        let _gate = self.write_gate.lock().await;
        if docs.is_empty() {
            return Ok(Vec::new());
        }

        let table_dimension = {
            let table = self.table.read().await;
            self.precheck_batch(&table, &docs, options.create_embedding)?;
            table.dimension()
        };

        let pending: Vec<usize> = docs
            .iter()
            .enumerate()
            .filter(|(_, doc)| doc.is_pending())
            .map(|(i, _)| i)
            .collect();

        if !pending.is_empty() {
            let provider = self.provider()?;
            let texts: Vec<&str> = pending.iter().map(|&i| docs[i].content.as_str()).collect();
            let vectors = BatchEmbedder::new(
                provider,
                &self.config.embedding_model,
                self.batch_options(&options),
            )
            .with_progress(options.on_progress.clone())
            .embed_all(&texts)
            .await?;

            if let (Some(expected), Some(first)) = (table_dimension, vectors.first()) {
                if first.len() != expected {
                    return Err(VecDocError::DimensionMismatch {
                        expected,
                        actual: first.len(),
                    });
                }
            }

            for (&i, vector) in pending.iter().zip(vectors) {
                docs[i].embedding = Some(vector);
            }
        }

        check_dimensions(table_dimension, &docs)?;
        self.write_all(docs).await
    }

    /// Replace a stored document, keeping its `created_at`.
    ///
    /// Returns `Ok(false)` when no document has this id.
    pub async fn update_document(&self, doc: Document) -> Result<bool, VecDocError> {
        let _gate = self.write_gate.lock().await;
        self.table.write().await.update(doc)
    }

    /// Returns `false` when no document has this id.
    pub async fn remove_document(&self, id: &str) -> bool {
        let _gate = self.write_gate.lock().await;
        self.table.write().await.remove(id)
    }

    pub async fn get_document(&self, id: &str) -> Option<Document> {
        self.table.read().await.get(id).cloned()
    }

    pub async fn has_document(&self, id: &str) -> bool {
        self.table.read().await.contains(id)
    }

    /// All documents in insertion order.
    pub async fn get_all_documents(&self) -> Vec<Document> {
        self.table.read().await.iter().cloned().collect()
    }

    /// Documents whose metadata equals every entry of `filter`, in insertion order.
    pub async fn get_documents_by_metadata(&self, filter: &MetadataFilter) -> Vec<Document> {
        self.table
            .read()
            .await
            .iter()
            .filter(|doc| matches(doc, filter))
            .cloned()
            .collect()
    }

    /// Remove everything. The embedding dimension is unset again unless it
    /// was declared in the configuration.
    pub async fn clear(&self) {
        let _gate = self.write_gate.lock().await;
        self.table.write().await.clear();
        tracing::debug!("store cleared");
    }

    pub async fn size(&self) -> usize {
        self.table.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.table.read().await.is_empty()
    }

    pub async fn get_embedding_dimensions(&self) -> Option<usize> {
        self.table.read().await.dimension()
    }

    pub async fn get_stats(&self) -> StoreStats {
        self.table.read().await.stats()
    }

    /// Rank stored documents against a vector or a text query.
    pub async fn search(
        &self,
        query: impl Into<SearchQuery>,
        options: SearchOptions,
    ) -> Result<Vec<SearchResult>, VecDocError> {
        let ranked = self.ranked(query.into(), &options).await?;
        Ok(paginate(ranked, &options))
    }

    /// Same as [`search`](Self::search), with page totals.
    pub async fn search_with_pagination(
        &self,
        query: impl Into<SearchQuery>,
        options: SearchOptions,
    ) -> Result<PaginatedResults, VecDocError> {
        let ranked = self.ranked(query.into(), &options).await?;
        Ok(paginate_with_totals(ranked, &options))
    }

    /// The single best match, if any document scores at or above zero.
    pub async fn find_most_similar(
        &self,
        query: impl Into<SearchQuery>,
        method: SimilarityMethod,
    ) -> Result<Option<SearchResult>, VecDocError> {
        let options = SearchOptions::new().with_method(method).with_limit(1);
        let mut results = self.search(query, options).await?;
        Ok(results.pop())
    }

    async fn ranked(
        &self,
        query: SearchQuery,
        options: &SearchOptions,
    ) -> Result<Vec<SearchResult>, VecDocError> {
        options.validate()?;
        let vector = self.resolve_query(query).await?;

        let table = self.table.read().await;
        if table.is_empty() {
            return Ok(Vec::new());
        }
        Ok(rank(&table, &vector, options))
    }

    async fn resolve_query(&self, query: SearchQuery) -> Result<Vec<f64>, VecDocError> {
        let vector = match query {
            SearchQuery::Vector(vector) => vector,
            SearchQuery::Text(text) => {
                if text.trim().is_empty() {
                    return Err(VecDocError::InvalidQuery(
                        "query text must not be empty".to_string(),
                    ));
                }
                let provider = self.provider()?;
                let embed = embed_query(provider, &text, &self.config.embedding_model);
                match self.config.embed_timeout() {
                    Some(limit) => tokio::time::timeout(limit, embed).await.map_err(|_| {
                        VecDocError::Timeout(format!(
                            "query embedding did not finish within {}ms",
                            limit.as_millis()
                        ))
                    })??,
                    None => embed.await?,
                }
            }
        };
        validate_query_vector(&vector)?;
        Ok(vector)
    }

    fn provider(&self) -> Result<&dyn Embeddings, VecDocError> {
        self.embeddings
            .as_deref()
            .ok_or_else(|| VecDocError::Config("no embedding provider configured".to_string()))
    }

    fn batch_options(&self, options: &AddOptions) -> BatchOptions {
        BatchOptions {
            batch_size: options.batch_size.unwrap_or(self.config.batch_size),
            batch_delay: options.batch_delay.unwrap_or_else(|| self.config.batch_delay()),
            timeout: self.config.embed_timeout(),
            max_retries: self.config.max_retries,
        }
    }

    /// Checks that need no provider call.
    fn precheck_batch(
        &self,
        table: &DocumentTable,
        docs: &[Document],
        create_embedding: bool,
    ) -> Result<(), VecDocError> {
        let mut seen: HashMap<&str, usize> = HashMap::with_capacity(docs.len());
        for (i, doc) in docs.iter().enumerate() {
            if doc.id.is_empty() {
                return Err(VecDocError::Validation(format!(
                    "document at index {i} has an empty id"
                )));
            }
            if let Some(first) = seen.insert(doc.id.as_str(), i) {
                return Err(VecDocError::DuplicateId(format!(
                    "'{}' appears at index {first} and index {i}",
                    doc.id
                )));
            }
            if table.contains(&doc.id) {
                return Err(VecDocError::DuplicateId(format!(
                    "'{}' already exists in the store",
                    doc.id
                )));
            }
            if doc.is_pending() && create_embedding {
                require_content(doc, i)?;
            } else {
                DocumentTable::validate(doc)?;
            }
        }

        check_dimensions(table.dimension(), docs.iter().filter(|doc| !doc.is_pending()))?;

        if create_embedding && docs.iter().any(Document::is_pending) {
            self.provider()?;
        }
        Ok(())
    }

    /// Insert every document, undoing this call's inserts if one fails.
    async fn write_all(&self, docs: Vec<Document>) -> Result<Vec<String>, VecDocError> {
        let mut table = self.table.write().await;
        let mut written: Vec<String> = Vec::with_capacity(docs.len());

        for doc in docs {
            let id = doc.id.clone();
            if let Err(e) = table.insert(doc) {
                tracing::warn!(
                    %id,
                    rolled_back = written.len(),
                    "batch write failed, rolling back: {e}"
                );
                for written_id in &written {
                    table.remove(written_id);
                }
                return Err(e);
            }
            written.push(id);
        }

        tracing::debug!(count = written.len(), "documents added");
        Ok(written)
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn require_content(doc: &Document, index: usize) -> Result<(), VecDocError> {
    if doc.content.trim().is_empty() {
        return Err(VecDocError::Validation(format!(
            "document '{}' at index {index} has no embedding and no content to embed",
            doc.id
        )));
    }
    Ok(())
}
