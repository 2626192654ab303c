use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use vecdoc_config::StoreConfig;
use vecdoc_core::{Document, EmbeddingItem, Embeddings, VecDocError};
use vecdoc_embeddings::FakeEmbeddings;
use vecdoc_vectorstores::{AddOptions, InMemoryVectorStore};

fn pending(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| Document::new(format!("doc{i}"), format!("text number {i}")))
        .collect()
}

fn no_delay() -> AddOptions {
    AddOptions::default().with_batch_delay(Duration::ZERO)
}

/// Fake provider with scripted failures, fixed output dimension and latency.
struct TestEmbeddings {
    dimensions: usize,
    fail_on_call: Option<usize>,
    latency: Duration,
    calls: AtomicUsize,
}

impl TestEmbeddings {
    fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            fail_on_call: None,
            latency: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embeddings for TestEmbeddings {
    async fn embed(
        &self,
        input: &[&str],
        _model: &str,
    ) -> Result<Vec<EmbeddingItem>, VecDocError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail_on_call == Some(call) {
            return Err(VecDocError::Provider(format!("rate limited on call {call}")));
        }
        Ok(input
            .iter()
            .enumerate()
            .map(|(i, _)| EmbeddingItem::new(vec![1.0; self.dimensions], i))
            .collect())
    }
}

#[tokio::test(start_paused = true)]
async fn fifteen_documents_in_three_batches() {
    let embeddings = Arc::new(FakeEmbeddings::new(4));
    let store = InMemoryVectorStore::new().with_embeddings(embeddings.clone());

    let progress = Arc::new(Mutex::new(Vec::new()));
    let sink = progress.clone();
    let options = AddOptions::default()
        .with_batch_size(5)
        .with_batch_delay(Duration::from_millis(100))
        .with_progress(move |processed, total| sink.lock().unwrap().push((processed, total)));

    let start = Instant::now();
    let ids = store.add_documents(pending(15), options).await.unwrap();
    let elapsed = start.elapsed();

    assert_eq!(ids.len(), 15);
    assert_eq!(store.size().await, 15);
    assert_eq!(embeddings.call_count(), 3);
    assert_eq!(embeddings.batch_sizes(), vec![5, 5, 5]);
    assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(300), "{elapsed:?}");
    assert_eq!(*progress.lock().unwrap(), vec![(5, 15), (10, 15), (15, 15)]);
}

#[tokio::test]
async fn generated_embeddings_land_on_their_documents() {
    let embeddings = Arc::new(FakeEmbeddings::new(6));
    let store = InMemoryVectorStore::new().with_embeddings(embeddings.clone());

    let ids = store
        .add_documents(pending(7), no_delay().with_batch_size(3))
        .await
        .unwrap();
    assert_eq!(ids, (0..7).map(|i| format!("doc{i}")).collect::<Vec<_>>());

    for i in 0..7 {
        let stored = store.get_document(&format!("doc{i}")).await.unwrap();
        assert_eq!(
            stored.embedding.unwrap(),
            embeddings.vector_for(&format!("text number {i}"))
        );
    }
}

#[tokio::test]
async fn store_config_supplies_batch_defaults() {
    let embeddings = Arc::new(FakeEmbeddings::new(3));
    let config = StoreConfig::default()
        .with_batch_size(4)
        .with_batch_delay(Duration::ZERO);
    let store = InMemoryVectorStore::with_config(config)
        .unwrap()
        .with_embeddings(embeddings.clone());

    store
        .add_documents(pending(10), AddOptions::default())
        .await
        .unwrap();
    assert_eq!(embeddings.batch_sizes(), vec![4, 4, 2]);
}

#[tokio::test]
async fn duplicate_ids_in_batch_are_rejected() {
    let embeddings = Arc::new(FakeEmbeddings::new(3));
    let store = InMemoryVectorStore::new().with_embeddings(embeddings.clone());

    let docs = vec![
        Document::new("doc1", "first"),
        Document::new("doc1", "second"),
    ];
    let err = store.add_documents(docs, no_delay()).await.unwrap_err();

    assert!(matches!(err, VecDocError::DuplicateId(_)));
    let msg = err.to_string();
    assert!(msg.contains("index 0") && msg.contains("index 1"), "{msg}");
    assert!(store.is_empty().await);
    assert_eq!(embeddings.call_count(), 0);
}

#[tokio::test]
async fn ids_already_stored_are_rejected() {
    let embeddings = Arc::new(FakeEmbeddings::new(3));
    let store = InMemoryVectorStore::new().with_embeddings(embeddings.clone());
    store
        .add_document(Document::new("doc1", "existing"), no_delay())
        .await
        .unwrap();
    let before = store.get_document("doc1").await.unwrap();

    let err = store
        .add_documents(
            vec![Document::new("doc0", "new"), Document::new("doc1", "clash")],
            no_delay(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, VecDocError::DuplicateId(_)));
    assert_eq!(store.size().await, 1);
    assert_eq!(store.get_document("doc1").await.unwrap(), before);
    assert_eq!(embeddings.call_count(), 1);
}

#[tokio::test]
async fn empty_id_is_rejected() {
    let store = InMemoryVectorStore::new().with_embeddings(Arc::new(FakeEmbeddings::new(3)));
    let err = store
        .add_documents(vec![Document::new("", "text")], no_delay())
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn provider_failure_leaves_store_untouched() {
    let embeddings = Arc::new(TestEmbeddings::new(3).failing_on(2));
    let store = InMemoryVectorStore::new().with_embeddings(embeddings.clone());

    let mut docs = vec![Document::with_embedding("ready", "x", vec![0.0, 1.0, 0.0])];
    docs.extend(pending(6));

    let err = store
        .add_documents(docs, no_delay().with_batch_size(2))
        .await
        .unwrap_err();

    assert!(matches!(err, VecDocError::Provider(_)));
    assert_eq!(embeddings.calls(), 2);
    assert!(store.is_empty().await);
    assert_eq!(store.get_embedding_dimensions().await, None);
}

#[tokio::test]
async fn configured_retries_recover_a_failed_batch() {
    let embeddings = Arc::new(TestEmbeddings::new(3).failing_on(1));
    let config = StoreConfig::default()
        .with_batch_delay(Duration::ZERO)
        .with_max_retries(1);
    let store = InMemoryVectorStore::with_config(config)
        .unwrap()
        .with_embeddings(embeddings.clone());

    let ids = store
        .add_documents(pending(2), AddOptions::default())
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(embeddings.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn provider_timeout_aborts() {
    let embeddings = Arc::new(TestEmbeddings::new(3).with_latency(Duration::from_secs(60)));
    let config = StoreConfig::default().with_embed_timeout(Duration::from_secs(5));
    let store = InMemoryVectorStore::with_config(config)
        .unwrap()
        .with_embeddings(embeddings);

    let err = store
        .add_documents(pending(3), AddOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, VecDocError::Timeout(_)), "{err}");
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn generated_dimension_must_match_store() {
    let embeddings = Arc::new(TestEmbeddings::new(4));
    let store = InMemoryVectorStore::new().with_embeddings(embeddings.clone());
    store
        .add_document(
            Document::with_embedding("base", "x", vec![1.0, 0.0]),
            AddOptions::precomputed(),
        )
        .await
        .unwrap();

    let err = store.add_documents(pending(3), no_delay()).await.unwrap_err();
    assert!(matches!(
        err,
        VecDocError::DimensionMismatch {
            expected: 2,
            actual: 4
        }
    ));
    assert_eq!(store.size().await, 1);
}

#[tokio::test]
async fn generated_dimension_must_match_passthrough_documents() {
    let embeddings = Arc::new(TestEmbeddings::new(4));
    let store = InMemoryVectorStore::new().with_embeddings(embeddings.clone());

    let mut docs = vec![Document::with_embedding("ready", "x", vec![1.0, 0.0])];
    docs.extend(pending(2));

    let err = store.add_documents(docs, no_delay()).await.unwrap_err();
    assert!(matches!(err, VecDocError::DimensionMismatch { .. }));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn passthrough_dimensions_checked_before_provider_call() {
    let embeddings = Arc::new(TestEmbeddings::new(2));
    let store = InMemoryVectorStore::new().with_embeddings(embeddings.clone());

    let mut docs = vec![
        Document::with_embedding("a", "x", vec![1.0, 0.0]),
        Document::with_embedding("b", "y", vec![1.0, 0.0, 0.0]),
    ];
    docs.extend(pending(2));

    let err = store.add_documents(docs, no_delay()).await.unwrap_err();
    assert!(matches!(err, VecDocError::DimensionMismatch { .. }));
    assert_eq!(embeddings.calls(), 0);
}

#[tokio::test]
async fn precomputed_mode_requires_embeddings() {
    let embeddings = Arc::new(FakeEmbeddings::new(3));
    let store = InMemoryVectorStore::new().with_embeddings(embeddings.clone());

    let docs = vec![
        Document::with_embedding("a", "x", vec![1.0, 0.0, 0.0]),
        Document::new("b", "needs embedding"),
    ];
    let err = store
        .add_documents(docs, AddOptions::precomputed())
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(embeddings.call_count(), 0);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn non_finite_embeddings_are_rejected() {
    let store = InMemoryVectorStore::new();
    let err = store
        .add_documents(
            vec![Document::with_embedding("a", "x", vec![1.0, f64::NAN])],
            AddOptions::precomputed(),
        )
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn pending_document_needs_content() {
    let embeddings = Arc::new(FakeEmbeddings::new(3));
    let store = InMemoryVectorStore::new().with_embeddings(embeddings.clone());

    let err = store
        .add_documents(vec![Document::new("a", "   ")], no_delay())
        .await
        .unwrap_err();
    assert!(err.is_validation());
    assert_eq!(embeddings.call_count(), 0);
}

#[tokio::test]
async fn pending_documents_need_a_provider() {
    let store = InMemoryVectorStore::new();
    let err = store
        .add_documents(pending(1), no_delay())
        .await
        .unwrap_err();
    assert!(matches!(err, VecDocError::Config(_)));
}

#[tokio::test]
async fn mixed_batch_keeps_input_order() {
    let embeddings = Arc::new(FakeEmbeddings::new(3));
    let store = InMemoryVectorStore::new().with_embeddings(embeddings.clone());

    let docs = vec![
        Document::new("p1", "pending one"),
        Document::with_embedding("r1", "ready", vec![0.1, 0.2, 0.3]),
        Document::new("p2", "pending two"),
    ];
    let ids = store.add_documents(docs, no_delay()).await.unwrap();

    assert_eq!(ids, vec!["p1", "r1", "p2"]);
    assert_eq!(embeddings.batch_sizes(), vec![2]);
    assert_eq!(
        store.get_document("r1").await.unwrap().embedding,
        Some(vec![0.1, 0.2, 0.3])
    );
    assert_eq!(
        store.get_document("p2").await.unwrap().embedding,
        Some(embeddings.vector_for("pending two"))
    );
}

#[tokio::test]
async fn add_document_embeds_and_overwrites() {
    let embeddings = Arc::new(FakeEmbeddings::new(3));
    let store = InMemoryVectorStore::new().with_embeddings(embeddings.clone());

    store
        .add_document(Document::new("a", "first"), no_delay())
        .await
        .unwrap();
    let created = store.get_document("a").await.unwrap().created_at;

    store
        .add_document(Document::new("a", "second"), no_delay())
        .await
        .unwrap();

    let stored = store.get_document("a").await.unwrap();
    assert_eq!(store.size().await, 1);
    assert_eq!(stored.content, "second");
    assert_eq!(stored.embedding, Some(embeddings.vector_for("second")));
    assert_eq!(stored.created_at, created);
}

#[tokio::test]
async fn add_document_without_embedding_in_precomputed_mode_fails() {
    let store = InMemoryVectorStore::new().with_embeddings(Arc::new(FakeEmbeddings::new(3)));
    let err = store
        .add_document(Document::new("a", "text"), AddOptions::precomputed())
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test(start_paused = true)]
async fn concurrent_batches_do_not_interleave() {
    let embeddings = Arc::new(TestEmbeddings::new(3).with_latency(Duration::from_millis(50)));
    let store = Arc::new(InMemoryVectorStore::new().with_embeddings(embeddings));

    let spawn_batch = |store: Arc<InMemoryVectorStore>| {
        tokio::spawn(async move {
            store
                .add_documents(pending(4), no_delay().with_batch_size(1))
                .await
        })
    };
    let first = spawn_batch(store.clone());
    let second = spawn_batch(store.clone());

    let outcomes = [first.await.unwrap(), second.await.unwrap()];
    let succeeded = outcomes.iter().filter(|r| r.is_ok()).count();
    let duplicates = outcomes
        .iter()
        .filter(|r| matches!(r, Err(VecDocError::DuplicateId(_))))
        .count();

    assert_eq!(succeeded, 1);
    assert_eq!(duplicates, 1);
    assert_eq!(store.size().await, 4);
}
