use std::sync::Arc;

use vecdoc::core::Document;
use vecdoc::embeddings::FakeEmbeddings;
use vecdoc::vectorstores::{AddOptions, InMemoryVectorStore, SearchOptions};

#[tokio::test]
async fn quick_start_flow() {
    let store = InMemoryVectorStore::new().with_embeddings(Arc::new(FakeEmbeddings::new(8)));
    store
        .add_documents(
            vec![Document::new("1", "hello"), Document::new("2", "bye")],
            AddOptions::default(),
        )
        .await
        .unwrap();

    let best = store
        .search("hello", SearchOptions::new().with_threshold(-1.0).with_limit(1))
        .await
        .unwrap();
    assert_eq!(best.len(), 1);
    assert_eq!(best[0].document.id, "1");
}
