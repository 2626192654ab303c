use vecdoc_core::{EmbeddingItem, Embeddings, VecDocError};

/// Re-order provider output by `index` and check it covers `expected` inputs.
///
/// Every index in `0..expected` must appear exactly once.
pub fn sort_by_index(
    mut items: Vec<EmbeddingItem>,
    expected: usize,
) -> Result<Vec<Vec<f64>>, VecDocError> {
    if items.len() != expected {
        return Err(VecDocError::Provider(format!(
            "expected {expected} embeddings, provider returned {}",
            items.len()
        )));
    }

    items.sort_by_key(|item| item.index);

    for (position, item) in items.iter().enumerate() {
        if item.index != position {
            return Err(VecDocError::Provider(format!(
                "provider returned index {} where {position} was expected",
                item.index
            )));
        }
    }

    Ok(items.into_iter().map(|item| item.embedding).collect())
}

/// Embed a single query text with one provider call.
pub async fn embed_query(
    provider: &dyn Embeddings,
    text: &str,
    model: &str,
) -> Result<Vec<f64>, VecDocError> {
    let items = provider.embed(&[text], model).await?;
    let mut vectors = sort_by_index(items, 1)?;
    vectors
        .pop()
        .ok_or_else(|| VecDocError::Provider("empty response".to_string()))
}
