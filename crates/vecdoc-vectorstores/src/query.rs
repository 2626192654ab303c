use serde::Serialize;
use vecdoc_core::{Document, VecDocError};

use crate::filter::{matches, MetadataFilter};
use crate::similarity::SimilarityMethod;
use crate::table::DocumentTable;

/// What to search for: a ready vector, or text the store must embed first.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    Vector(Vec<f64>),
    Text(String),
}

impl From<Vec<f64>> for SearchQuery {
    fn from(vector: Vec<f64>) -> Self {
        Self::Vector(vector)
    }
}

impl From<&[f64]> for SearchQuery {
    fn from(vector: &[f64]) -> Self {
        Self::Vector(vector.to_vec())
    }
}

impl From<String> for SearchQuery {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for SearchQuery {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// A stored document paired with its score for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub document: Document,
    pub score: f64,
}

/// Knobs for a search.
///
/// When `page_size` is set, `page` (1-based) selects a slice of the ranked
/// results and `limit` is ignored; otherwise the first `limit` results are
/// returned.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub method: SimilarityMethod,
    pub threshold: f64,
    pub limit: usize,
    pub page: usize,
    pub page_size: Option<usize>,
    pub filter: Option<MetadataFilter>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            method: SimilarityMethod::Cosine,
            threshold: 0.0,
            limit: 10,
            page: 1,
            page_size: None,
            filter: None,
        }
    }
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: SimilarityMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub(crate) fn validate(&self) -> Result<(), VecDocError> {
        if self.page_size == Some(0) {
            return Err(VecDocError::InvalidQuery(
                "page size must be at least 1".to_string(),
            ));
        }
        if self.threshold.is_nan() {
            return Err(VecDocError::InvalidQuery(
                "threshold must be a number".to_string(),
            ));
        }
        Ok(())
    }

    /// Page size used when pagination metadata is reported.
    fn effective_page_size(&self) -> usize {
        self.page_size.unwrap_or(self.limit)
    }
}

/// One page of ranked results with totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResults {
    pub items: Vec<SearchResult>,
    pub page: usize,
    pub page_size: usize,
    pub total_results: usize,
    pub total_pages: usize,
}

/// Reject empty or non-finite query vectors.
pub(crate) fn validate_query_vector(vector: &[f64]) -> Result<(), VecDocError> {
    if vector.is_empty() {
        return Err(VecDocError::InvalidQuery(
            "query vector must not be empty".to_string(),
        ));
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(VecDocError::InvalidQuery(
            "query vector contains non-finite values".to_string(),
        ));
    }
    Ok(())
}

/// Filter, score, threshold and sort every document in `table`.
///
/// Documents that cannot be scored are skipped with a warning. Ties keep
/// insertion order.
pub(crate) fn rank(
    table: &DocumentTable,
    query: &[f64],
    options: &SearchOptions,
) -> Vec<SearchResult> {
    let mut scored: Vec<(&Document, f64)> = Vec::new();

    for doc in table.iter() {
        if let Some(filter) = &options.filter {
            if !matches(doc, filter) {
                continue;
            }
        }
        let Some(embedding) = &doc.embedding else {
            tracing::warn!(id = %doc.id, "skipping document without embedding during search");
            continue;
        };
        match options.method.score(query, embedding) {
            Ok(score) if score >= options.threshold => scored.push((doc, score)),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(id = %doc.id, "skipping document during search: {e}");
            }
        }
    }

    // Stable sort keeps encounter order for equal scores.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .map(|(doc, score)| SearchResult {
            document: doc.clone(),
            score,
        })
        .collect()
}

/// Cut the ranked list down to the requested page or limit.
pub(crate) fn paginate(ranked: Vec<SearchResult>, options: &SearchOptions) -> Vec<SearchResult> {
    match options.page_size {
        Some(page_size) => page_slice(ranked, options.page, page_size),
        None => {
            let mut ranked = ranked;
            ranked.truncate(options.limit);
            ranked
        }
    }
}

/// Like [`paginate`] but reports totals. A missing page size falls back to `limit`.
pub(crate) fn paginate_with_totals(
    ranked: Vec<SearchResult>,
    options: &SearchOptions,
) -> PaginatedResults {
    let page_size = options.effective_page_size();
    let total_results = ranked.len();
    let total_pages = if page_size == 0 {
        0
    } else {
        total_results.div_ceil(page_size)
    };

    PaginatedResults {
        items: page_slice(ranked, options.page, page_size),
        page: options.page,
        page_size,
        total_results,
        total_pages,
    }
}

/// Items `[(page - 1) * page_size, page * page_size)`; empty when out of range.
fn page_slice(ranked: Vec<SearchResult>, page: usize, page_size: usize) -> Vec<SearchResult> {
    if page == 0 {
        return Vec::new();
    }
    let start = (page - 1).saturating_mul(page_size);
    ranked.into_iter().skip(start).take(page_size).collect()
}
