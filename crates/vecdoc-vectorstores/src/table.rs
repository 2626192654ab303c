use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use vecdoc_core::{Document, VecDocError};

/// Fixed per-document overhead in the memory estimate, in bytes.
const DOCUMENT_OVERHEAD_BYTES: usize = 100;

/// Snapshot of a table's size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub count: usize,
    pub dimension: Option<usize>,
    /// Rough estimate: 8 bytes per embedding value, 2 bytes per UTF-16 code
    /// unit of content and serialized metadata, plus a fixed overhead per
    /// document. Characters outside the Basic Multilingual Plane count twice.
    pub memory_usage_bytes: usize,
}

/// Documents keyed by id, all sharing one embedding dimension.
///
/// Iteration follows insertion order; overwriting an id keeps its original
/// position. The dimension comes from the declared value if one was given,
/// otherwise from the first stored document.
#[derive(Debug, Default)]
pub struct DocumentTable {
    documents: HashMap<String, Document>,
    order: Vec<String>,
    declared_dimension: Option<usize>,
}

impl DocumentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table that only accepts embeddings of length `dimension`, even when empty.
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            declared_dimension: Some(dimension),
            ..Self::default()
        }
    }

    /// Check a document's own shape: non-empty id, present, non-empty, finite embedding.
    pub fn validate(doc: &Document) -> Result<(), VecDocError> {
        if doc.id.is_empty() {
            return Err(VecDocError::Validation(
                "document id must not be empty".to_string(),
            ));
        }
        let embedding = match &doc.embedding {
            Some(e) if !e.is_empty() => e,
            _ => {
                return Err(VecDocError::Validation(format!(
                    "document '{}' has no embedding",
                    doc.id
                )))
            }
        };
        if let Some(pos) = embedding.iter().position(|v| !v.is_finite()) {
            return Err(VecDocError::Validation(format!(
                "document '{}' has a non-finite embedding value at position {pos}",
                doc.id
            )));
        }
        Ok(())
    }

    /// Fail unless `len` matches the table dimension (any length is fine when unset).
    pub fn check_dimension(&self, len: usize) -> Result<(), VecDocError> {
        match self.dimension() {
            Some(expected) if expected != len => Err(VecDocError::DimensionMismatch {
                expected,
                actual: len,
            }),
            _ => Ok(()),
        }
    }

    /// Insert or overwrite a document.
    ///
    /// `created_at` is kept from the incoming document, else from the
    /// document being overwritten, else set to now. `updated_at` is always now.
    pub fn insert(&mut self, mut doc: Document) -> Result<(), VecDocError> {
        Self::validate(&doc)?;
        self.check_dimension(doc.dimension())?;

        let now = Utc::now();
        let previous_created = self.documents.get(&doc.id).and_then(|d| d.created_at);
        doc.created_at = doc.created_at.or(previous_created).or(Some(now));
        doc.updated_at = Some(now);

        if !self.documents.contains_key(&doc.id) {
            self.order.push(doc.id.clone());
        }
        self.documents.insert(doc.id.clone(), doc);
        Ok(())
    }

    /// Validate every document, including dimension agreement, then insert them all.
    ///
    /// Nothing is written unless the whole batch is valid.
    pub fn insert_many(&mut self, docs: Vec<Document>) -> Result<(), VecDocError> {
        check_dimensions(self.dimension(), &docs)?;
        for doc in docs {
            self.insert(doc)?;
        }
        Ok(())
    }

    /// Replace an existing document, preserving its `created_at`.
    ///
    /// Returns `Ok(false)` when the id is not present.
    pub fn update(&mut self, mut doc: Document) -> Result<bool, VecDocError> {
        let Some(existing) = self.documents.get(&doc.id) else {
            return Ok(false);
        };
        Self::validate(&doc)?;
        self.check_dimension(doc.dimension())?;

        doc.created_at = existing.created_at;
        doc.updated_at = Some(Utc::now());
        self.documents.insert(doc.id.clone(), doc);
        Ok(true)
    }

    pub fn remove(&mut self, id: &str) -> bool {
        if self.documents.remove(id).is_none() {
            return false;
        }
        self.order.retain(|existing| existing != id);
        true
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.documents.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.documents.contains_key(id)
    }

    /// The embedding length every stored document shares, if known.
    pub fn dimension(&self) -> Option<usize> {
        self.declared_dimension.or_else(|| {
            self.order
                .first()
                .and_then(|id| self.documents.get(id))
                .map(Document::dimension)
        })
    }

    /// Remove every document. An inferred dimension is forgotten; a declared one stays.
    pub fn clear(&mut self) {
        self.documents.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Documents in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> + '_ {
        self.order.iter().filter_map(|id| self.documents.get(id))
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            count: self.len(),
            dimension: self.dimension(),
            memory_usage_bytes: self.iter().map(estimate_bytes).sum(),
        }
    }
}

/// Validate each document and check they all share `expected`, or the
/// first document's length when `expected` is unset.
pub(crate) fn check_dimensions<'a>(
    expected: Option<usize>,
    docs: impl IntoIterator<Item = &'a Document>,
) -> Result<(), VecDocError> {
    let mut expected = expected;
    for doc in docs {
        DocumentTable::validate(doc)?;
        let actual = doc.dimension();
        match expected {
            Some(dim) if dim != actual => {
                return Err(VecDocError::DimensionMismatch {
                    expected: dim,
                    actual,
                })
            }
            Some(_) => {}
            None => expected = Some(actual),
        }
    }
    Ok(())
}

fn estimate_bytes(doc: &Document) -> usize {
    let metadata_chars = doc
        .metadata
        .as_ref()
        .and_then(|m| serde_json::to_string(m).ok())
        .map_or(0, |s| s.encode_utf16().count());

    doc.dimension() * 8
        + doc.content.encode_utf16().count() * 2
        + metadata_chars * 2
        + DOCUMENT_OVERHEAD_BYTES
}
