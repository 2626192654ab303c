use vecdoc_core::{Document, Metadata};

/// Equality filter over document metadata: every entry must match.
pub type MetadataFilter = Metadata;

/// True when `doc` satisfies every `(key, value)` pair in `filter`.
///
/// An empty filter matches everything. For a non-empty filter a document
/// without metadata never matches, and a missing key fails the match.
pub fn matches(doc: &Document, filter: &MetadataFilter) -> bool {
    if filter.is_empty() {
        return true;
    }
    let Some(metadata) = &doc.metadata else {
        return false;
    };
    filter
        .iter()
        .all(|(key, expected)| metadata.get(key) == Some(expected))
}
