//! # Collections and Queries
//!
//! ## Collection Layout
//! ```text
//! artifacts/
//! └── {namespace}/            ◄── one tenant / app id
//!     └── public/
//!         └── data/
//!             ├── machines/   ◄── Terminal documents
//!             ├── tokens/     ◄── Token documents (id = code)
//!             └── sales/      ◄── Sale documents
//! ```
//!
//! Queries are deliberately small: equality filters and an optional limit.
//! The store does not order results; a limited query returns *some* window
//! of matching documents and the caller sorts it.

use std::fmt;

use serde_json::Value;

use crate::document::Document;

// =============================================================================
// Collections
// =============================================================================

/// The three collections Tollgate works with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Machines,
    Tokens,
    Sales,
}

impl Collection {
    /// Last path segment of the collection.
    pub const fn name(&self) -> &'static str {
        match self {
            Collection::Machines => "machines",
            Collection::Tokens => "tokens",
            Collection::Sales => "sales",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A collection inside one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    namespace: String,
    collection: Collection,
}

impl CollectionPath {
    pub fn new(namespace: impl Into<String>, collection: Collection) -> Self {
        Self {
            namespace: namespace.into(),
            collection,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Full slash-separated path, e.g. `artifacts/app/public/data/tokens`.
    pub fn path(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "artifacts/{}/public/data/{}",
            self.namespace,
            self.collection.name()
        )
    }
}

// =============================================================================
// Query
// =============================================================================

/// Equality filter on one top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    /// A missing field never matches.
    pub fn matches(&self, document: &Document) -> bool {
        document.get(&self.field) == Some(&self.value)
    }
}

/// A live or one-shot query over one collection.
///
/// ## Example
/// ```rust
/// use tollgate_store::{Collection, CollectionPath, Query};
///
/// let query = Query::new(CollectionPath::new("app", Collection::Tokens))
///     .where_eq("isSold", false)
///     .limit(200);
///
/// assert_eq!(query.limit, Some(200));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: CollectionPath,
    pub filters: Vec<Filter>,
    pub limit: Option<usize>,
}

impl Query {
    /// All documents of a collection.
    pub fn new(collection: CollectionPath) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            limit: None,
        }
    }

    /// Adds an equality filter.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Caps the number of documents returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if the document passes every filter.
    pub fn matches(&self, document: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(document))
    }
}

/// One push from a live query: the complete current result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySnapshot {
    pub documents: Vec<Document>,
}

impl QuerySnapshot {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_collection_path_layout() {
        let path = CollectionPath::new("default-app-id", Collection::Machines);
        assert_eq!(path.path(), "artifacts/default-app-id/public/data/machines");
    }

    #[test]
    fn test_filter_matching() {
        let query = Query::new(CollectionPath::new("app", Collection::Tokens)).where_eq("isSold", false);

        let mut fields = serde_json::Map::new();
        fields.insert("isSold".into(), json!(false));
        assert!(query.matches(&Document::new("a", fields.clone())));

        fields.insert("isSold".into(), json!(true));
        assert!(!query.matches(&Document::new("b", fields)));

        assert!(!query.matches(&Document::new("c", serde_json::Map::new())));
    }
}
