use crate::core::{Document, DocumentPath};
use crate::query::{Query, QueryKey};
use std::fmt;

/// What a live listener watches: one document or the result set of a query
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionTarget {
    Document(DocumentPath),
    Query(Query),
}

/// Value identity of a target; equal keys never need two listeners
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubscriptionKey {
    Document(DocumentPath),
    Query(QueryKey),
}

impl SubscriptionTarget {
    pub fn document(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Document(DocumentPath::new(collection, id))
    }

    pub fn key(&self) -> SubscriptionKey {
        match self {
            Self::Document(path) => SubscriptionKey::Document(path.clone()),
            Self::Query(query) => SubscriptionKey::Query(query.key()),
        }
    }

    pub fn collection_path(&self) -> &str {
        match self {
            Self::Document(path) => &path.collection,
            Self::Query(query) => query.collection_path(),
        }
    }
}

impl fmt::Display for SubscriptionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document(path) => write!(f, "{}", path),
            Self::Query(query) => write!(f, "{}", query),
        }
    }
}

impl From<DocumentPath> for SubscriptionTarget {
    fn from(path: DocumentPath) -> Self {
        Self::Document(path)
    }
}

impl From<Query> for SubscriptionTarget {
    fn from(query: Query) -> Self {
        Self::Query(query)
    }
}

/// Complete current result for a target, delivered on every change
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// `None` when the document does not exist
    Document(Option<Document>),
    Collection(Vec<Document>),
}

impl Snapshot {
    pub fn into_document(self) -> Option<Document> {
        match self {
            Self::Document(doc) => doc,
            Self::Collection(mut docs) => {
                if docs.is_empty() {
                    None
                } else {
                    Some(docs.swap_remove(0))
                }
            }
        }
    }

    pub fn into_documents(self) -> Vec<Document> {
        match self {
            Self::Document(doc) => doc.into_iter().collect(),
            Self::Collection(docs) => docs,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Document(doc) => usize::from(doc.is_some()),
            Self::Collection(docs) => docs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
