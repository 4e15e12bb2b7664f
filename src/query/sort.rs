// ============================================================================
// src/query/sort.rs - Result ordering
// ============================================================================
//
// Sorting is always the last step of a query: conditions filter first, then
// the surviving documents are ordered by a single field. Ties fall back to the
// document id so that repeated snapshots of the same data come out identical.
//
// ============================================================================

use crate::core::{Document, Result, StoreError, Value};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortDirection {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(StoreError::InvalidQuery(format!(
                "unknown sort direction '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy for placing null values
///
/// - ASC: nulls first (null is the smallest value)
/// - DESC: nulls last
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullOrdering {
    NullsFirst,
    NullsLast,
}

impl NullOrdering {
    pub fn default_for_direction(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Self::NullsFirst,
            SortDirection::Desc => Self::NullsLast,
        }
    }
}

/// Ordering applied to a query's result set
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
    pub null_ordering: NullOrdering,
}

impl SortKey {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
            null_ordering: NullOrdering::default_for_direction(direction),
        }
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    pub fn with_null_ordering(mut self, null_ordering: NullOrdering) -> Self {
        self.null_ordering = null_ordering;
        self
    }

    fn compare_values(&self, left: &Value, right: &Value) -> Ordering {
        match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => match self.null_ordering {
                NullOrdering::NullsFirst => Ordering::Less,
                NullOrdering::NullsLast => Ordering::Greater,
            },
            (false, true) => match self.null_ordering {
                NullOrdering::NullsFirst => Ordering::Greater,
                NullOrdering::NullsLast => Ordering::Less,
            },
            (false, false) => match self.direction {
                SortDirection::Asc => left.sort_cmp(right),
                SortDirection::Desc => left.sort_cmp(right).reverse(),
            },
        }
    }
}

pub struct DocumentSorter;

impl DocumentSorter {
    /// Order documents by `key`.
    ///
    /// Documents without the sort field are dropped, as the store does for
    /// ordered queries.
    pub fn sort(docs: Vec<Document>, key: &SortKey) -> Vec<Document> {
        let mut docs: Vec<Document> = docs
            .into_iter()
            .filter(|doc| doc.get(&key.field).is_some())
            .collect();

        docs.sort_by(|a, b| {
            let (Some(left), Some(right)) = (a.get(&key.field), b.get(&key.field)) else {
                return Ordering::Equal;
            };
            key.compare_values(left, right).then_with(|| a.id.cmp(&b.id))
        });
        docs
    }
}
