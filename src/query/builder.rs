use super::{Condition, ConditionEvaluator, DocumentSorter, SortDirection, SortKey};
use crate::core::{Document, Result, StoreError};
use std::fmt;

/// Store-native query: a collection, a conjunction of conditions and an
/// optional final ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: String,
    conditions: Vec<Condition>,
    order_by: Option<SortKey>,
}

/// Value identity of a query.
///
/// Two queries with the same key select the same documents in the same
/// order, so a live listener for one serves the other. Condition order is
/// not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(String);

impl QueryKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build a query from declarative filter triples and an optional sort.
///
/// Pure: no store access happens here. Operator/value shape problems are
/// reported by the store when the query runs.
pub fn build_query(
    collection_path: &str,
    conditions: &[Condition],
    sort_field: Option<&str>,
    sort_direction: Option<SortDirection>,
) -> Result<Query> {
    let collection = collection_path.trim_matches('/');
    if collection.is_empty() {
        return Err(StoreError::InvalidQuery(
            "collection path must not be empty".into(),
        ));
    }

    let order_by = sort_field.map(|field| SortKey::new(field, sort_direction.unwrap_or_default()));

    Ok(Query {
        collection: collection.to_string(),
        conditions: conditions.to_vec(),
        order_by,
    })
}

impl Query {
    /// Unfiltered query over a whole collection
    pub fn collection(collection_path: &str) -> Result<Self> {
        build_query(collection_path, &[], None, None)
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn order_by(mut self, key: SortKey) -> Self {
        self.order_by = Some(key);
        self
    }

    pub fn collection_path(&self) -> &str {
        &self.collection
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn sort_key(&self) -> Option<&SortKey> {
        self.order_by.as_ref()
    }

    pub fn key(&self) -> QueryKey {
        let mut parts: Vec<String> = self.conditions.iter().map(Condition::canonical).collect();
        parts.sort();
        parts.dedup();

        let order = match &self.order_by {
            Some(key) => format!("{}:{}:{:?}", key.field, key.direction, key.null_ordering),
            None => String::new(),
        };
        QueryKey(format!("{}?{}#{}", self.collection, parts.join("&"), order))
    }

    pub fn validate(&self) -> Result<()> {
        for condition in &self.conditions {
            condition.validate()?;
        }
        if let Some(key) = &self.order_by {
            if key.field.trim().is_empty() {
                return Err(StoreError::InvalidQuery(
                    "sort field must not be empty".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn matches(&self, doc: &Document) -> bool {
        ConditionEvaluator::matches_all(&self.conditions, doc)
    }

    /// Filter then order a candidate set; sorting always happens last
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let matching: Vec<Document> = docs.into_iter().filter(|doc| self.matches(doc)).collect();
        match &self.order_by {
            Some(key) => DocumentSorter::sort(matching, key),
            None => matching,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collection)?;
        for (i, condition) in self.conditions.iter().enumerate() {
            let joiner = if i == 0 { " where " } else { " and " };
            write!(f, "{}{}", joiner, condition)?;
        }
        if let Some(key) = &self.order_by {
            write!(f, " order by {} {}", key.field, key.direction)?;
        }
        Ok(())
    }
}
