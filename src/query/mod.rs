//! Query Builder
//!
//! Translates (field, operator, value) triples and an optional sort into a
//! [`Query`] the store can execute or listen to.

pub mod builder;
pub mod condition;
pub mod filter;
pub mod sort;

pub use builder::{Query, QueryKey, build_query};
pub use condition::{Condition, Operator};
pub use filter::ConditionEvaluator;
pub use sort::{DocumentSorter, NullOrdering, SortDirection, SortKey};
