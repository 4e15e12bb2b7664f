//! View-Model Hooks
//!
//! Compose the query builder, subscription adapter and mutation gateway into
//! `{ data, loading, error }` views for presentation code.

pub mod bound;
pub mod hook;
pub mod state;

pub use bound::ViewModel;
pub use hook::{CollectionHook, DocumentHook};
pub use state::LiveState;
