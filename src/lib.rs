// ============================================================================
// Scorebook Library
// ============================================================================

//! Live data layer for a cricket scores app.
//!
//! Presentation code asks for a document or a filtered collection and gets a
//! `{ data, loading, error }` view that stays current while mounted. Every
//! remote call goes through an injected [`RemoteStore`].
//!
//! ```
//! use scorebook::prelude::*;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> scorebook::Result<()> {
//! let store = Arc::new(InMemoryStore::default());
//! let activities = ViewModel::new(store.clone(), "matchActivities");
//!
//! activities
//!     .create(&serde_json::json!({"userId": "u1", "matchId": "m1"}), None)
//!     .await?;
//!
//! let mine = activities
//!     .fetch_all(&[Condition::eq("userId", "u1")], None)
//!     .await?;
//! assert_eq!(mine.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod core;
pub mod mutation;
pub mod prelude;
pub mod query;
pub mod services;
pub mod store;
pub mod subscription;
pub mod view_model;

// Re-export main types for convenience
pub use crate::core::{Document, DocumentPath, ErrorKind, Fields, Operation, Result, StoreError, Value};
pub use query::{Condition, Operator, Query, QueryKey, SortDirection, SortKey, build_query};
pub use store::{InMemoryStore, ListenEvent, Listener, RemoteStore, SetMode, StoreConfig, UpdatePolicy};
pub use subscription::{
    Snapshot, SubscriptionAdapter, SubscriptionHandle, SubscriptionState, SubscriptionTarget,
};
pub use mutation::MutationGateway;
pub use view_model::{CollectionHook, DocumentHook, LiveState, ViewModel};
