//! Common imports for presentation code.
//!
//! `use scorebook::prelude::*;` brings in the hooks, the query vocabulary and
//! the in-memory store. Lower-level pieces (adapter, gateway, listeners) stay
//! behind their modules.

pub use crate::auth::{AuthContext, CurrentUser, StaticAuth};
pub use crate::core::{Document, ErrorKind, Result, StoreError, Value};
pub use crate::query::{Condition, Operator, SortDirection, SortKey};
pub use crate::store::{InMemoryStore, RemoteStore, SetMode, StoreConfig};
pub use crate::view_model::{CollectionHook, DocumentHook, LiveState, ViewModel};
