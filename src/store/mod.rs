//! Remote Store Client boundary
//!
//! The hosted document database is reached only through [`RemoteStore`].
//! Components receive an `Arc<dyn RemoteStore>` at construction time; nothing
//! in the crate reaches for a process-wide client.

pub mod config;
pub mod memory;

pub use config::{StoreConfig, UpdatePolicy};
pub use memory::InMemoryStore;

use crate::core::{Document, DocumentPath, Fields, Result, StoreError};
use crate::query::Query;
use crate::subscription::{Snapshot, SubscriptionTarget};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// How `set` treats fields already stored on the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetMode {
    /// Replace the whole document
    #[default]
    Overwrite,
    /// Shallow merge into the existing document, creating it if absent
    Merge,
}

/// One push from a live listener
#[derive(Debug, Clone, PartialEq)]
pub enum ListenEvent {
    Snapshot(Snapshot),
    /// Terminal; the store sends nothing after an error
    Error(StoreError),
}

/// Receiving end of a store listener.
///
/// Dropping it detaches the listener; the store notices the closed channel
/// and stops pushing.
#[derive(Debug)]
pub struct Listener {
    id: u64,
    events: mpsc::UnboundedReceiver<ListenEvent>,
}

impl Listener {
    pub fn new(id: u64, events: mpsc::UnboundedReceiver<ListenEvent>) -> Self {
        Self { id, events }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next pushed event, `None` once the store side is gone
    pub async fn next(&mut self) -> Option<ListenEvent> {
        self.events.recv().await
    }
}

/// Narrow interface of the hosted document store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read one document, `Ok(None)` if it does not exist
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>>;

    /// Run a query once
    async fn query(&self, query: &Query) -> Result<Vec<Document>>;

    /// Create a document. Without `id` the store assigns one; with `id` the
    /// call fails with `Conflict` if the document exists.
    async fn create(&self, collection: &str, id: Option<&str>, fields: Fields) -> Result<String>;

    /// Write a document whether or not it exists; `mode` decides what
    /// happens to fields already stored
    async fn set(&self, path: &DocumentPath, fields: Fields, mode: SetMode) -> Result<()>;

    /// Shallow merge of `fields` into an existing document
    async fn update(&self, path: &DocumentPath, fields: Fields) -> Result<()>;

    async fn delete(&self, path: &DocumentPath) -> Result<()>;

    /// Open a live listener. The first event carries the current result,
    /// each later event the complete refreshed result.
    async fn listen(&self, target: &SubscriptionTarget) -> Result<Listener>;
}
