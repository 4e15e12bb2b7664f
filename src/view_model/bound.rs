use super::{CollectionHook, DocumentHook};
use crate::core::{Document, Result};
use crate::mutation::MutationGateway;
use crate::query::{Condition, SortKey, build_query};
use crate::store::{RemoteStore, SetMode};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Everything presentation code needs for one collection: live hooks plus
/// mutation functions bound to the collection path.
pub struct ViewModel {
    client: Arc<dyn RemoteStore>,
    collection: String,
    gateway: MutationGateway,
}

impl ViewModel {
    pub fn new(client: Arc<dyn RemoteStore>, collection: &str) -> Self {
        Self {
            gateway: MutationGateway::new(Arc::clone(&client)),
            client,
            collection: collection.to_string(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn use_document(&self, id: Option<&str>) -> DocumentHook {
        DocumentHook::new(Arc::clone(&self.client), &self.collection, id)
    }

    pub fn use_collection(&self, conditions: &[Condition], sort: Option<SortKey>) -> Result<CollectionHook> {
        CollectionHook::new(Arc::clone(&self.client), &self.collection, conditions, sort)
    }

    pub async fn create<T: Serialize + ?Sized>(&self, data: &T, id: Option<&str>) -> Result<String> {
        self.gateway.create(&self.collection, data, id).await
    }

    pub async fn update<T: Serialize + ?Sized>(&self, id: &str, partial: &T) -> Result<()> {
        self.gateway.update(&self.collection, id, partial).await
    }

    pub async fn set<T: Serialize + ?Sized>(&self, id: &str, data: &T, mode: SetMode) -> Result<()> {
        self.gateway.set(&self.collection, id, data, mode).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.gateway.delete(&self.collection, id).await
    }

    /// One-shot read, outside any live listener
    pub async fn fetch(&self, id: &str) -> Result<Option<Document>> {
        self.gateway.get(&self.collection, id).await
    }

    /// One-shot query, outside any live listener
    pub async fn fetch_all(&self, conditions: &[Condition], sort: Option<SortKey>) -> Result<Vec<Document>> {
        let query = build_query(
            &self.collection,
            conditions,
            sort.as_ref().map(|key| key.field.as_str()),
            sort.as_ref().map(|key| key.direction),
        )?;
        self.gateway.query(&query).await
    }

    pub fn invalidations(&self) -> broadcast::Receiver<String> {
        self.gateway.invalidations()
    }

    pub fn is_creating(&self) -> bool {
        self.gateway.is_creating()
    }

    pub fn is_updating(&self) -> bool {
        self.gateway.is_updating()
    }

    pub fn is_deleting(&self) -> bool {
        self.gateway.is_deleting()
    }
}
