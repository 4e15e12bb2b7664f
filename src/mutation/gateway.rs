use crate::core::{Document, DocumentPath, Operation, Result, StoreError, to_fields};
use crate::query::Query;
use crate::store::{RemoteStore, SetMode};
use log::{debug, warn};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;

const INVALIDATION_CAPACITY: usize = 64;

/// Counts a call as in flight for as long as it is alive
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn start(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Uniform create/update/delete (plus one-shot reads) over a store client.
///
/// Mutations never touch cached listener state: an open subscription sees
/// the change when the store pushes it. Each successful mutation publishes
/// the collection path on the invalidation channel so one-shot readers can
/// refetch. Errors are forwarded unchanged, annotated with the operation.
pub struct MutationGateway {
    client: Arc<dyn RemoteStore>,
    invalidations: broadcast::Sender<String>,
    creating: AtomicUsize,
    updating: AtomicUsize,
    deleting: AtomicUsize,
}

impl MutationGateway {
    pub fn new(client: Arc<dyn RemoteStore>) -> Self {
        let (invalidations, _) = broadcast::channel(INVALIDATION_CAPACITY);
        Self {
            client,
            invalidations,
            creating: AtomicUsize::new(0),
            updating: AtomicUsize::new(0),
            deleting: AtomicUsize::new(0),
        }
    }

    /// Create a document and return its identifier.
    ///
    /// With `id` omitted the store assigns one; a supplied `id` that already
    /// exists fails with `Conflict`.
    pub async fn create<T: Serialize + ?Sized>(&self, collection: &str, data: &T, id: Option<&str>) -> Result<String> {
        let _in_flight = InFlight::start(&self.creating);
        let fields = to_fields(data).map_err(|e| e.during(Operation::Create))?;
        let id = self
            .client
            .create(collection, id, fields)
            .await
            .map_err(|e| self.failed(Operation::Create, e))?;
        debug!("Created {}/{}", collection, id);
        self.invalidate(collection);
        Ok(id)
    }

    /// Shallow merge: fields in `partial` overwrite, absent fields stay
    pub async fn update<T: Serialize + ?Sized>(&self, collection: &str, id: &str, partial: &T) -> Result<()> {
        let _in_flight = InFlight::start(&self.updating);
        let fields = to_fields(partial).map_err(|e| e.during(Operation::Update))?;
        self.client
            .update(&DocumentPath::new(collection, id), fields)
            .await
            .map_err(|e| self.failed(Operation::Update, e))?;
        self.invalidate(collection);
        Ok(())
    }

    /// Write a document at a known id whether or not it exists.
    ///
    /// `SetMode::Merge` keeps stored fields that `data` does not name;
    /// `SetMode::Overwrite` replaces the document.
    pub async fn set<T: Serialize + ?Sized>(&self, collection: &str, id: &str, data: &T, mode: SetMode) -> Result<()> {
        let _in_flight = InFlight::start(&self.updating);
        let fields = to_fields(data).map_err(|e| e.during(Operation::Set))?;
        self.client
            .set(&DocumentPath::new(collection, id), fields, mode)
            .await
            .map_err(|e| self.failed(Operation::Set, e))?;
        debug!("Set {}/{} ({:?})", collection, id, mode);
        self.invalidate(collection);
        Ok(())
    }

    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let _in_flight = InFlight::start(&self.deleting);
        self.client
            .delete(&DocumentPath::new(collection, id))
            .await
            .map_err(|e| self.failed(Operation::Delete, e))?;
        self.invalidate(collection);
        Ok(())
    }

    pub async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.client
            .get(&DocumentPath::new(collection, id))
            .await
            .map_err(|e| self.failed(Operation::Get, e))
    }

    pub async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        self.client
            .query(query)
            .await
            .map_err(|e| self.failed(Operation::Query, e))
    }

    /// Collection paths touched by successful mutations
    pub fn invalidations(&self) -> broadcast::Receiver<String> {
        self.invalidations.subscribe()
    }

    pub fn is_creating(&self) -> bool {
        self.creating.load(Ordering::SeqCst) > 0
    }

    pub fn is_updating(&self) -> bool {
        self.updating.load(Ordering::SeqCst) > 0
    }

    pub fn is_deleting(&self) -> bool {
        self.deleting.load(Ordering::SeqCst) > 0
    }

    pub fn client(&self) -> &Arc<dyn RemoteStore> {
        &self.client
    }

    fn invalidate(&self, collection: &str) {
        // No receivers is fine; nobody is caching one-shot reads
        let _ = self.invalidations.send(collection.to_string());
    }

    fn failed(&self, op: Operation, err: StoreError) -> StoreError {
        warn!("{} failed: {}", op, err);
        err.during(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::store::InMemoryStore;
    use serde_json::json;

    fn gateway() -> MutationGateway {
        MutationGateway::new(Arc::new(InMemoryStore::default()))
    }

    #[tokio::test]
    async fn test_create_update_delete() {
        let gateway = gateway();
        let id = gateway
            .create("userMatches", &json!({"notes": "great chase", "favorite": false}), Some("u1_m1"))
            .await
            .unwrap();
        assert_eq!(id, "u1_m1");

        gateway.update("userMatches", &id, &json!({"favorite": true})).await.unwrap();
        let doc = gateway.get("userMatches", &id).await.unwrap().unwrap();
        assert_eq!(doc.get("notes").and_then(|v| v.as_str()), Some("great chase"));
        assert_eq!(doc.get("favorite").and_then(|v| v.as_bool()), Some(true));

        gateway.delete("userMatches", &id).await.unwrap();
        assert!(gateway.get("userMatches", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_errors_are_annotated() {
        let gateway = gateway();
        gateway.create("users", &json!({"name": "A"}), Some("u1")).await.unwrap();

        let err = gateway.create("users", &json!({"name": "B"}), Some("u1")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.operation(), Some(Operation::Create));

        let err = gateway.update("users", "nobody", &json!({"name": "C"})).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.operation(), Some(Operation::Update));

        let err = gateway.create("users", &json!("not an object"), None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
    }

    #[tokio::test]
    async fn test_merge_set_keeps_unnamed_fields() {
        let gateway = gateway();
        gateway
            .set("users", "u1", &json!({"uid": "u1", "userType": "player"}), SetMode::Merge)
            .await
            .unwrap();
        gateway
            .set("users", "u1", &json!({"displayName": "Asha"}), SetMode::Merge)
            .await
            .unwrap();

        let doc = gateway.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc.get("userType").and_then(|v| v.as_str()), Some("player"));
        assert_eq!(doc.get("displayName").and_then(|v| v.as_str()), Some("Asha"));

        gateway
            .set("users", "u1", &json!({"uid": "u1"}), SetMode::Overwrite)
            .await
            .unwrap();
        let doc = gateway.get("users", "u1").await.unwrap().unwrap();
        assert!(doc.get("userType").is_none());
        assert!(!gateway.is_updating());
    }

    #[tokio::test]
    async fn test_set_errors_are_annotated() {
        let store = Arc::new(InMemoryStore::default());
        let gateway = MutationGateway::new(store.clone());
        store.set_offline(true).await;

        let err = gateway
            .set("users", "u1", &json!({"uid": "u1"}), SetMode::Merge)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert_eq!(err.operation(), Some(Operation::Set));

        let err = gateway
            .set("users", "u1", &json!(["not", "an", "object"]), SetMode::Merge)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Serialization);
        assert_eq!(err.operation(), Some(Operation::Set));
    }

    #[tokio::test]
    async fn test_successful_mutations_invalidate_collection() {
        let gateway = gateway();
        let mut invalidations = gateway.invalidations();

        let id = gateway.create("notifications", &json!({"title": "Toss"}), None).await.unwrap();
        gateway.delete("notifications", &id).await.unwrap();
        assert_eq!(invalidations.recv().await.unwrap(), "notifications");
        assert_eq!(invalidations.recv().await.unwrap(), "notifications");

        let _ = gateway.update("notifications", "missing", &json!({"isRead": true})).await;
        assert!(invalidations.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_in_flight_flags_reset() {
        let gateway = gateway();
        assert!(!gateway.is_creating());
        gateway.create("users", &json!({"name": "A"}), None).await.unwrap();
        assert!(!gateway.is_creating());
        assert!(!gateway.is_updating());
        assert!(!gateway.is_deleting());
    }
}
