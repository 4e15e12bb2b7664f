use super::{ListenEvent, Listener, RemoteStore, SetMode, StoreConfig, UpdatePolicy};
use crate::core::{Document, DocumentPath, Fields, Result, StoreError};
use crate::query::Query;
use crate::subscription::{Snapshot, SubscriptionTarget};
use async_trait::async_trait;
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock, mpsc};
use uuid::Uuid;

type Collection = BTreeMap<String, Fields>;

struct ListenerEntry {
    id: u64,
    target: SubscriptionTarget,
    sender: mpsc::UnboundedSender<ListenEvent>,
}

#[derive(Default)]
struct Faults {
    offline: bool,
    denied: HashSet<String>,
}

/// In-process document store implementing [`RemoteStore`].
///
/// Stands in for the hosted backend in tests and the demo binary. Every
/// mutation pushes a complete refreshed snapshot to each listener whose
/// target lives in the mutated collection. Faults can be injected to
/// exercise connection and permission failures.
pub struct InMemoryStore {
    config: StoreConfig,
    /// Lock order: `collections` before `listeners`
    collections: RwLock<HashMap<String, Collection>>,
    listeners: Mutex<Vec<ListenerEntry>>,
    faults: RwLock<Faults>,
    next_listener_id: AtomicU64,
}

impl InMemoryStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            collections: RwLock::new(HashMap::new()),
            listeners: Mutex::new(Vec::new()),
            faults: RwLock::new(Faults::default()),
            next_listener_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Insert or replace a document without access checks
    pub async fn seed(&self, collection: &str, id: &str, fields: Fields) {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        self.publish(&collections, collection).await;
    }

    /// Simulate losing (or regaining) the connection. Going offline fails
    /// every open listener with a connection error.
    pub async fn set_offline(&self, offline: bool) {
        self.faults.write().await.offline = offline;
        if offline {
            self.fail_listeners(|_| true, || StoreError::Connection("store unreachable".into()))
                .await;
        }
    }

    /// Revoke access to a collection. Open listeners on it fail.
    pub async fn deny_collection(&self, collection: &str) {
        self.faults.write().await.denied.insert(collection.to_string());
        self.fail_listeners(
            |entry| entry.target.collection_path() == collection,
            || StoreError::PermissionDenied(format!("access to '{}' revoked", collection)),
        )
        .await;
    }

    pub async fn allow_collection(&self, collection: &str) {
        self.faults.write().await.denied.remove(collection);
    }

    /// Listeners whose receiving side is still attached
    pub async fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .await
            .iter()
            .filter(|entry| !entry.sender.is_closed())
            .count()
    }

    pub async fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    async fn check_access(&self, collection: &str) -> Result<()> {
        Self::check_faults(&*self.faults.read().await, collection)
    }

    fn check_faults(faults: &Faults, collection: &str) -> Result<()> {
        if faults.offline {
            return Err(StoreError::Connection("store unreachable".into()));
        }
        if faults.denied.contains(collection) {
            return Err(StoreError::PermissionDenied(format!(
                "access to '{}' denied",
                collection
            )));
        }
        Ok(())
    }

    async fn fail_listeners<P, E>(&self, mut affected: P, error: E)
    where
        P: FnMut(&ListenerEntry) -> bool,
        E: Fn() -> StoreError,
    {
        let mut listeners = self.listeners.lock().await;
        listeners.retain(|entry| {
            if !affected(entry) {
                return true;
            }
            warn!("Listener {} on '{}' terminated", entry.id, entry.target);
            let _ = entry.sender.send(ListenEvent::Error(error()));
            false
        });
    }

    fn snapshot(collections: &HashMap<String, Collection>, target: &SubscriptionTarget) -> Snapshot {
        let collection = collections.get(target.collection_path());
        match target {
            SubscriptionTarget::Document(path) => Snapshot::Document(
                collection
                    .and_then(|docs| docs.get(&path.id))
                    .map(|fields| Document::new(path.id.clone(), fields.clone())),
            ),
            SubscriptionTarget::Query(query) => Snapshot::Collection(match collection {
                Some(docs) => query.apply(
                    docs.iter()
                        .map(|(id, fields)| Document::new(id.clone(), fields.clone())),
                ),
                None => Vec::new(),
            }),
        }
    }

    /// Push a refreshed snapshot to every listener on `collection`,
    /// dropping listeners whose receiver is gone.
    async fn publish(&self, collections: &HashMap<String, Collection>, collection: &str) {
        let mut listeners = self.listeners.lock().await;
        listeners.retain(|entry| {
            if entry.target.collection_path() != collection {
                return !entry.sender.is_closed();
            }
            let snapshot = Self::snapshot(collections, &entry.target);
            match entry.sender.send(ListenEvent::Snapshot(snapshot)) {
                Ok(()) => true,
                Err(_) => {
                    debug!("Listener {} detached", entry.id);
                    false
                }
            }
        });
    }

    fn validate_path(path: &DocumentPath) -> Result<()> {
        if path.collection.is_empty() || path.id.is_empty() {
            return Err(StoreError::InvalidQuery(format!(
                "'{}' is not a valid document path",
                path
            )));
        }
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>> {
        Self::validate_path(path)?;
        self.check_access(&path.collection).await?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(&path.collection)
            .and_then(|docs| docs.get(&path.id))
            .map(|fields| Document::new(path.id.clone(), fields.clone())))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        self.check_access(query.collection_path()).await?;
        query.validate()?;
        let collections = self.collections.read().await;
        match Self::snapshot(&collections, &SubscriptionTarget::Query(query.clone())) {
            Snapshot::Collection(docs) => Ok(docs),
            Snapshot::Document(doc) => Ok(doc.into_iter().collect()),
        }
    }

    async fn create(&self, collection: &str, id: Option<&str>, fields: Fields) -> Result<String> {
        let id = match id {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().simple().to_string(),
        };
        let path = DocumentPath::new(collection, id.clone());
        Self::validate_path(&path)?;
        self.check_access(collection).await?;

        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(&id) {
            return Err(StoreError::Conflict(path.to_string()));
        }
        docs.insert(id.clone(), fields);
        debug!("Created {}", path);
        self.publish(&collections, collection).await;
        Ok(id)
    }

    async fn set(&self, path: &DocumentPath, fields: Fields, mode: SetMode) -> Result<()> {
        Self::validate_path(path)?;
        self.check_access(&path.collection).await?;

        let mut collections = self.collections.write().await;
        let docs = collections.entry(path.collection.clone()).or_default();
        match (mode, docs.get_mut(&path.id)) {
            (SetMode::Merge, Some(existing)) => existing.extend(fields),
            _ => {
                docs.insert(path.id.clone(), fields);
            }
        }
        self.publish(&collections, &path.collection).await;
        Ok(())
    }

    async fn update(&self, path: &DocumentPath, fields: Fields) -> Result<()> {
        Self::validate_path(path)?;
        self.check_access(&path.collection).await?;

        let mut collections = self.collections.write().await;
        let docs = collections.entry(path.collection.clone()).or_default();
        match docs.get_mut(&path.id) {
            Some(existing) => existing.extend(fields),
            None => match self.config.update_policy {
                UpdatePolicy::Strict => return Err(StoreError::NotFound(path.to_string())),
                UpdatePolicy::Upsert => {
                    debug!("Upserting missing document {}", path);
                    docs.insert(path.id.clone(), fields);
                }
            },
        }
        self.publish(&collections, &path.collection).await;
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<()> {
        Self::validate_path(path)?;
        self.check_access(&path.collection).await?;

        let mut collections = self.collections.write().await;
        let removed = collections
            .get_mut(&path.collection)
            .and_then(|docs| docs.remove(&path.id))
            .is_some();
        if removed {
            debug!("Deleted {}", path);
            self.publish(&collections, &path.collection).await;
        }
        Ok(())
    }

    async fn listen(&self, target: &SubscriptionTarget) -> Result<Listener> {
        match target {
            SubscriptionTarget::Document(path) => Self::validate_path(path)?,
            SubscriptionTarget::Query(query) => query.validate()?,
        }
        // Held until the listener is registered, so a concurrent fault
        // sweep either sees this listener or runs after it was refused.
        let faults = self.faults.read().await;
        Self::check_faults(&faults, target.collection_path())?;

        let collections = self.collections.read().await;
        let mut listeners = self.listeners.lock().await;

        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        let initial = Self::snapshot(&collections, target);
        // The receiver is alive here, so the initial push cannot fail
        let _ = sender.send(ListenEvent::Snapshot(initial));

        debug!("Listener {} attached to '{}'", id, target);
        listeners.push(ListenerEntry {
            id,
            target: target.clone(),
            sender,
        });
        Ok(Listener::new(id, receiver))
    }
}
