use super::LiveState;
use crate::core::{Document, DocumentPath, Result};
use crate::query::{Condition, SortKey, build_query};
use crate::store::RemoteStore;
use crate::subscription::{Snapshot, SubscriptionAdapter, SubscriptionHandle, SubscriptionTarget};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{Level, event};

/// Shared lifecycle of every hook: derive a key from the current parameters,
/// and when it changes tear the old handle down before opening the new one.
struct HookCore<T> {
    adapter: SubscriptionAdapter,
    target: Option<SubscriptionTarget>,
    current: Option<SubscriptionHandle>,
    state: Arc<watch::Sender<LiveState<T>>>,
    project: fn(Snapshot) -> T,
    opened: usize,
    torn_down: usize,
}

impl<T> HookCore<T>
where
    T: Default + Clone + Send + Sync + 'static,
{
    fn new(client: Arc<dyn RemoteStore>, project: fn(Snapshot) -> T) -> Self {
        let (state, _) = watch::channel(LiveState::loading());
        Self {
            adapter: SubscriptionAdapter::new(client),
            target: None,
            current: None,
            state: Arc::new(state),
            project,
            opened: 0,
            torn_down: 0,
        }
    }

    fn retarget(&mut self, target: Option<SubscriptionTarget>) {
        if let (Some(next), Some(handle)) = (&target, &self.current) {
            if &next.key() == handle.key() {
                return;
            }
        }
        self.target = target;
        self.open();
    }

    fn open(&mut self) {
        self.teardown();

        let Some(target) = self.target.clone() else {
            self.state.send_modify(|state| state.loading = false);
            return;
        };

        // A new listener starts clean: the previous target's error no longer
        // applies. Its data stays visible until the first snapshot arrives.
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        let on_data = Arc::clone(&self.state);
        let on_error = Arc::clone(&self.state);
        let project = self.project;

        event!(Level::DEBUG, target = %target, "hook subscribing");
        let handle = self.adapter.subscribe(
            target,
            move |snapshot| on_data.send_modify(|state| state.resolve(project(snapshot))),
            move |err| on_error.send_modify(|state| state.reject(err)),
        );
        self.opened += 1;
        self.current = Some(handle);
    }

    fn teardown(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.unsubscribe();
            self.torn_down += 1;
        }
    }

    fn state(&self) -> LiveState<T> {
        self.state.borrow().clone()
    }

    fn watch(&self) -> watch::Receiver<LiveState<T>> {
        self.state.subscribe()
    }

    fn active_handles(&self) -> usize {
        self.current
            .iter()
            .filter(|handle| !handle.is_terminated())
            .count()
    }
}

impl<T> Drop for HookCore<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.current.take() {
            handle.unsubscribe();
        }
    }
}

/// Live view of a single document.
///
/// `None` (or an empty id) means "no target": nothing is subscribed and
/// `loading` is false.
pub struct DocumentHook {
    collection: String,
    core: HookCore<Option<Document>>,
}

impl DocumentHook {
    pub fn new(client: Arc<dyn RemoteStore>, collection: &str, id: Option<&str>) -> Self {
        let mut hook = Self {
            collection: collection.to_string(),
            core: HookCore::new(client, Snapshot::into_document),
        };
        hook.set_id(id);
        hook
    }

    /// Point the hook at another document; a no-op if the id is unchanged
    pub fn set_id(&mut self, id: Option<&str>) {
        let target = id
            .filter(|id| !id.is_empty())
            .map(|id| SubscriptionTarget::Document(DocumentPath::new(self.collection.clone(), id)));
        self.core.retarget(target);
    }

    /// Reopen the listener for the current id, e.g. after an error
    pub fn refresh(&mut self) {
        self.core.open();
    }

    pub fn state(&self) -> LiveState<Option<Document>> {
        self.core.state()
    }

    pub fn watch(&self) -> watch::Receiver<LiveState<Option<Document>>> {
        self.core.watch()
    }

    pub fn typed<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.state().data.map(|doc| doc.decode()).transpose()
    }

    pub fn unmount(&mut self) {
        self.core.target = None;
        self.core.teardown();
    }

    pub fn active_handles(&self) -> usize {
        self.core.active_handles()
    }

    pub fn opened(&self) -> usize {
        self.core.opened
    }

    pub fn torn_down(&self) -> usize {
        self.core.torn_down
    }
}

/// Live view of a filtered, optionally sorted collection
pub struct CollectionHook {
    collection: String,
    core: HookCore<Vec<Document>>,
}

impl CollectionHook {
    pub fn new(
        client: Arc<dyn RemoteStore>,
        collection: &str,
        conditions: &[Condition],
        sort: Option<SortKey>,
    ) -> Result<Self> {
        let mut hook = Self {
            collection: collection.to_string(),
            core: HookCore::new(client, Snapshot::into_documents),
        };
        hook.set_params(conditions, sort)?;
        Ok(hook)
    }

    /// Re-evaluate the query parameters. Value-equal parameters keep the
    /// existing listener.
    pub fn set_params(&mut self, conditions: &[Condition], sort: Option<SortKey>) -> Result<()> {
        let query = build_query(
            &self.collection,
            conditions,
            sort.as_ref().map(|key| key.field.as_str()),
            sort.as_ref().map(|key| key.direction),
        )?;
        self.core.retarget(Some(SubscriptionTarget::Query(query)));
        Ok(())
    }

    pub fn refresh(&mut self) {
        self.core.open();
    }

    pub fn state(&self) -> LiveState<Vec<Document>> {
        self.core.state()
    }

    pub fn watch(&self) -> watch::Receiver<LiveState<Vec<Document>>> {
        self.core.watch()
    }

    pub fn typed<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.state().data.iter().map(Document::decode).collect()
    }

    pub fn unmount(&mut self) {
        self.core.target = None;
        self.core.teardown();
    }

    pub fn active_handles(&self) -> usize {
        self.core.active_handles()
    }

    pub fn opened(&self) -> usize {
        self.core.opened
    }

    pub fn torn_down(&self) -> usize {
        self.core.torn_down
    }
}
