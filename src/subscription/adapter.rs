use super::{Snapshot, SubscriptionKey, SubscriptionTarget};
use crate::core::{Operation, StoreError};
use crate::store::{ListenEvent, RemoteStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{Instrument, Level, event, info_span};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of one live listener.
///
/// `Idle → Connecting → Active → Terminated`; nothing leaves `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Idle,
    Connecting,
    Active,
    Terminated,
}

type DataCallback = Box<dyn FnMut(Snapshot) + Send>;
type ErrorCallback = Box<dyn FnOnce(StoreError) + Send>;

struct Inner {
    state: SubscriptionState,
    on_data: Option<DataCallback>,
    on_error: Option<ErrorCallback>,
}

impl Inner {
    /// Returns false once the subscription is terminated
    fn deliver(&mut self, snapshot: Snapshot) -> bool {
        if self.state == SubscriptionState::Terminated {
            return false;
        }
        self.state = SubscriptionState::Active;
        if let Some(on_data) = self.on_data.as_mut() {
            on_data(snapshot);
        }
        true
    }

    fn fail(&mut self, err: StoreError) {
        if self.state == SubscriptionState::Terminated {
            return;
        }
        self.state = SubscriptionState::Terminated;
        self.on_data = None;
        if let Some(on_error) = self.on_error.take() {
            on_error(err);
        }
    }

    /// Returns true if this call performed the transition
    fn terminate(&mut self) -> bool {
        if self.state == SubscriptionState::Terminated {
            return false;
        }
        self.state = SubscriptionState::Terminated;
        self.on_data = None;
        self.on_error = None;
        true
    }
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Wraps the store's listen primitive into callback-driven handles.
///
/// Must be used from within a tokio runtime: every subscription drains its
/// listener on a spawned task.
#[derive(Clone)]
pub struct SubscriptionAdapter {
    client: Arc<dyn RemoteStore>,
}

impl SubscriptionAdapter {
    pub fn new(client: Arc<dyn RemoteStore>) -> Self {
        Self { client }
    }

    /// Open a live listener on `target`.
    ///
    /// `on_data` receives the complete current result first and again after
    /// every remote change, in the order the store emits them. `on_error` is
    /// called at most once, after which the subscription is terminated; there
    /// is no retry. Callbacks run while the handle's state is locked and must
    /// not unsubscribe their own handle.
    pub fn subscribe<D, E>(&self, target: SubscriptionTarget, on_data: D, on_error: E) -> SubscriptionHandle
    where
        D: FnMut(Snapshot) + Send + 'static,
        E: FnOnce(StoreError) + Send + 'static,
    {
        let id = NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed);
        let key = target.key();
        let inner = Arc::new(Mutex::new(Inner {
            state: SubscriptionState::Idle,
            on_data: Some(Box::new(on_data)),
            on_error: Some(Box::new(on_error)),
        }));

        let span = info_span!("subscription", id, target = %target);
        lock(&inner).state = SubscriptionState::Connecting;

        let client = Arc::clone(&self.client);
        let task_inner = Arc::clone(&inner);
        let task = tokio::spawn(
            async move {
                let mut listener = match client.listen(&target).await {
                    Ok(listener) => listener,
                    Err(err) => {
                        event!(Level::WARN, error = %err, "listener could not be opened");
                        lock(&task_inner).fail(err.during(Operation::Subscribe));
                        return;
                    }
                };
                event!(Level::DEBUG, listener = listener.id(), "listener attached");

                loop {
                    match listener.next().await {
                        Some(ListenEvent::Snapshot(snapshot)) => {
                            if !lock(&task_inner).deliver(snapshot) {
                                break;
                            }
                        }
                        Some(ListenEvent::Error(err)) => {
                            event!(Level::WARN, error = %err, "listener failed");
                            lock(&task_inner).fail(err.during(Operation::Subscribe));
                            break;
                        }
                        None => {
                            lock(&task_inner).fail(
                                StoreError::Connection("listener closed by store".into())
                                    .during(Operation::Subscribe),
                            );
                            break;
                        }
                    }
                }
            }
            .instrument(span),
        );

        SubscriptionHandle {
            id,
            key,
            inner,
            task,
        }
    }

    /// Whether two targets can share one listener
    pub fn is_equivalent(a: &SubscriptionTarget, b: &SubscriptionTarget) -> bool {
        a.key() == b.key()
    }
}

/// One open live listener.
///
/// Dropping the handle unsubscribes.
pub struct SubscriptionHandle {
    id: u64,
    key: SubscriptionKey,
    inner: Arc<Mutex<Inner>>,
    task: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    pub fn state(&self) -> SubscriptionState {
        lock(&self.inner).state
    }

    pub fn is_terminated(&self) -> bool {
        self.state() == SubscriptionState::Terminated
    }

    /// Detach the listener. Idempotent, and a no-op after an error already
    /// terminated the subscription. No callback runs once this returns.
    pub fn unsubscribe(&self) {
        if lock(&self.inner).terminate() {
            event!(Level::DEBUG, id = self.id, "subscription torn down");
        }
        self.task.abort();
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Document, DocumentPath, Fields, Result};
    use crate::query::Query;
    use crate::store::{Listener, SetMode};
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    /// Store whose listener pushes are driven by the test
    #[derive(Default)]
    struct ScriptedStore {
        senders: Mutex<Vec<mpsc::UnboundedSender<ListenEvent>>>,
    }

    impl ScriptedStore {
        fn push(&self, event: ListenEvent) {
            for sender in self.senders.lock().unwrap().iter() {
                let _ = sender.send(event.clone());
            }
        }
    }

    #[async_trait]
    impl RemoteStore for ScriptedStore {
        async fn get(&self, _: &DocumentPath) -> Result<Option<Document>> {
            Ok(None)
        }
        async fn query(&self, _: &Query) -> Result<Vec<Document>> {
            Ok(Vec::new())
        }
        async fn create(&self, _: &str, id: Option<&str>, _: Fields) -> Result<String> {
            Ok(id.unwrap_or("generated").to_string())
        }
        async fn set(&self, _: &DocumentPath, _: Fields, _: SetMode) -> Result<()> {
            Ok(())
        }
        async fn update(&self, _: &DocumentPath, _: Fields) -> Result<()> {
            Ok(())
        }
        async fn delete(&self, _: &DocumentPath) -> Result<()> {
            Ok(())
        }
        async fn listen(&self, _: &SubscriptionTarget) -> Result<Listener> {
            let (sender, receiver) = mpsc::unbounded_channel();
            self.senders.lock().unwrap().push(sender);
            Ok(Listener::new(1, receiver))
        }
    }

    fn doc_snapshot(id: &str) -> Snapshot {
        Snapshot::Document(Some(Document::new(id, Fields::new())))
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let store = Arc::new(ScriptedStore::default());
        let adapter = SubscriptionAdapter::new(store);
        let handle = adapter.subscribe(SubscriptionTarget::document("users", "u1"), |_| {}, |_| {});
        assert_eq!(handle.state(), SubscriptionState::Connecting);

        for _ in 0..3 {
            handle.unsubscribe();
            assert_eq!(handle.state(), SubscriptionState::Terminated);
        }
    }

    #[tokio::test]
    async fn test_error_is_delivered_once_and_terminates() {
        let store = Arc::new(ScriptedStore::default());
        let adapter = SubscriptionAdapter::new(store.clone());
        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&errors);
        let handle = adapter.subscribe(
            SubscriptionTarget::document("users", "u1"),
            |_| {},
            move |err| sink.lock().unwrap().push(err),
        );
        settle().await;

        store.push(ListenEvent::Snapshot(doc_snapshot("u1")));
        store.push(ListenEvent::Error(StoreError::Connection("reset".into())));
        store.push(ListenEvent::Error(StoreError::Connection("reset".into())));
        settle().await;

        assert_eq!(handle.state(), SubscriptionState::Terminated);
        let errors = errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].operation(), Some(Operation::Subscribe));

        // unsubscribing after an error is a no-op
        handle.unsubscribe();
    }

    #[tokio::test]
    async fn test_late_events_are_discarded() {
        let store = Arc::new(ScriptedStore::default());
        let adapter = SubscriptionAdapter::new(store.clone());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handle = adapter.subscribe(
            SubscriptionTarget::document("matches", "m1"),
            move |snapshot| sink.lock().unwrap().push(snapshot),
            |_| {},
        );
        settle().await;

        store.push(ListenEvent::Snapshot(doc_snapshot("m1")));
        settle().await;
        assert_eq!(handle.state(), SubscriptionState::Active);

        // queued but not yet delivered when the handle is torn down
        store.push(ListenEvent::Snapshot(doc_snapshot("m1")));
        handle.unsubscribe();
        settle().await;
        store.push(ListenEvent::Snapshot(doc_snapshot("m1")));
        settle().await;

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_equivalent_targets() {
        let a = SubscriptionTarget::Query(Query::collection("matches").unwrap());
        let b = SubscriptionTarget::Query(Query::collection("matches").unwrap());
        let c = SubscriptionTarget::document("matches", "m1");
        assert!(SubscriptionAdapter::is_equivalent(&a, &b));
        assert!(!SubscriptionAdapter::is_equivalent(&a, &c));
    }
}
