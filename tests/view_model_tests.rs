/// View-model hook tests
///
/// End-to-end behaviour of document and collection hooks: loading, errors,
/// re-parameterization, unmount and mutation round trips.
/// Run with: cargo test --test view_model_tests

use scorebook::core::to_fields;
use scorebook::{
    Condition, ErrorKind, InMemoryStore, LiveState, Operation, SortKey, StoreConfig, UpdatePolicy,
    SubscriptionAdapter, SubscriptionTarget, ViewModel, build_query,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_test::{assert_err, assert_ok};

#[derive(Debug, Deserialize, PartialEq)]
struct Profile {
    id: String,
    name: String,
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

async fn wait_until<T, F>(rx: &mut watch::Receiver<LiveState<T>>, predicate: F) -> LiveState<T>
where
    T: Clone,
    F: FnMut(&LiveState<T>) -> bool,
{
    tokio::time::timeout(Duration::from_secs(1), rx.wait_for(predicate))
        .await
        .expect("state did not change in time")
        .expect("hook dropped")
        .clone()
}

#[tokio::test]
async fn test_activity_feed_query_is_stable() {
    let build = || {
        build_query(
            "matchActivities",
            &[Condition::eq("userId", "u1")],
            Some("timestamp"),
            Some(scorebook::SortDirection::Desc),
        )
        .unwrap()
    };
    let first: SubscriptionTarget = build().into();
    let second: SubscriptionTarget = build().into();
    assert!(SubscriptionAdapter::is_equivalent(&first, &second));

    let store = Arc::new(InMemoryStore::default());
    let view = ViewModel::new(store.clone(), "matchActivities");
    let mut hook = assert_ok!(view.use_collection(&[Condition::eq("userId", "u1")], Some(SortKey::desc("timestamp"))));
    settle().await;
    assert_ok!(hook.set_params(&[Condition::eq("userId", "u1")], Some(SortKey::desc("timestamp"))));
    settle().await;

    assert_eq!(hook.opened(), 1);
    assert_eq!(store.listener_count().await, 1);
}

#[tokio::test]
async fn test_document_hook_keeps_data_on_connection_loss() {
    let store = Arc::new(InMemoryStore::default());
    store
        .seed("users", "u1", to_fields(&json!({"name": "Alice"})).unwrap())
        .await;

    let view = ViewModel::new(store.clone(), "users");
    let hook = view.use_document(Some("u1"));
    let mut rx = hook.watch();

    let loaded = wait_until(&mut rx, |s| !s.loading).await;
    assert!(loaded.error.is_none());
    let profile: Option<Profile> = assert_ok!(hook.typed());
    assert_eq!(
        profile,
        Some(Profile {
            id: "u1".into(),
            name: "Alice".into()
        })
    );

    store.set_offline(true).await;
    let failed = wait_until(&mut rx, |s| s.is_error()).await;
    let err = failed.error.unwrap();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(err.operation(), Some(Operation::Subscribe));
    assert!(!failed.loading);
    assert_eq!(
        failed.data.and_then(|doc| doc.get("name").cloned()),
        Some("Alice".into())
    );
}

#[tokio::test]
async fn test_only_latest_parameters_stay_subscribed() {
    let store = Arc::new(InMemoryStore::default());
    let view = ViewModel::new(store.clone(), "matchActivities");
    let mut hook = view.use_collection(&[Condition::eq("userId", "u0")], None).unwrap();

    for i in 1..5 {
        let uid = format!("u{}", i);
        hook.set_params(&[Condition::eq("userId", uid.as_str())], None).unwrap();
    }
    settle().await;

    assert_eq!(hook.opened(), 5);
    assert_eq!(hook.torn_down(), 4);
    assert_eq!(hook.active_handles(), 1);
    assert_eq!(store.listener_count().await, 1);
}

#[tokio::test]
async fn test_switching_document_ids() {
    let store = Arc::new(InMemoryStore::default());
    store.seed("users", "u1", to_fields(&json!({"name": "Alice"})).unwrap()).await;
    store.seed("users", "u2", to_fields(&json!({"name": "Bola"})).unwrap()).await;

    let view = ViewModel::new(store.clone(), "users");
    let mut hook = view.use_document(Some("u1"));
    let mut rx = hook.watch();
    wait_until(&mut rx, |s| !s.loading).await;

    hook.set_id(Some("u2"));
    let state = wait_until(&mut rx, |s| {
        s.data.as_ref().map(|doc| doc.id.as_str()) == Some("u2")
    })
    .await;
    assert!(!state.loading);

    hook.set_id(None);
    assert!(!hook.state().loading);
    assert_eq!(hook.active_handles(), 0);
    assert_eq!(hook.torn_down(), 2);
}

#[tokio::test]
async fn test_unmounted_hook_ignores_pushes() {
    let store = Arc::new(InMemoryStore::default());
    let view = ViewModel::new(store.clone(), "matches");
    let mut hook = view.use_document(Some("m1"));
    let mut rx = hook.watch();
    wait_until(&mut rx, |s| !s.loading).await;
    let before = hook.state();

    hook.unmount();
    store
        .seed("matches", "m1", to_fields(&json!({"status": "live"})).unwrap())
        .await;
    settle().await;

    assert!(!rx.has_changed().unwrap());
    assert_eq!(hook.state(), before);
    assert_eq!(store.listener_count().await, 0);
}

#[tokio::test]
async fn test_update_is_eventually_observed() {
    let store = Arc::new(InMemoryStore::default());
    store
        .seed(
            "userMatches",
            "u1_m1",
            to_fields(&json!({"userId": "u1", "matchId": "m1", "favorite": false})).unwrap(),
        )
        .await;

    let view = ViewModel::new(store.clone(), "userMatches");
    let hook = view.use_document(Some("u1_m1"));
    let mut rx = hook.watch();
    wait_until(&mut rx, |s| !s.loading).await;

    assert_ok!(view.update("u1_m1", &json!({"favorite": true})).await);
    let state = wait_until(&mut rx, |s| {
        s.data
            .as_ref()
            .and_then(|doc| doc.get("favorite"))
            .and_then(|v| v.as_bool())
            == Some(true)
    })
    .await;
    let doc = state.data.unwrap();
    assert_eq!(doc.get("matchId").and_then(|v| v.as_str()), Some("m1"));
}

#[tokio::test]
async fn test_mutation_errors_carry_the_operation() {
    let store = Arc::new(InMemoryStore::default());
    let view = ViewModel::new(store.clone(), "userMatches");

    let err = assert_err!(view.update("missing", &json!({"favorite": true})).await);
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.operation(), Some(Operation::Update));

    assert_ok!(view.create(&json!({"notes": ""}), Some("u1_m1")).await);
    let err = assert_err!(view.create(&json!({"notes": ""}), Some("u1_m1")).await);
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.operation(), Some(Operation::Create));
    assert!(!view.is_creating());
}

#[tokio::test]
async fn test_upsert_policy_creates_missing_documents() {
    let store = Arc::new(InMemoryStore::new(
        StoreConfig::default().update_policy(UpdatePolicy::Upsert),
    ));
    let view = ViewModel::new(store.clone(), "userMatches");

    assert_ok!(view.update("u1_m9", &json!({"favorite": true})).await);
    let doc = assert_ok!(view.fetch("u1_m9").await).unwrap();
    assert_eq!(doc.get("favorite").and_then(|v| v.as_bool()), Some(true));
}

#[tokio::test]
async fn test_mutations_broadcast_invalidations() {
    let store = Arc::new(InMemoryStore::default());
    let view = ViewModel::new(store, "notifications");
    let mut invalidations = view.invalidations();

    let id = view.create(&json!({"title": "Toss"}), None).await.unwrap();
    assert_eq!(invalidations.recv().await.unwrap(), "notifications");

    view.delete(&id).await.unwrap();
    assert_eq!(invalidations.recv().await.unwrap(), "notifications");
}
