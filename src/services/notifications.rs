use crate::auth::AuthContext;
use crate::core::{Result, StoreError};
use crate::query::{Condition, SortKey};
use crate::store::RemoteStore;
use crate::view_model::{CollectionHook, ViewModel};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const NOTIFICATIONS: &str = "notifications";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub is_read: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// Per-user notification feed stored in the `notifications` collection
pub struct NotificationService {
    view: ViewModel,
    auth: Arc<dyn AuthContext>,
}

impl NotificationService {
    pub fn new(client: Arc<dyn RemoteStore>, auth: Arc<dyn AuthContext>) -> Self {
        Self {
            view: ViewModel::new(client, NOTIFICATIONS),
            auth,
        }
    }

    /// Signed-in user's notifications, newest first
    pub async fn user_notifications(&self) -> Result<Vec<Notification>> {
        let user = self.auth.require_user()?;
        let docs = self
            .view
            .fetch_all(&[user.owner_condition("userId")], Some(SortKey::desc("createdAt")))
            .await?;
        docs.iter().map(|doc| doc.decode()).collect()
    }

    /// Live version of [`Self::user_notifications`]
    pub fn watch_user_notifications(&self) -> Result<CollectionHook> {
        let user = self.auth.require_user()?;
        self.view
            .use_collection(&[user.owner_condition("userId")], Some(SortKey::desc("createdAt")))
    }

    /// Store a new unread notification stamped with the current time
    pub async fn add_notification(
        &self,
        user_id: &str,
        title: &str,
        message: &str,
        kind: NotificationKind,
    ) -> Result<String> {
        let notification = Notification {
            id: String::new(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            kind,
            is_read: false,
            created_at: Utc::now(),
        };
        self.view.create(&notification, None).await
    }

    pub async fn mark_read(&self, id: &str) -> Result<()> {
        self.view.update(id, &json!({ "isRead": true })).await
    }

    /// Mark every unread notification of `user_id` as read; returns how many
    /// were updated. Updates run concurrently and the first failure wins.
    pub async fn mark_all_read(&self, user_id: &str) -> Result<usize> {
        if user_id.is_empty() {
            return Err(StoreError::Unauthenticated);
        }
        let unread = self
            .view
            .fetch_all(
                &[Condition::eq("userId", user_id), Condition::eq("isRead", false)],
                None,
            )
            .await?;

        try_join_all(unread.iter().map(|doc| self.mark_read(&doc.id))).await?;
        debug!("Marked {} notifications read for {}", unread.len(), user_id);
        Ok(unread.len())
    }

    pub fn unread_count(notifications: &[Notification]) -> usize {
        notifications.iter().filter(|n| !n.is_read).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CurrentUser, StaticAuth};
    use crate::core::ErrorKind;
    use crate::store::InMemoryStore;

    fn service(auth: StaticAuth) -> (Arc<InMemoryStore>, NotificationService) {
        let store = Arc::new(InMemoryStore::default());
        let service = NotificationService::new(store.clone(), Arc::new(auth));
        (store, service)
    }

    #[tokio::test]
    async fn test_user_notifications_are_scoped_and_sorted() {
        let (_, service) = service(StaticAuth::signed_in(CurrentUser::new("u1")));
        service.add_notification("u1", "Toss", "IND won the toss", NotificationKind::Info).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        service.add_notification("u2", "Wicket", "Not for you", NotificationKind::Warning).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        service.add_notification("u1", "Result", "IND won by 5 wickets", NotificationKind::Success).await.unwrap();

        let notifications = service.user_notifications().await.unwrap();
        let titles: Vec<_> = notifications.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Result", "Toss"]);
        assert!(notifications.iter().all(|n| !n.id.is_empty()));
        assert_eq!(NotificationService::unread_count(&notifications), 2);
    }

    #[tokio::test]
    async fn test_mark_all_read() {
        let (_, service) = service(StaticAuth::signed_in(CurrentUser::new("u1")));
        let first = service.add_notification("u1", "A", "a", NotificationKind::Info).await.unwrap();
        service.add_notification("u1", "B", "b", NotificationKind::Info).await.unwrap();
        service.add_notification("u2", "C", "c", NotificationKind::Info).await.unwrap();
        service.mark_read(&first).await.unwrap();

        assert_eq!(service.mark_all_read("u1").await.unwrap(), 1);
        let notifications = service.user_notifications().await.unwrap();
        assert_eq!(NotificationService::unread_count(&notifications), 0);
        assert_eq!(service.mark_all_read("u1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_requires_signed_in_user() {
        let (_, service) = service(StaticAuth::signed_out());
        let err = service.user_notifications().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthenticated);
        assert!(service.watch_user_notifications().is_err());
    }
}
