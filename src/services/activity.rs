use crate::core::Result;
use crate::query::{Condition, SortKey};
use crate::store::RemoteStore;
use crate::view_model::{CollectionHook, ViewModel};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const MATCH_ACTIVITIES: &str = "matchActivities";
pub const MATCHES: &str = "matches";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    View,
    Favorite,
    Note,
    Share,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchActivity {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub user_id: String,
    pub match_id: String,
    pub match_title: String,
    pub activity_type: ActivityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

/// Match data as received from the scores feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub teams: Vec<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncedMatch<'a> {
    #[serde(flatten)]
    summary: &'a MatchSummary,
    synced_by: &'a str,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    synced_at: DateTime<Utc>,
}

fn user_activity_query(user_id: &str) -> (Vec<Condition>, Option<SortKey>) {
    (
        vec![Condition::eq("userId", user_id)],
        Some(SortKey::desc("timestamp")),
    )
}

/// History of what a user did with matches (viewed, favorited, shared...)
pub struct MatchActivityLog {
    activities: ViewModel,
    matches: ViewModel,
}

impl MatchActivityLog {
    pub fn new(client: Arc<dyn RemoteStore>) -> Self {
        Self {
            activities: ViewModel::new(Arc::clone(&client), MATCH_ACTIVITIES),
            matches: ViewModel::new(client, MATCHES),
        }
    }

    pub async fn log_activity(
        &self,
        user_id: &str,
        match_id: &str,
        match_title: &str,
        kind: ActivityKind,
        details: Option<&str>,
    ) -> Result<String> {
        let activity = MatchActivity {
            id: String::new(),
            user_id: user_id.to_string(),
            match_id: match_id.to_string(),
            match_title: match_title.to_string(),
            activity_type: kind,
            details: details.map(str::to_string),
            timestamp: Utc::now(),
        };
        self.activities.create(&activity, None).await
    }

    /// A user's activity, newest first
    pub async fn user_activity(&self, user_id: &str) -> Result<Vec<MatchActivity>> {
        let (conditions, sort) = user_activity_query(user_id);
        let docs = self.activities.fetch_all(&conditions, sort).await?;
        docs.iter().map(|doc| doc.decode()).collect()
    }

    pub fn watch_user_activity(&self, user_id: &str) -> Result<CollectionHook> {
        let (conditions, sort) = user_activity_query(user_id);
        self.activities.use_collection(&conditions, sort)
    }

    /// Copy a match into the shared `matches` collection and record a
    /// `share` activity for it. Returns the stored match document id.
    pub async fn sync_match(&self, user_id: &str, summary: &MatchSummary) -> Result<String> {
        let synced = SyncedMatch {
            summary,
            synced_by: user_id,
            synced_at: Utc::now(),
        };
        let id = self.matches.create(&synced, None).await?;
        info!("Match {} synced by {} as {}", summary.id, user_id, id);

        self.log_activity(
            user_id,
            &summary.id,
            &summary.title,
            ActivityKind::Share,
            Some("Synced match data"),
        )
        .await?;
        Ok(id)
    }

    pub async fn synced_match(&self, id: &str) -> Result<Option<MatchSummary>> {
        match self.matches.fetch(id).await? {
            Some(doc) => doc.decode().map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn summary() -> MatchSummary {
        MatchSummary {
            id: "m42".into(),
            title: "IND vs AUS, 3rd ODI".into(),
            teams: vec!["IND".into(), "AUS".into()],
            status: "live".into(),
            venue: Some("Wankhede".into()),
        }
    }

    #[tokio::test]
    async fn test_user_activity_newest_first() {
        let log = MatchActivityLog::new(Arc::new(InMemoryStore::default()));
        log.log_activity("u1", "m1", "First", ActivityKind::View, None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        log.log_activity("u2", "m1", "First", ActivityKind::View, None).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        log.log_activity("u1", "m2", "Second", ActivityKind::Note, Some("what a catch")).await.unwrap();

        let activity = log.user_activity("u1").await.unwrap();
        assert_eq!(activity.len(), 2);
        assert_eq!(activity[0].match_id, "m2");
        assert_eq!(activity[0].details.as_deref(), Some("what a catch"));
        assert_eq!(activity[1].activity_type, ActivityKind::View);
    }

    #[tokio::test]
    async fn test_sync_match_logs_share() {
        let store = Arc::new(InMemoryStore::default());
        let log = MatchActivityLog::new(store.clone());

        let id = log.sync_match("u1", &summary()).await.unwrap();
        assert_eq!(log.synced_match(&id).await.unwrap(), Some(summary()));

        let activity = log.user_activity("u1").await.unwrap();
        assert_eq!(activity.len(), 1);
        assert_eq!(activity[0].activity_type, ActivityKind::Share);
        assert_eq!(activity[0].match_title, "IND vs AUS, 3rd ODI");
    }
}
