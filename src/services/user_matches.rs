use crate::auth::AuthContext;
use crate::core::Result;
use crate::store::RemoteStore;
use crate::view_model::{DocumentHook, ViewModel};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const USER_MATCHES: &str = "userMatches";

/// A user's private notes and favorite flag for one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMatch {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub match_id: String,
    pub user_id: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub favorite: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
}

pub struct UserMatchNotes {
    view: ViewModel,
    auth: Arc<dyn AuthContext>,
}

impl UserMatchNotes {
    pub fn new(client: Arc<dyn RemoteStore>, auth: Arc<dyn AuthContext>) -> Self {
        Self {
            view: ViewModel::new(client, USER_MATCHES),
            auth,
        }
    }

    /// One record per user and match
    pub fn document_id(uid: &str, match_id: &str) -> String {
        format!("{}_{}", uid, match_id)
    }

    pub async fn load(&self, match_id: &str) -> Result<Option<UserMatch>> {
        let user = self.auth.require_user()?;
        match self.view.fetch(&Self::document_id(user.uid(), match_id)).await? {
            Some(doc) => doc.decode().map(Some),
            None => Ok(None),
        }
    }

    /// Live record for the signed-in user. Signed out, the hook stays idle.
    pub fn watch(&self, match_id: &str) -> DocumentHook {
        let id = self
            .auth
            .current_user()
            .map(|user| Self::document_id(user.uid(), match_id));
        self.view.use_document(id.as_deref())
    }

    pub async fn save_notes(&self, match_id: &str, notes: &str, favorite: bool) -> Result<SaveOutcome> {
        let user = self.auth.require_user()?;
        let id = Self::document_id(user.uid(), match_id);

        if self.view.fetch(&id).await?.is_some() {
            self.view
                .update(&id, &json!({ "notes": notes, "favorite": favorite }))
                .await?;
            return Ok(SaveOutcome::Updated);
        }

        let record = UserMatch {
            id: String::new(),
            match_id: match_id.to_string(),
            user_id: user.uid().to_string(),
            notes: notes.to_string(),
            favorite,
            created_at: Utc::now(),
        };
        self.view.create(&record, Some(&id)).await?;
        debug!("Created {} for {}", id, user.uid());
        Ok(SaveOutcome::Created)
    }

    /// Flip the favorite flag, creating an empty record when none exists.
    /// Returns the new flag.
    pub async fn toggle_favorite(&self, match_id: &str) -> Result<bool> {
        match self.load(match_id).await? {
            Some(existing) => {
                let favorite = !existing.favorite;
                self.view
                    .update(&existing.id, &json!({ "favorite": favorite }))
                    .await?;
                Ok(favorite)
            }
            None => {
                self.save_notes(match_id, "", true).await?;
                Ok(true)
            }
        }
    }
}
