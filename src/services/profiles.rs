use super::SaveOutcome;
use crate::auth::{AuthContext, CurrentUser};
use crate::core::Result;
use crate::store::{RemoteStore, SetMode};
use crate::view_model::{DocumentHook, ViewModel};
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const USERS: &str = "users";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    #[default]
    Spectator,
    Player,
    Admin,
}

/// Profile stored at `users/{uid}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default, skip_serializing)]
    pub id: String,
    pub uid: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub user_type: UserType,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    fn for_user(user: &CurrentUser, user_type: UserType, now: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            uid: user.uid().to_string(),
            display_name: user.display_name().map(str::to_string),
            email: user.email().map(str::to_string),
            photo_url: user.photo_url().map(str::to_string),
            user_type,
            created_at: now,
            last_sign_in_at: Some(now),
        }
    }
}

/// Identity fields refreshed on every sign-in. Unknown values are left out
/// so a merge never blanks what the profile already holds.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignIn<'a> {
    uid: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(rename = "photoURL", skip_serializing_if = "Option::is_none")]
    photo_url: Option<&'a str>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    last_sign_in_at: DateTime<Utc>,
}

/// The signed-in user's profile document
pub struct ProfileService {
    view: ViewModel,
    auth: Arc<dyn AuthContext>,
}

impl ProfileService {
    pub fn new(client: Arc<dyn RemoteStore>, auth: Arc<dyn AuthContext>) -> Self {
        Self {
            view: ViewModel::new(client, USERS),
            auth,
        }
    }

    /// Write a fresh profile for the signed-in user, replacing any existing one
    pub async fn register(&self, display_name: Option<&str>, user_type: UserType) -> Result<UserProfile> {
        let user = self.auth.require_user()?;
        let mut profile = UserProfile::for_user(&user, user_type, Utc::now());
        if let Some(name) = display_name {
            profile.display_name = Some(name.to_string());
        }
        self.view.set(user.uid(), &profile, SetMode::Overwrite).await?;
        profile.id = user.uid().to_string();
        Ok(profile)
    }

    /// Create-or-merge after a provider sign-in.
    ///
    /// A first sign-in writes a spectator profile. Later ones merge the
    /// provider's identity fields and the sign-in time, keeping `userType`
    /// and `createdAt`.
    pub async fn record_sign_in(&self) -> Result<SaveOutcome> {
        let user = self.auth.require_user()?;
        let now = Utc::now();

        if self.view.fetch(user.uid()).await?.is_none() {
            let profile = UserProfile::for_user(&user, UserType::Spectator, now);
            self.view.set(user.uid(), &profile, SetMode::Merge).await?;
            debug!("Created profile for {}", user.uid());
            return Ok(SaveOutcome::Created);
        }

        let sign_in = SignIn {
            uid: user.uid(),
            display_name: user.display_name(),
            email: user.email(),
            photo_url: user.photo_url(),
            last_sign_in_at: now,
        };
        self.view.set(user.uid(), &sign_in, SetMode::Merge).await?;
        Ok(SaveOutcome::Updated)
    }

    pub async fn profile(&self) -> Result<Option<UserProfile>> {
        let user = self.auth.require_user()?;
        match self.view.fetch(user.uid()).await? {
            Some(doc) => doc.decode().map(Some),
            None => Ok(None),
        }
    }

    /// Live profile of the signed-in user. Signed out, the hook stays idle.
    pub fn watch(&self) -> DocumentHook {
        let uid = self.auth.current_user().map(|user| user.uid().to_string());
        self.view.use_document(uid.as_deref())
    }
}
