use crate::core::{Result, StoreError};
use crate::query::Condition;
use std::sync::{PoisonError, RwLock};

/// Signed-in user as reported by the authentication provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    uid: String,
    display_name: Option<String>,
    email: Option<String>,
    photo_url: Option<String>,
}

impl CurrentUser {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            display_name: None,
            email: None,
            photo_url: None,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_photo_url(mut self, url: impl Into<String>) -> Self {
        self.photo_url = Some(url.into());
        self
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn photo_url(&self) -> Option<&str> {
        self.photo_url.as_deref()
    }

    /// `owner_field == uid`, the usual scope for per-user collections
    pub fn owner_condition(&self, owner_field: &str) -> Condition {
        Condition::eq(owner_field, self.uid.as_str())
    }
}

/// Authentication boundary: who, if anyone, is signed in
pub trait AuthContext: Send + Sync {
    fn current_user(&self) -> Option<CurrentUser>;

    fn require_user(&self) -> Result<CurrentUser> {
        self.current_user().ok_or(StoreError::Unauthenticated)
    }
}

/// Auth context holding a user set by the caller.
///
/// Stands in for the real provider in tests and the demo binary.
#[derive(Debug, Default)]
pub struct StaticAuth {
    user: RwLock<Option<CurrentUser>>,
}

impl StaticAuth {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn signed_in(user: CurrentUser) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    pub fn sign_in(&self, user: CurrentUser) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    pub fn sign_out(&self) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl AuthContext for StaticAuth {
    fn current_user(&self) -> Option<CurrentUser> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
