//! Domain services for the scorebook collections, built on [`ViewModel`].
//!
//! [`ViewModel`]: crate::view_model::ViewModel

pub mod activity;
pub mod notifications;
pub mod profiles;
pub mod user_matches;

pub use activity::{ActivityKind, MatchActivity, MatchActivityLog, MatchSummary};
pub use notifications::{Notification, NotificationKind, NotificationService};
pub use profiles::{ProfileService, UserProfile, UserType};
pub use user_matches::{SaveOutcome, UserMatch, UserMatchNotes};
