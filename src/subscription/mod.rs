//! Subscription Adapter
//!
//! Turns the store's listen primitive into cancellable handles that push the
//! complete result set to a callback on every change.

pub mod adapter;
pub mod target;

pub use adapter::{SubscriptionAdapter, SubscriptionHandle, SubscriptionState};
pub use target::{Snapshot, SubscriptionKey, SubscriptionTarget};
