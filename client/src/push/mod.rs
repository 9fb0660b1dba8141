//! Reconnecting push-channel subscriber.

pub mod subscriber;

pub use subscriber::{PushStatus, PushSubscriber, RosterPush, SubscriptionState};
