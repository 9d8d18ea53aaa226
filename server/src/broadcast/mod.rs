//! In-process publish/subscribe hub for completed builds.

mod hub;

pub use hub::{BroadcastError, Broadcaster, PublishReport, SubscriptionId};
