mod sse;

pub use sse::{SubscriptionGuard, handle_build_events, open_stream};
