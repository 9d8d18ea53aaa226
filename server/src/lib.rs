//! Build-event notification server.
//!
//! A build tool hands each completed build cycle to a [`BuildResultAdapter`],
//! which works out which artifacts changed, renders diagnostics to HTML and
//! publishes one [`BuildEvent`] through the [`Broadcaster`]. Every open
//! browser stream on the event path receives it as a `buildEnd` frame.

use std::sync::Arc;

use shared::types::{AppConfig, BuildEvent};

pub mod adapter;
pub mod bootstrap;
pub mod broadcast;
pub mod dedup;
pub mod handlers;
pub mod markup;
pub mod serve;

pub use adapter::BuildResultAdapter;
pub use broadcast::Broadcaster;
pub use serve::{bind, serve};

/// State shared by every connection.
#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub broadcaster: Arc<Broadcaster<BuildEvent>>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let broadcaster = Broadcaster::with_max_subscribers(config.server.max_subscribers);
        Self {
            config: Arc::new(config),
            broadcaster: Arc::new(broadcaster),
        }
    }
}
