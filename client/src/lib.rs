//! Client runtime for the build notification stream.
//!
//! Holds at most one live connection per process (the analogue of one per
//! browser page), reconnects with exponential backoff and keeps a stack of
//! rendered notifications.

pub mod backoff;
pub mod error;
pub mod guard;
pub mod notification;
pub mod parser;
pub mod runtime;

pub use backoff::{Backoff, ConnectionMachine, ConnectionState};
pub use error::{ClientError, ClientResult};
pub use guard::PageGuard;
pub use notification::{Notification, NotificationStack};
pub use parser::{EventStreamParser, StreamMessage};
pub use runtime::{ClientOptions, ListenerHandle, ReceivedEvent, listener};
