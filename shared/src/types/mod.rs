pub mod build_event;
pub mod html;
pub mod server_config;
pub mod sse;

pub use self::build_event::{BUILD_END_EVENT, BuildEvent, Classification};
pub use self::html::escape_html;
pub use self::server_config::{AppConfig, BuildConfig, ClientConfig, ConfigError, ServerConfig};
pub use self::sse::{SseError, SseResult, format_frame};
