// shared/src/types/sse.rs
// Event-stream framing and errors

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SseError {
    #[error("Broadcast channel closed")]
    ChannelClosed,

    #[error("Failed to encode event: {0}")]
    Encode(String),
}

pub type SseResult<T> = Result<T, SseError>;

/// Serialise `data` as JSON and wrap it in a three-line event-stream frame
/// terminated by a blank line.
pub fn format_frame<T: Serialize>(event_type: &str, data: &T, id: u64) -> SseResult<String> {
    let data = serde_json::to_string(data).map_err(|e| SseError::Encode(e.to_string()))?;
    Ok(format!("event: {}\ndata: {}\nid: {}\n\n", event_type, data, id))
}
