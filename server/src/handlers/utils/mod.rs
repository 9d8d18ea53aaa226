pub mod headers;
pub mod responses;

pub use headers::{add_cors_headers, add_event_stream_headers};
pub use responses::{deliver_text, empty_body, full_body};
