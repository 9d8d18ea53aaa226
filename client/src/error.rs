use thiserror::Error;

/// Client-side failures. Connection-level ones are recovered by reconnecting.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid event URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Connection failed: {0}")]
    Connect(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("Unexpected response status: {0}")]
    Status(http::StatusCode),

    #[error("Request build error: {0}")]
    Request(#[from] http::Error),

    #[error("Event stream closed by server")]
    StreamClosed,

    #[error("Malformed build event: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No async runtime available to host the listener")]
    NoRuntime,
}

pub type ClientResult<T> = Result<T, ClientError>;
