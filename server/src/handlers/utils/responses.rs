use std::convert::Infallible;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::{BodyExt, Empty, Full, combinators::BoxBody};
use hyper::{Response, StatusCode, header};
use tracing::debug;

use super::headers::add_cors_headers;

pub fn full_body<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, Infallible> {
    Full::new(chunk.into()).boxed()
}

pub fn empty_body() -> BoxBody<Bytes, Infallible> {
    Empty::<Bytes>::new().boxed()
}

/// Plain-text response with CORS headers.
pub fn deliver_text(
    status: StatusCode,
    body: impl Into<Bytes>,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    debug!("Delivering text response with status {}", status);

    let res = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(full_body(body))
        .context("Failed to build text response")?;

    Ok(add_cors_headers(res))
}
