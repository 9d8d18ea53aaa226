use hyper::header::{self, HeaderValue};

/// Open CORS: any page on any origin may subscribe.
pub fn add_cors_headers<T>(mut res: hyper::Response<T>) -> hyper::Response<T> {
    let headers = res.headers_mut();

    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );

    res
}

/// Headers that mark a response as a long-lived, uncached event stream.
pub fn add_event_stream_headers<T>(mut res: hyper::Response<T>) -> hyper::Response<T> {
    let headers = res.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    // Stop reverse proxies from buffering frames.
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));

    add_cors_headers(res)
}
