/// The process-wide listener. Kept in its own test binary because the guard
/// outlives any single test.
use client::{ClientOptions, listener};

#[tokio::test]
async fn second_call_returns_first_listener() {
    let first = listener(ClientOptions::default().with_url("http://127.0.0.1:9/build-events"))
        .unwrap();
    let second = listener(ClientOptions::default().with_url("http://127.0.0.1:10/other"))
        .unwrap();

    assert!(std::ptr::eq(first, second));
    assert_eq!(second.url(), "http://127.0.0.1:9/build-events");
}
