/// End-to-end tests: a real listener on an ephemeral port, raw hyper
/// clients reading `buildEnd` frames off the wire.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, TcpStream};

use server::adapter::{BuildOutput, BuildResult, Diagnostic};
use server::{AppState, BuildResultAdapter};
use shared::types::{AppConfig, BuildEvent};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn start(config: AppConfig) -> (SocketAddr, AppState) {
    let state = AppState::new(config);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server::serve(
        listener,
        state.clone(),
        std::future::pending::<()>(),
    ));
    (addr, state)
}

async fn get(addr: SocketAddr, path: &str) -> Response<Incoming> {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    tokio::spawn(conn);

    let req = Request::get(path)
        .header("host", "localhost")
        .body(Empty::<Bytes>::new())
        .unwrap();
    sender.send_request(req).await.unwrap()
}

/// Read until one complete frame (terminated by a blank line) is buffered.
struct FrameReader {
    body: Incoming,
    buf: String,
}

impl FrameReader {
    fn new(res: Response<Incoming>) -> Self {
        Self {
            body: res.into_body(),
            buf: String::new(),
        }
    }

    async fn next_frame(&mut self) -> String {
        loop {
            if let Some(end) = self.buf.find("\n\n") {
                let frame = self.buf[..end + 2].to_string();
                self.buf.drain(..end + 2);
                return frame;
            }
            let frame = tokio::time::timeout(Duration::from_secs(5), self.body.frame())
                .await
                .expect("timed out waiting for frame")
                .expect("stream ended")
                .unwrap();
            if let Ok(data) = frame.into_data() {
                self.buf.push_str(std::str::from_utf8(&data).unwrap());
            }
        }
    }
}

fn field<'a>(frame: &'a str, name: &str) -> &'a str {
    frame
        .lines()
        .find_map(|l| l.strip_prefix(name).and_then(|r| r.strip_prefix(": ")))
        .unwrap()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stream_headers_are_sent_before_any_event() {
    let (addr, _state) = start(AppConfig::default()).await;
    let res = get(addr, "/build-events").await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "text/event-stream");
    assert_eq!(res.headers()["cache-control"], "no-cache");
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn unknown_path_is_404_plain_text() {
    let (addr, state) = start(AppConfig::default()).await;
    let res = get(addr, "/nope").await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(
        res.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    let body = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"Not found");
    assert_eq!(state.broadcaster.subscriber_count(), 0);
}

#[tokio::test]
async fn each_connection_counts_from_zero() {
    let (addr, state) = start(AppConfig::default()).await;

    let mut first = FrameReader::new(get(addr, "/build-events").await);
    state
        .broadcaster
        .publish(&BuildEvent::new(vec!["a.js".into()], vec![], vec![]));

    let mut second = FrameReader::new(get(addr, "/build-events").await);
    state
        .broadcaster
        .publish(&BuildEvent::new(vec!["b.js".into()], vec![], vec![]));

    let f0 = first.next_frame().await;
    let f1 = first.next_frame().await;
    assert_eq!(field(&f0, "id"), "0");
    assert_eq!(field(&f1, "id"), "1");

    let s0 = second.next_frame().await;
    assert_eq!(field(&s0, "id"), "0");
    assert_eq!(field(&s0, "event"), "buildEnd");
    let event: BuildEvent = serde_json::from_str(field(&s0, "data")).unwrap();
    assert_eq!(event.bundles, vec!["b.js"]);
}

#[tokio::test]
async fn three_streams_receive_identical_payloads() {
    let (addr, state) = start(AppConfig::default()).await;
    let mut readers = Vec::new();
    for _ in 0..3 {
        readers.push(FrameReader::new(get(addr, "/build-events").await));
    }

    let report = state.broadcaster.publish(&BuildEvent::new(
        vec![],
        vec![],
        vec!["<span style=\"color: yellow\">careful</span>".into()],
    ));
    assert_eq!(report.delivered, 3);

    let mut payloads = Vec::new();
    for reader in &mut readers {
        let frame = reader.next_frame().await;
        payloads.push(field(&frame, "data").to_string());
    }
    assert!(payloads.windows(2).all(|w| w[0] == w[1]));
}

#[tokio::test]
async fn disconnect_unregisters_subscriber() {
    let (addr, state) = start(AppConfig::default()).await;

    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    let conn_task = tokio::spawn(conn);
    let req = Request::get("/build-events")
        .header("host", "localhost")
        .body(Empty::<Bytes>::new())
        .unwrap();
    let res = sender.send_request(req).await.unwrap();
    assert_eq!(state.broadcaster.subscriber_count(), 1);

    // Closing the socket ends the stream; the server notices on read or on
    // its next write at the latest.
    conn_task.abort();
    drop(res);
    drop(sender);

    for _ in 0..100 {
        if state.broadcaster.subscriber_count() == 0 {
            return;
        }
        state.broadcaster.publish(&BuildEvent::default());
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("subscriber was not removed after disconnect");
}

#[tokio::test]
async fn subscriber_ceiling_returns_503() {
    let mut config = AppConfig::default();
    config.server.max_subscribers = Some(1);
    let (addr, _state) = start(config).await;

    let _held = get(addr, "/build-events").await;
    let res = get(addr, "/build-events").await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn build_cycle_to_frame() {
    let (addr, state) = start(AppConfig::default()).await;
    let adapter = BuildResultAdapter::new(Arc::clone(&state.broadcaster), &state.config.build);
    let mut reader = FrameReader::new(get(addr, "/build-events").await);

    let result = BuildResult {
        outputs: vec![BuildOutput {
            path: "dist/app.js".into(),
            entry_point: Some("src/app.ts".into()),
            contents: Some("console.log('hi')".into()),
        }],
        ..Default::default()
    };
    adapter.on_build_end(&result).await.unwrap();

    let frame = reader.next_frame().await;
    let event: BuildEvent = serde_json::from_str(field(&frame, "data")).unwrap();
    assert_eq!(event.bundles, vec!["dist/app.js"]);
    assert!(event.errors.is_empty());
    assert!(event.warnings.is_empty());

    let failing = BuildResult {
        outputs: result.outputs.clone(),
        errors: vec![Diagnostic::new("Expected \";\" but found \"}\"")],
        warnings: vec![],
    };
    adapter.on_build_end(&failing).await.unwrap();

    let frame = reader.next_frame().await;
    assert_eq!(field(&frame, "id"), "1");
    let event: BuildEvent = serde_json::from_str(field(&frame, "data")).unwrap();
    assert!(event.bundles.is_empty());
    assert_eq!(event.errors.len(), 1);
    assert!(event.errors[0].contains("&quot;;&quot;"));
}
