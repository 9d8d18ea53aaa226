use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::Uri;
use http::header::{ACCEPT, HOST};
use http_body_util::{BodyExt, Empty};
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use shared::types::{AppConfig, BUILD_END_EVENT, BuildEvent};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::backoff::{Backoff, ConnectionMachine, ConnectionState};
use crate::error::{ClientError, ClientResult};
use crate::guard::PageGuard;
use crate::notification::{Notification, NotificationStack};
use crate::parser::EventStreamParser;

/// How often auto-dismiss deadlines are checked.
const EXPIRY_TICK: Duration = Duration::from_millis(250);

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub event_url: String,
    pub backoff: Backoff,
    pub dismiss_after: Duration,
}

impl ClientOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            event_url: config.server.event_url(),
            backoff: Backoff::new(
                Duration::from_millis(config.client.initial_backoff_ms),
                Duration::from_millis(config.client.max_backoff_ms),
            ),
            dismiss_after: Duration::from_secs(config.client.dismiss_after_secs),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.event_url = url.into();
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// A decoded `buildEnd` message and the frame id it arrived with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedEvent {
    pub id: Option<String>,
    pub event: BuildEvent,
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

/// A live, self-reconnecting subscription plus the notifications it has
/// rendered.
#[derive(Debug)]
pub struct ListenerHandle {
    url: String,
    machine: Arc<Mutex<ConnectionMachine>>,
    stack: Arc<Mutex<NotificationStack>>,
    rendered: broadcast::Sender<Notification>,
}

static LISTENER: PageGuard<ListenerHandle> = PageGuard::new();

/// Process-wide listener. The first call starts it; later calls return the
/// same handle and ignore their options.
pub fn listener(options: ClientOptions) -> ClientResult<&'static ListenerHandle> {
    if let Some(existing) = LISTENER.get() {
        debug!("Build notification listener already running, reusing it");
        return Ok(existing);
    }
    // Validate before touching the guard so a bad URL does not poison it.
    let uri = parse_event_url(&options.event_url)?;
    tokio::runtime::Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
    Ok(LISTENER.get_or_init(|| ListenerHandle::spawn(uri, options)))
}

impl ListenerHandle {
    /// Start an independent listener, bypassing the process-wide guard.
    /// Must be called from within a tokio runtime.
    pub fn start(options: ClientOptions) -> ClientResult<Self> {
        let uri = parse_event_url(&options.event_url)?;
        tokio::runtime::Handle::try_current().map_err(|_| ClientError::NoRuntime)?;
        Ok(Self::spawn(uri, options))
    }

    fn spawn(uri: Uri, options: ClientOptions) -> Self {
        let machine = Arc::new(Mutex::new(ConnectionMachine::new(options.backoff)));
        let stack = Arc::new(Mutex::new(NotificationStack::new(options.dismiss_after)));
        let (rendered, _) = broadcast::channel(64);
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(run_connection(uri, Arc::clone(&machine), tx));
        tokio::spawn(run_renderer(rx, Arc::clone(&stack), rendered.clone()));

        Self {
            url: options.event_url,
            machine,
            stack,
            rendered,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> ConnectionState {
        self.machine.lock().state()
    }

    pub fn failures(&self) -> u32 {
        self.machine.lock().failures()
    }

    /// Wait that will be used for the next reconnect.
    pub fn next_backoff(&self) -> Duration {
        self.machine.lock().backoff().current()
    }

    /// Every notification rendered after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.rendered.subscribe()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.stack.lock().notifications().to_vec()
    }

    pub fn dismiss(&self, dom_id: &str) -> bool {
        self.stack.lock().dismiss(dom_id)
    }

    pub fn container_html(&self) -> Option<String> {
        self.stack.lock().to_html()
    }
}

fn parse_event_url(url: &str) -> ClientResult<Uri> {
    let uri: Uri = url
        .parse()
        .map_err(|e: http::uri::InvalidUri| ClientError::InvalidUrl(format!("{}: {}", url, e)))?;
    match uri.scheme_str() {
        Some("http") => {}
        Some(other) => return Err(ClientError::UnsupportedScheme(other.to_string())),
        None => return Err(ClientError::InvalidUrl(format!("{}: missing scheme", url))),
    }
    if uri.host().is_none() {
        return Err(ClientError::InvalidUrl(format!("{}: missing host", url)));
    }
    Ok(uri)
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

async fn run_connection(
    uri: Uri,
    machine: Arc<Mutex<ConnectionMachine>>,
    tx: mpsc::UnboundedSender<ReceivedEvent>,
) {
    loop {
        if !machine.lock().begin_connect() {
            warn!("Connection attempt requested while not disconnected");
            return;
        }

        let err = match stream_once(&uri, &machine, &tx).await {
            Ok(()) => ClientError::StreamClosed,
            Err(e) => e,
        };
        let wait = machine.lock().failed();
        error!(
            "connection failed ({}), attempting reconnect in {} seconds",
            err,
            wait.as_secs_f64()
        );

        if tx.is_closed() {
            debug!("Renderer gone, stopping reconnect loop");
            return;
        }
        tokio::time::sleep(wait).await;
    }
}

/// One connection: returns `Ok` when the server ends the stream cleanly.
async fn stream_once(
    uri: &Uri,
    machine: &Mutex<ConnectionMachine>,
    tx: &mpsc::UnboundedSender<ReceivedEvent>,
) -> ClientResult<()> {
    let host = uri.host().unwrap_or("localhost");
    let port = uri.port_u16().unwrap_or(80);
    let authority = uri.authority().map_or(host, |a| a.as_str());
    let path = uri.path_and_query().map_or("/", |p| p.as_str());

    let stream = TcpStream::connect((host, port)).await?;
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!("Event stream connection ended: {}", e);
        }
    });

    let req = Request::get(path)
        .header(HOST, authority)
        .header(ACCEPT, "text/event-stream")
        .body(Empty::<Bytes>::new())?;
    let res = sender.send_request(req).await?;
    if res.status() != StatusCode::OK {
        return Err(ClientError::Status(res.status()));
    }

    machine.lock().opened();
    info!("Connected to build notification stream at {}", uri);

    let mut body = res.into_body();
    let mut parser = EventStreamParser::new();
    while let Some(frame) = body.frame().await {
        let Ok(data) = frame?.into_data() else {
            continue;
        };
        for msg in parser.feed(&data) {
            if msg.event != BUILD_END_EVENT {
                debug!("Ignoring '{}' message", msg.event);
                continue;
            }
            match serde_json::from_str::<BuildEvent>(&msg.data) {
                Ok(event) => {
                    if tx.send(ReceivedEvent { id: msg.id, event }).is_err() {
                        return Ok(());
                    }
                }
                Err(e) => warn!("{}", ClientError::Decode(e)),
            }
        }
    }
    Ok(())
}

async fn run_renderer(
    mut rx: mpsc::UnboundedReceiver<ReceivedEvent>,
    stack: Arc<Mutex<NotificationStack>>,
    rendered: broadcast::Sender<Notification>,
) {
    let mut tick = tokio::time::interval(EXPIRY_TICK);
    let mut fallback_id: u64 = 0;

    loop {
        tokio::select! {
            received = rx.recv() => {
                let Some(received) = received else { return };
                let id = received.id.unwrap_or_else(|| {
                    fallback_id += 1;
                    format!("local-{}", fallback_id)
                });
                let notification = stack.lock().push(&received.event, &id, Instant::now());
                info!(
                    "Build {} notification {} ({} bundles)",
                    notification.classification,
                    notification.dom_id,
                    notification.bundles.len()
                );
                // No receivers is fine.
                let _ = rendered.send(notification);
            }
            _ = tick.tick() => {
                for id in stack.lock().expire(Instant::now()) {
                    debug!("Auto-dismissed {}", id);
                }
            }
        }
    }
}
