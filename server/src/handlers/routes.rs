use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Method, Request, Response, StatusCode};
use tracing::{debug, warn};

use crate::AppState;
use crate::handlers::sse::handle_build_events;
use crate::handlers::utils::{add_cors_headers, deliver_text, empty_body};

// ---------------------------------------------------------------------------
// Handler type
// ---------------------------------------------------------------------------

type RouteHandler = Box<
    dyn Fn(
            Request<hyper::body::Incoming>,
            AppState,
        )
            -> Pin<Box<dyn Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send>>
        + Send
        + Sync,
>;

struct Route {
    method: Method,
    path: String,
    handler: RouteHandler,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub struct Router {
    routes: Vec<Route>,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("routes_count", &self.routes.len())
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn get<F, Fut>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(Request<hyper::body::Incoming>, AppState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response<BoxBody<Bytes, Infallible>>>> + Send + 'static,
    {
        self.routes.push(Route {
            method: Method::GET,
            path: path.to_string(),
            handler: Box::new(move |req, state| Box::pin(handler(req, state))),
        });
        self
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    pub async fn route(
        &self,
        req: Request<hyper::body::Incoming>,
        state: AppState,
    ) -> Result<Response<BoxBody<Bytes, Infallible>>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        debug!("{} {}", method, path);

        let mut path_known = false;
        for route in &self.routes {
            if route.path != path {
                continue;
            }
            path_known = true;
            if route.method == method {
                return (route.handler)(req, state).await;
            }
        }

        if path_known && method == Method::OPTIONS {
            return preflight();
        }

        warn!("No route for {} {}", method, path);
        deliver_text(StatusCode::NOT_FOUND, "Not found").context("Failed to deliver 404 response")
    }
}

fn preflight() -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let res = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .body(empty_body())
        .context("Failed to build preflight response")?;
    Ok(add_cors_headers(res))
}

/// The notification server exposes a single route: the build-event stream.
pub fn build_router(event_path: &str) -> Router {
    Router::new().get(event_path, |_req, state| handle_build_events(state))
}
