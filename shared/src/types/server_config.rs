use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base URL advertised to the browser. Independent of `bind`, so a server
    /// bound to `0.0.0.0` can still hand out `http://localhost:8001`.
    #[serde(default)]
    pub public_url: Option<String>,
    /// Ceiling on concurrently open event streams. `None` means unbounded.
    #[serde(default)]
    pub max_subscribers: Option<usize>,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_event_path")]
    pub event_path: String,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct BuildConfig {
    /// Directory that host-tool output paths are relative to.
    #[serde(default)]
    pub abs_working_dir: Option<String>,
    /// Reported bundle paths are made relative to this directory.
    #[serde(default)]
    pub outdir: Option<String>,
    #[serde(default = "default_terminal_width")]
    pub terminal_width: usize,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_dismiss_after")]
    pub dismiss_after_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl ServerConfig {
    /// Full bind address, e.g. `"0.0.0.0:8001"`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// URL the browser should connect to, without the event path.
    ///
    /// A wildcard bind is advertised as `localhost`.
    pub fn listen_url(&self) -> String {
        if let Some(url) = self.public_url.as_deref().filter(|u| !u.is_empty()) {
            return url.trim_end_matches('/').to_string();
        }
        let host = if self.bind == "0.0.0.0" {
            "localhost"
        } else {
            self.bind.as_str()
        };
        format!("http://{}:{}", host, self.port)
    }

    /// Full event-stream URL, e.g. `"http://localhost:8001/build-events"`
    pub fn event_url(&self) -> String {
        format!("{}{}", self.listen_url(), self.event_path)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            public_url: None,
            max_subscribers: None,
            idle_timeout_secs: default_idle_timeout(),
            event_path: default_event_path(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
            dismiss_after_secs: default_dismiss_after(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

pub fn default_bind() -> String {
    "0.0.0.0".to_string()
}

pub fn default_port() -> u16 {
    8001
}

/// 30 minutes; keeps quiet streams from being reaped by idle cleanup.
pub fn default_idle_timeout() -> u64 {
    30 * 60
}

pub fn default_event_path() -> String {
    "/build-events".to_string()
}

pub fn default_terminal_width() -> usize {
    100
}

pub fn default_initial_backoff() -> u64 {
    5_000
}

pub fn default_max_backoff() -> u64 {
    60_000
}

pub fn default_dismiss_after() -> u64 {
    10
}
