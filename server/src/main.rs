use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use server::adapter::BuildResult;
use server::{AppState, BuildResultAdapter, bootstrap};
use shared::config::{load_config_or_default, validate_config};
use shared::types::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "build-notify", about = "Browser notifications for background builds")]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Listen host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Listen port
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Base URL advertised to the browser
    #[arg(long, global = true)]
    public_url: Option<String>,

    /// Ceiling on concurrently open event streams
    #[arg(long, global = true)]
    max_subscribers: Option<usize>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the server, reading one JSON build result per line from stdin
    Serve,
    /// Print the browser bootstrap script
    ClientScript,
    /// Prepend the bootstrap script to an emitted file
    Inject { file: PathBuf },
}

impl Cli {
    fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = load_config_or_default(self.config.as_deref())?;
        if let Some(host) = &self.host {
            config.server.bind = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.public_url {
            config.server.public_url = Some(url.clone());
        }
        if self.max_subscribers.is_some() {
            config.server.max_subscribers = self.max_subscribers;
        }
        validate_config(&config)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.resolve_config().context("Invalid configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await,
        Command::ClientScript => {
            println!("{}", bootstrap::client_script(&config)?);
            Ok(())
        }
        Command::Inject { file } => {
            let script = bootstrap::client_script(&config)?;
            bootstrap::inject_into_file(&file, &script).await
        }
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    let state = AppState::new(config);
    let adapter = Arc::new(BuildResultAdapter::new(
        Arc::clone(&state.broadcaster),
        &state.config.build,
    ));

    let listener = server::bind(&state).await?;
    let server_task = tokio::spawn(server::serve(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {}", e);
        }
    }));

    tokio::spawn(read_build_results(adapter));

    server_task.await.context("Server task failed")??;
    info!("Server closed");
    Ok(())
}

/// Feed newline-delimited JSON build results to the adapter, one cycle per
/// line, until stdin closes.
async fn read_build_results(adapter: Arc<BuildResultAdapter>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => match serde_json::from_str::<BuildResult>(&line) {
                Ok(result) => {
                    adapter.on_build_end(&result).await;
                }
                Err(e) => warn!("Ignoring malformed build result: {}", e),
            },
            Ok(None) => {
                info!("Build result input closed; still serving streams");
                break;
            }
            Err(e) => {
                warn!("Failed to read build results: {}", e);
                break;
            }
        }
    }
}
