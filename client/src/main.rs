use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use client::{ClientOptions, listener};
use shared::config::load_config_or_default;

#[derive(Parser, Debug)]
#[command(
    name = "build-notify-client",
    about = "Follow a build notification stream from the terminal"
)]
struct Cli {
    /// TOML configuration file (shared with the server)
    #[arg(short, long)]
    config: Option<String>,

    /// Event stream URL; defaults to the one derived from the config
    #[arg(long)]
    url: Option<String>,
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
    let config = load_config_or_default(cli.config.as_deref()).context("Invalid configuration")?;

    let mut options = ClientOptions::from_config(&config);
    if let Some(url) = cli.url {
        options = options.with_url(url);
    }

    let handle = listener(options).context("Failed to start listener")?;
    info!("Following build notifications from {}", handle.url());
    let mut rendered = handle.subscribe();

    loop {
        tokio::select! {
            received = rendered.recv() => match received {
                Ok(notification) => println!("{}\n", notification.to_text()),
                Err(RecvError::Lagged(n)) => warn!("Skipped {} notifications", n),
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }
    Ok(())
}
