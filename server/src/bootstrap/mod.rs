//! Browser bootstrap script and banner injection.

use anyhow::{Context, Result};
use shared::types::AppConfig;
use std::path::Path;
use tracing::info;

const CLIENT_TEMPLATE: &str = include_str!("../../assets/client.js");

/// The client runtime with its event URL and timings baked in.
pub fn client_script(config: &AppConfig) -> Result<String> {
    let url = serde_json::to_string(&config.server.event_url())
        .context("Failed to encode event URL")?;

    Ok(CLIENT_TEMPLATE
        .replace("__EVENT_URL__", &url)
        .replace(
            "__INITIAL_BACKOFF_MS__",
            &config.client.initial_backoff_ms.to_string(),
        )
        .replace("__MAX_BACKOFF_MS__", &config.client.max_backoff_ms.to_string())
        .replace(
            "__DISMISS_AFTER_MS__",
            &(config.client.dismiss_after_secs * 1000).to_string(),
        ))
}

/// Prepend `script` to an existing banner, or use it alone.
pub fn inject_banner(existing: Option<&str>, script: &str) -> String {
    match existing {
        Some(banner) if !banner.is_empty() => format!("{}\n{}", script, banner),
        _ => script.to_string(),
    }
}

/// Prepend the client script to an emitted file in place.
pub async fn inject_into_file(path: &Path, script: &str) -> Result<()> {
    let current = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if current.starts_with(script) {
        info!("{} already carries the client script", path.display());
        return Ok(());
    }

    tokio::fs::write(path, inject_banner(Some(&current), script))
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!("Injected client script into {}", path.display());
    Ok(())
}
