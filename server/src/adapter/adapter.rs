use anyhow::{Context, Result};
use futures_util::future::join_all;
use shared::types::{BuildConfig, BuildEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::formatter::TerminalFormatter;
use super::host::{BuildOutput, BuildResult, Diagnostic, DiagnosticFormatter, DiagnosticKind};
use super::paths::PathPolicy;
use crate::broadcast::{Broadcaster, PublishReport};
use crate::dedup::{Artifact, ChangeDetector};
use crate::markup::{ansi_to_html, escape_html};

/// Turns one completed build cycle into one published [`BuildEvent`].
///
/// Owns the fingerprint table; cycles are processed one at a time.
pub struct BuildResultAdapter {
    detector: Arc<Mutex<ChangeDetector>>,
    broadcaster: Arc<Broadcaster<BuildEvent>>,
    formatter: Arc<dyn DiagnosticFormatter>,
    paths: PathPolicy,
    terminal_width: usize,
}

impl std::fmt::Debug for BuildResultAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildResultAdapter")
            .field("paths", &self.paths)
            .field("terminal_width", &self.terminal_width)
            .finish()
    }
}

impl BuildResultAdapter {
    pub fn new(broadcaster: Arc<Broadcaster<BuildEvent>>, build: &BuildConfig) -> Self {
        Self {
            detector: Arc::new(Mutex::new(ChangeDetector::new())),
            broadcaster,
            formatter: Arc::new(TerminalFormatter),
            paths: PathPolicy::new(
                build.abs_working_dir.as_ref().map(PathBuf::from),
                build.outdir.as_ref().map(PathBuf::from),
            ),
            terminal_width: build.terminal_width,
        }
    }

    /// Replace the default terminal formatter with the host tool's own.
    pub fn with_formatter(mut self, formatter: Arc<dyn DiagnosticFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Build-end callback. Never fails: an internal error is logged and the
    /// cycle publishes nothing.
    pub async fn on_build_end(&self, result: &BuildResult) -> Option<PublishReport> {
        match self.build_event(result).await {
            Ok(event) => {
                info!(
                    "Build finished: {} ({} bundles, {} errors, {} warnings)",
                    event.classification(),
                    event.bundles.len(),
                    event.errors.len(),
                    event.warnings.len()
                );
                Some(self.broadcaster.publish(&event))
            }
            Err(e) => {
                error!("Failed to process build result, no event published: {:#}", e);
                None
            }
        }
    }

    /// Compute the event for a build cycle without publishing it.
    pub async fn build_event(&self, result: &BuildResult) -> Result<BuildEvent> {
        let artifacts = self.load_artifacts(&result.outputs).await;

        // Hashing is CPU-bound; keep it off the async workers.
        let mut detector = Arc::clone(&self.detector).lock_owned().await;
        let changed = tokio::task::spawn_blocking(move || detector.detect(artifacts))
            .await
            .context("Fingerprinting task failed")?;
        debug!("{} changed artifacts", changed.len());

        let bundles = changed
            .iter()
            .map(|p| self.paths.present(std::path::Path::new(p)))
            .collect();

        let errors = self.format_all(&result.errors, DiagnosticKind::Error);
        let warnings = self.format_all(&result.warnings, DiagnosticKind::Warning);

        Ok(BuildEvent::new(bundles, errors, warnings))
    }

    /// Read every non-source-map output concurrently. Unreadable outputs are
    /// logged and left out.
    async fn load_artifacts(&self, outputs: &[BuildOutput]) -> Vec<Artifact> {
        let reads = outputs
            .iter()
            .filter(|o| !o.path.ends_with(".map"))
            .map(|output| async move {
                let resolved = self.paths.resolve(&output.path);
                let content = match &output.contents {
                    Some(text) => Ok(text.clone().into_bytes()),
                    None => tokio::fs::read(&resolved).await,
                };
                (output, resolved, content)
            });

        join_all(reads)
            .await
            .into_iter()
            .filter_map(|(output, resolved, content)| match content {
                Ok(bytes) => {
                    let entry = output
                        .entry_point
                        .clone()
                        .unwrap_or_else(|| output.path.clone());
                    Some(Artifact::new(entry, resolved.to_string_lossy(), bytes))
                }
                Err(e) => {
                    warn!("Skipping unreadable output {}: {}", resolved.display(), e);
                    None
                }
            })
            .collect()
    }

    fn format_all(&self, diagnostics: &[Diagnostic], kind: DiagnosticKind) -> Vec<String> {
        diagnostics
            .iter()
            .map(|d| self.format_one(d, kind))
            .collect()
    }

    /// Escape, then convert colour codes to spans. A formatter failure falls
    /// back to the bare diagnostic text.
    fn format_one(&self, diagnostic: &Diagnostic, kind: DiagnosticKind) -> String {
        let text = match self.formatter.format(diagnostic, kind, self.terminal_width) {
            Ok(text) => text,
            Err(e) => {
                warn!("Diagnostic formatter failed, using raw text: {}", e);
                diagnostic.text.clone()
            }
        };
        ansi_to_html(&escape_html(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as SyncMutex;

    fn adapter_with_sink() -> (BuildResultAdapter, Arc<SyncMutex<Vec<BuildEvent>>>) {
        let hub = Arc::new(Broadcaster::new());
        let sink = Arc::new(SyncMutex::new(Vec::new()));
        let sink_ref = Arc::clone(&sink);
        hub.subscribe(move |e: &BuildEvent| {
            sink_ref.lock().push(e.clone());
            Ok(())
        })
        .unwrap();
        (BuildResultAdapter::new(hub, &BuildConfig::default()), sink)
    }

    fn output(path: &str, entry: &str, body: &str) -> BuildOutput {
        BuildOutput {
            path: path.into(),
            entry_point: Some(entry.into()),
            contents: Some(body.into()),
        }
    }

    struct FailingFormatter;

    impl DiagnosticFormatter for FailingFormatter {
        fn format(&self, _: &Diagnostic, _: DiagnosticKind, _: usize) -> Result<String> {
            anyhow::bail!("formatter unavailable")
        }
    }

    #[tokio::test]
    async fn source_maps_are_ignored() {
        let (adapter, _) = adapter_with_sink();
        let result = BuildResult {
            outputs: vec![
                output("dist/a.js", "src/a.ts", "a"),
                output("dist/a.js.map", "src/a.ts", "{}"),
            ],
            ..Default::default()
        };
        let event = adapter.build_event(&result).await.unwrap();
        assert_eq!(event.bundles, vec!["dist/a.js"]);
    }

    #[tokio::test]
    async fn unchanged_rebuild_reports_no_bundles() {
        let (adapter, sink) = adapter_with_sink();
        let result = BuildResult {
            outputs: vec![output("dist/a.js", "src/a.ts", "a")],
            ..Default::default()
        };
        adapter.on_build_end(&result).await.unwrap();
        adapter.on_build_end(&result).await.unwrap();

        let events = sink.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].bundles, vec!["dist/a.js"]);
        assert!(events[1].bundles.is_empty());
    }

    #[tokio::test]
    async fn errors_suppress_bundles_and_are_html() {
        let (adapter, _) = adapter_with_sink();
        let result = BuildResult {
            outputs: vec![output("dist/a.js", "src/a.ts", "a")],
            errors: vec![Diagnostic::new("Unexpected \"<\"")],
            warnings: vec![Diagnostic::new("unused")],
        };
        let event = adapter.build_event(&result).await.unwrap();
        assert!(event.bundles.is_empty());
        assert_eq!(event.errors.len(), 1);
        assert!(event.errors[0].contains("<span style="));
        assert!(event.errors[0].contains("&lt;"));
        assert!(!event.errors[0].contains('\x1b'));
        assert_eq!(event.warnings.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_skipped_but_rest_is_published() {
        let (adapter, sink) = adapter_with_sink();
        let result = BuildResult {
            outputs: vec![
                BuildOutput {
                    path: "/nonexistent/dir/gone.js".into(),
                    entry_point: Some("gone.ts".into()),
                    contents: None,
                },
                output("dist/b.js", "src/b.ts", "b"),
            ],
            ..Default::default()
        };
        adapter.on_build_end(&result).await.unwrap();
        assert_eq!(sink.lock()[0].bundles, vec!["dist/b.js"]);
    }

    #[tokio::test]
    async fn formatter_failure_falls_back_to_escaped_text() {
        let (adapter, _) = adapter_with_sink();
        let adapter = adapter.with_formatter(Arc::new(FailingFormatter));
        let result = BuildResult {
            warnings: vec![Diagnostic::new("a < b")],
            ..Default::default()
        };
        let event = adapter.build_event(&result).await.unwrap();
        assert_eq!(event.warnings, vec!["a &lt; b"]);
    }

    #[tokio::test]
    async fn outputs_without_entry_point_are_keyed_by_path() {
        let (adapter, _) = adapter_with_sink();
        let chunk = |body: &str| BuildOutput {
            path: "dist/chunk.js".into(),
            entry_point: None,
            contents: Some(body.into()),
        };
        let first = BuildResult {
            outputs: vec![chunk("v1")],
            ..Default::default()
        };
        let second = BuildResult {
            outputs: vec![chunk("v1")],
            ..Default::default()
        };
        assert_eq!(adapter.build_event(&first).await.unwrap().bundles.len(), 1);
        assert!(adapter.build_event(&second).await.unwrap().bundles.is_empty());
    }
}
