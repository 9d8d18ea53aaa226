use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::debug;

/// One produced output, identified by the entry point that produced it.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub entry_point: String,
    pub path: String,
    pub content: Vec<u8>,
}

impl Artifact {
    pub fn new(entry_point: impl Into<String>, path: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            entry_point: entry_point.into(),
            path: path.into(),
            content,
        }
    }
}

/// Hex-encoded SHA-256 of `content` (64 characters).
pub fn fingerprint(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Remembers the last fingerprint seen per entry point and reports which
/// artifacts changed since.
///
/// Entries are upserted and never pruned; an entry point that stops
/// producing output simply keeps its last fingerprint.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    seen: HashMap<String, String>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the paths of `artifacts` whose content differs from the last
    /// recorded fingerprint for their entry point, in input order.
    pub fn detect<I>(&mut self, artifacts: I) -> Vec<String>
    where
        I: IntoIterator<Item = Artifact>,
    {
        let mut changed = Vec::new();

        for artifact in artifacts {
            let digest = fingerprint(&artifact.content);
            match self.seen.get(&artifact.entry_point) {
                Some(previous) if *previous == digest => {
                    debug!("Unchanged artifact: {}", artifact.path);
                }
                _ => {
                    debug!(
                        "Changed artifact: {} (entry point {})",
                        artifact.path, artifact.entry_point
                    );
                    self.seen.insert(artifact.entry_point, digest);
                    changed.push(artifact.path);
                }
            }
        }

        changed
    }

    /// Last recorded fingerprint for an entry point.
    pub fn fingerprint_of(&self, entry_point: &str) -> Option<&str> {
        self.seen.get(entry_point).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(entry: &str, path: &str, body: &[u8]) -> Artifact {
        Artifact::new(entry, path, body.to_vec())
    }

    #[test]
    fn first_sighting_is_a_change() {
        let mut detector = ChangeDetector::new();
        let changed = detector.detect(vec![artifact("src/a.ts", "dist/a.js", b"a")]);
        assert_eq!(changed, vec!["dist/a.js"]);
        assert_eq!(detector.len(), 1);
    }

    #[test]
    fn identical_content_is_stable() {
        let mut detector = ChangeDetector::new();
        detector.detect(vec![artifact("src/a.ts", "dist/a.js", b"same")]);
        let second = detector.detect(vec![artifact("src/a.ts", "dist/a.js", b"same")]);
        assert!(second.is_empty());
    }

    #[test]
    fn single_byte_change_is_reported_once() {
        let mut detector = ChangeDetector::new();
        detector.detect(vec![artifact("src/a.ts", "dist/a.js", b"abcdef")]);

        let changed = detector.detect(vec![artifact("src/a.ts", "dist/a.js", b"abcdeF")]);
        assert_eq!(changed, vec!["dist/a.js"]);

        let again = detector.detect(vec![artifact("src/a.ts", "dist/a.js", b"abcdeF")]);
        assert!(again.is_empty());
    }

    #[test]
    fn output_order_follows_input_order() {
        let mut detector = ChangeDetector::new();
        let changed = detector.detect(vec![
            artifact("z.ts", "dist/z.js", b"z"),
            artifact("a.ts", "dist/a.js", b"a"),
            artifact("m.ts", "dist/m.js", b"m"),
        ]);
        assert_eq!(changed, vec!["dist/z.js", "dist/a.js", "dist/m.js"]);
    }

    #[test]
    fn unchanged_entries_are_filtered_from_mixed_batch() {
        let mut detector = ChangeDetector::new();
        detector.detect(vec![
            artifact("a.ts", "dist/a.js", b"a1"),
            artifact("b.ts", "dist/b.js", b"b1"),
        ]);
        let changed = detector.detect(vec![
            artifact("a.ts", "dist/a.js", b"a1"),
            artifact("b.ts", "dist/b.js", b"b2"),
        ]);
        assert_eq!(changed, vec!["dist/b.js"]);
    }

    #[test]
    fn entries_are_never_pruned() {
        let mut detector = ChangeDetector::new();
        detector.detect(vec![artifact("a.ts", "dist/a.js", b"a")]);
        detector.detect(Vec::new());
        assert!(detector.fingerprint_of("a.ts").is_some());
    }

    #[test]
    fn fingerprint_is_reproducible_hex() {
        let a = fingerprint(b"hello");
        assert_eq!(a, fingerprint(b"hello"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, fingerprint(b"hellp"));
    }
}
