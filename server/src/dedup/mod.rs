//! Content fingerprinting for build artifacts.

mod detector;

pub use detector::{Artifact, ChangeDetector, fingerprint};
