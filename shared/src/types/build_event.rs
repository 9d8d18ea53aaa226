use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the event-stream event type carrying a [`BuildEvent`].
pub const BUILD_END_EVENT: &str = "buildEnd";

/// Outcome of one completed build cycle, as relayed to every open stream.
///
/// `errors` and `warnings` hold diagnostic markup that is already HTML-safe;
/// consumers render it as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEvent {
    /// Artifact paths whose content changed this cycle. Always empty when
    /// the cycle produced errors.
    pub bundles: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Exactly one of these applies to any [`BuildEvent`]; errors take priority
/// over warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Error,
    Warning,
    Success,
}

impl BuildEvent {
    /// Build an event, dropping the bundle list when any error is present.
    pub fn new(bundles: Vec<String>, errors: Vec<String>, warnings: Vec<String>) -> Self {
        let bundles = if errors.is_empty() { bundles } else { Vec::new() };
        Self {
            bundles,
            errors,
            warnings,
        }
    }

    pub fn classification(&self) -> Classification {
        if !self.errors.is_empty() {
            Classification::Error
        } else if !self.warnings.is_empty() {
            Classification::Warning
        } else {
            Classification::Success
        }
    }
}

impl Classification {
    /// CSS class suffix used by the browser notification markup.
    pub fn css_class(&self) -> &'static str {
        match self {
            Classification::Error => "esbn-error",
            Classification::Warning => "esbn-warning",
            Classification::Success => "esbn-success",
        }
    }

    /// Whether a notification of this kind dismisses itself.
    pub fn auto_dismisses(&self) -> bool {
        matches!(self, Classification::Success)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Error => write!(f, "error"),
            Classification::Warning => write!(f, "warning"),
            Classification::Success => write!(f, "success"),
        }
    }
}
