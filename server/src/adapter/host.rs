// Records handed over by the host build tool once per completed cycle.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BuildOutput {
    /// Output path as reported by the host tool; relative to the working
    /// directory when one is configured.
    pub path: String,
    /// Entry point that produced this output, if the host tool knows it.
    #[serde(default, alias = "entryPoint")]
    pub entry_point: Option<String>,
    /// In-memory content, for host tools that do not write to disk.
    #[serde(default)]
    pub contents: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
    #[serde(default)]
    pub length: u32,
    #[serde(default, alias = "lineText")]
    pub line_text: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Note {
    pub text: String,
    #[serde(default)]
    pub location: Option<Location>,
}

/// A raw compiler error or warning.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub text: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default, alias = "pluginName")]
    pub plugin_name: Option<String>,
}

impl Diagnostic {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            location: None,
            notes: Vec::new(),
            plugin_name: None,
        }
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct BuildResult {
    #[serde(default)]
    pub outputs: Vec<BuildOutput>,
    #[serde(default)]
    pub errors: Vec<Diagnostic>,
    #[serde(default)]
    pub warnings: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Error,
    Warning,
}

/// Renders a diagnostic to ANSI-coloured text constrained to `width`
/// columns. The adapter escapes and converts the result to HTML.
pub trait DiagnosticFormatter: Send + Sync {
    fn format(
        &self,
        diagnostic: &Diagnostic,
        kind: DiagnosticKind,
        width: usize,
    ) -> anyhow::Result<String>;
}
