//! Glue between a host build tool and the notification pipeline.

mod adapter;
mod formatter;
mod host;
mod paths;

pub use adapter::BuildResultAdapter;
pub use formatter::TerminalFormatter;
pub use host::{
    BuildOutput, BuildResult, Diagnostic, DiagnosticFormatter, DiagnosticKind, Location, Note,
};
pub use paths::{PathPolicy, relative_path};
