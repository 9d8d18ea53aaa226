//! Diagnostic markup: SGR escape sequences to inline-styled HTML.

mod ansi;

pub use ansi::ansi_to_html;
pub use shared::types::escape_html;
