use owo_colors::OwoColorize;
use std::fmt::Write;

use super::host::{Diagnostic, DiagnosticFormatter, DiagnosticKind, Location};

/// Default formatter producing bundler-style terminal output:
///
/// ```text
/// ✘ [ERROR] Could not resolve "./missing"
///
///     src/app.ts:3:7:
///       3 │ import "./missing"
///         ╵        ~~~~~~~~~~~
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalFormatter;

impl DiagnosticFormatter for TerminalFormatter {
    fn format(
        &self,
        diagnostic: &Diagnostic,
        kind: DiagnosticKind,
        width: usize,
    ) -> anyhow::Result<String> {
        let mut out = String::new();

        let marker = match kind {
            DiagnosticKind::Error => format!("{}", "✘ [ERROR]".red().bold()),
            DiagnosticKind::Warning => format!("{}", "▲ [WARNING]".yellow().bold()),
        };
        let plugin = diagnostic
            .plugin_name
            .as_deref()
            .map(|p| format!(" [plugin {}]", p))
            .unwrap_or_default();

        // Marker is at most 11 columns wide plus a space.
        let text_width = width.saturating_sub(12).max(20);
        let mut lines = wrap(&diagnostic.text, text_width).into_iter();
        writeln!(
            out,
            "{} {}{}",
            marker,
            lines.next().unwrap_or_default().bold(),
            plugin
        )?;
        for line in lines {
            writeln!(out, "          {}", line.bold())?;
        }

        if let Some(location) = &diagnostic.location {
            out.push('\n');
            write_location(&mut out, location, width, 4)?;
        }

        for note in &diagnostic.notes {
            out.push('\n');
            for line in wrap(&note.text, width.saturating_sub(2).max(20)) {
                writeln!(out, "  {}", line)?;
            }
            if let Some(location) = &note.location {
                out.push('\n');
                write_location(&mut out, location, width, 4)?;
            }
        }

        Ok(out)
    }
}

fn write_location(
    out: &mut String,
    loc: &Location,
    width: usize,
    indent: usize,
) -> std::fmt::Result {
    let pad = " ".repeat(indent);
    writeln!(
        out,
        "{}{}",
        pad,
        format!("{}:{}:{}:", loc.file, loc.line, loc.column).bold()
    )?;

    if loc.line_text.is_empty() {
        return Ok(());
    }

    let gutter = loc.line.to_string();
    let prefix_width = indent + 2 + gutter.len() + 3;
    let max_text = width.saturating_sub(prefix_width).max(10);
    let shown: String = loc.line_text.chars().take(max_text).collect();

    writeln!(out, "{}  {} │ {}", pad, gutter.dimmed(), shown)?;

    let column = loc.column as usize;
    if column <= shown.chars().count() {
        let span = (loc.length as usize)
            .max(1)
            .min(shown.chars().count().saturating_sub(column).max(1));
        writeln!(
            out,
            "{}  {} ╵ {}{}",
            pad,
            " ".repeat(gutter.len()),
            " ".repeat(column),
            "~".repeat(span).green()
        )?;
    }
    Ok(())
}

/// Greedy word wrap; words longer than `width` get a line of their own.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
