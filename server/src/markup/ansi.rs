use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

/// `ESC [ <params> m`. An empty parameter list is an SGR reset.
static SGR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[([0-9;]*)m").expect("static SGR pattern is valid"));

const COLORS: [&str; 8] = [
    "black", "red", "green", "yellow", "blue", "magenta", "cyan", "white",
];

/// What a single SGR code does to the style of its sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SgrEffect {
    Reset,
    Set(&'static str, &'static str),
}

/// Codes without a reasonable CSS equivalent (blink, invert, strikethrough)
/// are deliberately absent.
fn sgr_effect(code: u32) -> Option<SgrEffect> {
    use SgrEffect::*;
    let effect = match code {
        0 => Reset,
        1 => Set("font-weight", "bold"),
        3 => Set("font-style", "italic"),
        4 => Set("text-decoration", "underline"),
        23 => Set("font-style", "normal"),
        24 => Set("text-decoration", "none"),
        30..=37 => Set("color", COLORS[(code - 30) as usize]),
        39 => Set("color", "inherit"),
        90..=97 => Set("color", COLORS[(code - 90) as usize]),
        40..=47 => Set("background-color", COLORS[(code - 40) as usize]),
        49 => Set("background-color", "inherit"),
        100..=107 => Set("background-color", COLORS[(code - 100) as usize]),
        _ => return None,
    };
    Some(effect)
}

/// Span emitter state: whether a `<span>` is currently open.
#[derive(Debug, Default)]
struct SpanWriter {
    open: bool,
}

impl SpanWriter {
    /// Each sequence starts from an empty style; nothing carries over from
    /// earlier sequences.
    fn apply(&mut self, params: &str, out: &mut String) {
        self.close(out);

        let mut style: IndexMap<&'static str, &'static str> = IndexMap::new();
        for code in params.split(';').filter_map(parse_code) {
            match sgr_effect(code) {
                Some(SgrEffect::Reset) => style.clear(),
                Some(SgrEffect::Set(prop, value)) => {
                    style.insert(prop, value);
                }
                None => {}
            }
        }

        if !style.is_empty() {
            let css = style
                .iter()
                .map(|(prop, value)| format!("{}: {}", prop, value))
                .collect::<Vec<_>>()
                .join("; ");
            out.push_str("<span style=\"");
            out.push_str(&css);
            out.push_str("\">");
            self.open = true;
        }
    }

    fn close(&mut self, out: &mut String) {
        if self.open {
            out.push_str("</span>");
            self.open = false;
        }
    }
}

fn parse_code(raw: &str) -> Option<u32> {
    if raw.is_empty() {
        return Some(0);
    }
    raw.parse().ok()
}

/// Convert SGR-coded text into HTML with one inline-styled `<span>` per
/// styled run.
///
/// Only span tags are inserted; every other character passes through, so
/// callers must HTML-escape the text beforehand (see [`shared::types::escape_html`]).
/// Every sequence closes the open span; its recognized codes alone decide
/// the next span's style. Input without escape sequences is returned
/// unchanged.
pub fn ansi_to_html(input: &str) -> String {
    if !input.contains('\x1b') {
        return input.to_string();
    }

    let mut writer = SpanWriter::default();
    let mut out = String::with_capacity(input.len() + 64);
    let mut last = 0;

    for caps in SGR_PATTERN.captures_iter(input) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&input[last..whole.start()]);
        writer.apply(caps.get(1).map_or("", |m| m.as_str()), &mut out);
        last = whole.end();
    }

    out.push_str(&input[last..]);
    writer.close(&mut out);
    out
}
