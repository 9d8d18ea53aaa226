// ---------------------------------------------------------------------------
// Incremental text/event-stream parser
// ---------------------------------------------------------------------------

/// One dispatched event-stream message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMessage {
    /// `event:` field, `"message"` when absent.
    pub event: String,
    pub data: String,
    /// Last `id:` seen on the stream, which persists across messages.
    pub id: Option<String>,
}

/// Accepts arbitrary byte chunks and yields complete messages.
///
/// Lines may end in `\n`, `\r\n` or `\r`. Comment lines (leading `:`) are
/// ignored and multiple `data:` lines are joined with `\n`.
#[derive(Debug, Default)]
pub struct EventStreamParser {
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    last_id: Option<String>,
    pending_cr: bool,
}

impl EventStreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamMessage> {
        let mut out = Vec::new();
        for &byte in chunk {
            if self.pending_cr {
                self.pending_cr = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\n' => self.end_line(&mut out),
                b'\r' => {
                    self.pending_cr = true;
                    self.end_line(&mut out);
                }
                _ => self.buf.push(byte),
            }
        }
        out
    }

    fn end_line(&mut self, out: &mut Vec<StreamMessage>) {
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();

        if line.is_empty() {
            if let Some(msg) = self.dispatch() {
                out.push(msg);
            }
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line.as_str(), ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<StreamMessage> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(StreamMessage {
            event: event
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "message".to_string()),
            data,
            id: self.last_id.clone(),
        })
    }
}
