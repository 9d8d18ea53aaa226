use shared::types::{BuildEvent, Classification, escape_html};
use std::time::{Duration, Instant};

/// Prefix of every notification element id.
pub const ID_PREFIX: &str = "esbn-notification-";
pub const CONTAINER_ID: &str = "esbuild-notification-container";

/// One visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub dom_id: String,
    pub classification: Classification,
    /// Changed bundle paths. Shown only when there are no errors.
    pub bundles: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Set only for notifications that dismiss themselves.
    pub dismiss_at: Option<Instant>,
}

impl Notification {
    fn from_event(
        event: &BuildEvent,
        event_id: &str,
        now: Instant,
        dismiss_after: Duration,
    ) -> Self {
        let classification = event.classification();
        let dismiss_at = classification
            .auto_dismisses()
            .then(|| now + dismiss_after);
        Self {
            dom_id: format!("{}{}", ID_PREFIX, event_id),
            classification,
            bundles: event.bundles.clone(),
            errors: event.errors.clone(),
            warnings: event.warnings.clone(),
            dismiss_at,
        }
    }

    pub fn heading(&self) -> &'static str {
        match self.classification {
            Classification::Error => "❌ build encountered errors",
            Classification::Warning => "⚠️ build finished with warnings",
            Classification::Success => "✅ build finished",
        }
    }

    /// Markup for this notification. Bundle paths are escaped; diagnostics
    /// are already markup and are inserted verbatim.
    pub fn to_html(&self) -> String {
        let mut html = format!(
            "<div id=\"{}\" class=\"esbuild-notification {}\">",
            self.dom_id,
            self.classification.css_class()
        );
        html.push_str(
            "<div class=\"esbn-close-wrapper\">[<a href=\"#\" title=\"dismiss notification\">x</a>]</div>",
        );
        html.push_str(&format!("<h1>{}</h1>", self.heading()));

        if self.errors.is_empty() {
            html.push_str("<ul class=\"esbn-bundle-list\">");
            for bundle in &self.bundles {
                html.push_str(&format!("<li>{}</li>", escape_html(bundle)));
            }
            html.push_str("</ul>");
        }
        for msg in self.errors.iter().chain(&self.warnings) {
            html.push_str(&format!("<div class=\"esbn-message\"><pre>{}</pre></div>", msg));
        }
        html.push_str("</div>");
        html
    }
}

impl Notification {
    /// Plain-text rendering for terminals: markup tags are dropped and the
    /// basic entities decoded.
    pub fn to_text(&self) -> String {
        let mut lines = vec![self.heading().to_string()];
        if self.errors.is_empty() {
            lines.extend(self.bundles.iter().map(|b| format!("  {}", b)));
        }
        for msg in self.errors.iter().chain(&self.warnings) {
            lines.push(strip_markup(msg));
        }
        lines.join("\n")
    }
}

/// Ordered stack of notifications in a lazily created container.
///
/// The container exists only while at least one notification is shown.
#[derive(Debug)]
pub struct NotificationStack {
    items: Option<Vec<Notification>>,
    dismiss_after: Duration,
}

impl NotificationStack {
    pub fn new(dismiss_after: Duration) -> Self {
        Self {
            items: None,
            dismiss_after,
        }
    }

    pub fn has_container(&self) -> bool {
        self.items.is_some()
    }

    pub fn len(&self) -> usize {
        self.items.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn notifications(&self) -> &[Notification] {
        self.items.as_deref().unwrap_or(&[])
    }

    /// Render a received event and push it onto the stack.
    pub fn push(&mut self, event: &BuildEvent, event_id: &str, now: Instant) -> Notification {
        let notification = Notification::from_event(event, event_id, now, self.dismiss_after);
        self.items
            .get_or_insert_with(Vec::new)
            .push(notification.clone());
        notification
    }

    /// Remove by element id. Returns `false` when nothing matched.
    pub fn dismiss(&mut self, dom_id: &str) -> bool {
        let Some(items) = self.items.as_mut() else {
            return false;
        };
        let before = items.len();
        items.retain(|n| n.dom_id != dom_id);
        let removed = items.len() != before;
        self.drop_empty_container();
        removed
    }

    /// Remove every auto-dismissing notification whose time has come.
    /// Returns the ids that were removed.
    pub fn expire(&mut self, now: Instant) -> Vec<String> {
        let Some(items) = self.items.as_mut() else {
            return Vec::new();
        };
        let mut expired = Vec::new();
        items.retain(|n| match n.dismiss_at {
            Some(at) if at <= now => {
                expired.push(n.dom_id.clone());
                false
            }
            _ => true,
        });
        self.drop_empty_container();
        expired
    }

    /// Earliest pending auto-dismiss deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.notifications().iter().filter_map(|n| n.dismiss_at).min()
    }

    /// Markup for the whole container, or `None` when it does not exist.
    pub fn to_html(&self) -> Option<String> {
        let items = self.items.as_ref()?;
        let mut html = format!("<div id=\"{}\">", CONTAINER_ID);
        for n in items {
            html.push_str(&n.to_html());
        }
        html.push_str("</div>");
        Some(html)
    }

    fn drop_empty_container(&mut self) {
        if self.items.as_ref().is_some_and(Vec::is_empty) {
            self.items = None;
        }
    }
}

fn strip_markup(markup: &str) -> String {
    let mut text = String::with_capacity(markup.len());
    let mut in_tag = false;
    for c in markup.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
