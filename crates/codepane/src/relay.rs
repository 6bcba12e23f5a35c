//! Host side of the boundary: validates inbound envelopes and renders them
//! into the log panel.

use codepane_protocol::{ConsoleMethod, Fault, RelayMessage, NOT_AVAILABLE};

use crate::context::{ContextId, Envelope, Inbox};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCategory {
    Console(ConsoleMethod),
    Fault,
}

/// One rendered line of the log panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub category: EntryCategory,
    pub text: String,
    /// Stack trace shown under a fault, whitespace preserved.
    pub detail: Option<String>,
}

impl LogEntry {
    pub fn from_message(message: RelayMessage) -> Self {
        match message {
            RelayMessage::Console { method, args } => LogEntry {
                category: EntryCategory::Console(method),
                text: args.join(" "),
                detail: None,
            },
            RelayMessage::Fault(fault) => Self::from_fault(fault),
        }
    }

    fn from_fault(fault: Fault) -> Self {
        let position = |value: Option<u32>| value.map_or_else(|| NOT_AVAILABLE.to_string(), |n| n.to_string());
        LogEntry {
            category: EntryCategory::Fault,
            text: format!(
                "Error: {} at {}:{}:{}",
                fault.message,
                fault.source,
                position(fault.line),
                position(fault.column)
            ),
            detail: fault.stack.filter(|stack| stack != NOT_AVAILABLE),
        }
    }

    /// Stylesheet class of the entry.
    pub fn style_key(&self) -> &'static str {
        match self.category {
            EntryCategory::Console(ConsoleMethod::Log) => "console-log",
            EntryCategory::Console(ConsoleMethod::Warn) => "console-warn",
            EntryCategory::Console(ConsoleMethod::Error) => "console-error",
            EntryCategory::Console(ConsoleMethod::Info) => "console-info",
            EntryCategory::Console(ConsoleMethod::Debug) => "console-debug",
            EntryCategory::Fault => "console-error",
        }
    }

    pub fn is_fault(&self) -> bool {
        self.category == EntryCategory::Fault
    }
}

/// Append-only list of entries that always shows the latest one.
#[derive(Debug, Default, Clone)]
pub struct LogPanel {
    entries: Vec<LogEntry>,
    scroll_anchor: Option<usize>,
}

impl LogPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: LogEntry) -> &LogEntry {
        self.entries.push(entry);
        self.scroll_to_end();
        &self.entries[self.entries.len() - 1]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.scroll_anchor = None;
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn faults(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(|entry| entry.is_fault())
    }

    /// Index of the entry in view.
    pub fn scroll_anchor(&self) -> Option<usize> {
        self.scroll_anchor
    }

    fn scroll_to_end(&mut self) {
        self.scroll_anchor = self.entries.len().checked_sub(1);
    }
}

/// Accepts messages only from the context of the current render cycle.
#[derive(Debug, Default)]
pub struct HostRelay {
    accepted: Option<ContextId>,
    panel: LogPanel,
}

impl HostRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new cycle: only `context` is heard from now on and the panel
    /// starts empty.
    pub fn bind(&mut self, context: ContextId) {
        self.accepted = Some(context);
        self.panel.clear();
    }

    /// Bind to `context` if it belongs to a later cycle than the current one.
    pub fn follow_latest(&mut self, context: ContextId) -> bool {
        if self.accepted.is_some_and(|current| current >= context) {
            return false;
        }
        self.bind(context);
        true
    }

    pub fn accepted(&self) -> Option<ContextId> {
        self.accepted
    }

    pub fn panel(&self) -> &LogPanel {
        &self.panel
    }

    pub fn clear_panel(&mut self) {
        self.panel.clear();
    }

    /// Handle one envelope; returns the entry it produced, if any.
    pub fn receive(&mut self, envelope: &Envelope) -> Option<&LogEntry> {
        if self.accepted != Some(envelope.sender) {
            log::debug!("dropping message from context {} (not current)", envelope.sender);
            return None;
        }
        let message = match RelayMessage::from_json(&envelope.payload) {
            Ok(message) => message,
            Err(error) => {
                log::trace!("ignoring unrecognized relay message: {error}");
                return None;
            }
        };
        Some(self.panel.append(LogEntry::from_message(message)))
    }

    /// Handle everything queued in `inbox`, in arrival order. Returns the
    /// number of entries added.
    pub fn drain(&mut self, inbox: &mut Inbox) -> usize {
        let mut added = 0;
        while let Ok(envelope) = inbox.try_recv() {
            if self.receive(&envelope).is_some() {
                added += 1;
            }
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{boundary, Outbox};
    use pretty_assertions::assert_eq;

    fn envelope(sender: ContextId, payload: &str) -> Envelope {
        Envelope {
            sender,
            payload: payload.to_string(),
        }
    }

    #[test]
    fn console_message_joins_args() {
        let id = ContextId::new();
        let mut relay = HostRelay::new();
        relay.bind(id);

        let entry = relay
            .receive(&envelope(id, r#"{"type":"console","method":"log","args":["hi","42"]}"#))
            .cloned()
            .unwrap();
        assert_eq!(entry.text, "hi 42");
        assert_eq!(entry.style_key(), "console-log");
        assert_eq!(entry.category, EntryCategory::Console(ConsoleMethod::Log));
    }

    #[test]
    fn fault_summary_and_stack() {
        let id = ContextId::new();
        let mut relay = HostRelay::new();
        relay.bind(id);

        relay.receive(&envelope(
            id,
            r#"{"type":"error","message":"boom","source":"User Code","lineno":3,"colno":"N/A","stack":"Error: boom\n    at user-code.js:4:7"}"#,
        ));
        relay.receive(&envelope(
            id,
            r#"{"type":"error","message":"quiet","source":"s","lineno":1,"colno":2,"stack":"N/A"}"#,
        ));

        let entries = relay.panel().entries();
        assert_eq!(entries[0].text, "Error: boom at User Code:3:N/A");
        assert_eq!(entries[0].detail.as_deref(), Some("Error: boom\n    at user-code.js:4:7"));
        assert_eq!(entries[0].style_key(), "console-error");
        assert!(entries[0].is_fault());
        assert_eq!(entries[1].detail, None);
        assert_eq!(relay.panel().faults().count(), 2);
    }

    #[test]
    fn unknown_or_malformed_messages_are_ignored() {
        let id = ContextId::new();
        let mut relay = HostRelay::new();
        relay.bind(id);

        for payload in [
            r#"{"type":"metrics","value":1}"#,
            r#"{"method":"log","args":["x"]}"#,
            r#"not json"#,
            r#"{"type":"console","method":"trace","args":[]}"#,
        ] {
            assert!(relay.receive(&envelope(id, payload)).is_none());
        }
        assert!(relay.panel().is_empty());
    }

    #[test]
    fn stale_and_foreign_senders_are_rejected() {
        let old = ContextId::new();
        let mut relay = HostRelay::new();
        let message = r#"{"type":"console","method":"info","args":["x"]}"#;

        // Nothing is bound yet.
        assert!(relay.receive(&envelope(old, message)).is_none());

        relay.bind(old);
        assert!(relay.receive(&envelope(old, message)).is_some());

        let new = ContextId::new();
        relay.bind(new);
        assert!(relay.panel().is_empty());
        assert!(relay.receive(&envelope(old, message)).is_none());
        assert!(relay.receive(&envelope(ContextId::new(), message)).is_none());
        assert!(relay.receive(&envelope(new, message)).is_some());
        assert_eq!(relay.panel().len(), 1);
    }

    #[test]
    fn follow_latest_only_moves_forward() {
        let mut generator = ulid::Generator::new();
        let first = ContextId::from(generator.generate().unwrap());
        let second = ContextId::from(generator.generate().unwrap());

        let mut relay = HostRelay::new();
        assert!(relay.follow_latest(first));
        assert!(relay.follow_latest(second));
        assert!(!relay.follow_latest(first));
        assert!(!relay.follow_latest(second));
        assert_eq!(relay.accepted(), Some(second));
    }

    #[test]
    fn drain_preserves_order_and_scrolls() {
        let (tx, mut inbox) = boundary();
        let id = ContextId::new();
        let outbox = Outbox::new(id, tx);
        for n in 0..5 {
            outbox.post(format!(r#"{{"type":"console","method":"debug","args":["{n}"]}}"#));
        }

        let mut relay = HostRelay::new();
        relay.bind(id);
        assert_eq!(relay.drain(&mut inbox), 5);

        let texts: Vec<&str> = relay.panel().entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["0", "1", "2", "3", "4"]);
        assert_eq!(relay.panel().scroll_anchor(), Some(4));
    }

    #[test]
    fn cleared_panel_accepts_new_entries() {
        let id = ContextId::new();
        let mut relay = HostRelay::new();
        relay.bind(id);
        let message = r#"{"type":"console","method":"warn","args":["w"]}"#;

        relay.receive(&envelope(id, message));
        relay.receive(&envelope(id, message));
        relay.clear_panel();
        assert!(relay.panel().is_empty());
        assert_eq!(relay.panel().scroll_anchor(), None);

        relay.receive(&envelope(id, message));
        assert_eq!(relay.panel().len(), 1);
        assert_eq!(relay.panel().scroll_anchor(), Some(0));
    }
}
