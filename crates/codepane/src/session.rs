//! One open playground: the buffers, their persistence, the preview slot and
//! the log panel, wired the way the editor drives them.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::autosave::{AutoSaver, SharedStore};
use crate::context::{boundary, ContextError, ContextId, Inbox, Preview, Sandbox};
use crate::relay::{HostRelay, LogPanel};
use crate::share::{self, ShareLink, ShareToken};
use crate::shim::{RelayTarget, ShimOptions};
use crate::snapshot::{self, SnapshotStore};
use crate::source::{SourceKind, SourceSet};
use crate::synth::synthesize_with;

/// How long a status message stays up.
pub const STATUS_TTL: Duration = Duration::from_secs(3);

/// Where the buffers of a session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    ShareLink,
    Snapshot,
    Defaults,
}

impl std::fmt::Display for LoadOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LoadOrigin::ShareLink => "share link",
            LoadOrigin::Snapshot => "local snapshot",
            LoadOrigin::Defaults => "built-in defaults",
        })
    }
}

/// A share token wins, then the snapshot, then the built-in content. A token
/// that fails to decode is treated as absent.
pub fn load_sources(fragment: Option<&str>, store: &dyn SnapshotStore) -> (SourceSet, LoadOrigin) {
    if let Some(fragment) = fragment {
        match share::decode(&ShareToken::from_fragment(fragment)) {
            Ok(sources) => return (sources, LoadOrigin::ShareLink),
            Err(error) => log::warn!("Failed to decode share link, falling back: {error}"),
        }
    }
    match snapshot::load(store) {
        Some(sources) => (sources, LoadOrigin::Snapshot),
        None => (SourceSet::builtin(), LoadOrigin::Defaults),
    }
}

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("no clipboard available")]
    Unavailable,

    #[error("clipboard io: {0}")]
    Io(#[from] std::io::Error),

    #[error("clipboard program `{program}` failed: {reason}")]
    Rejected { program: String, reason: String },
}

/// Somewhere a share link can be copied to.
pub trait Clipboard {
    fn copy(&mut self, text: &str) -> Result<(), ClipboardError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub text: &'static str,
    pub tone: Tone,
    pub expires_at: Instant,
}

impl StatusLine {
    pub fn copied(now: Instant) -> Self {
        Self {
            text: "Link copied!",
            tone: Tone::Success,
            expires_at: now + STATUS_TTL,
        }
    }

    pub fn copy_failed(now: Instant) -> Self {
        Self {
            text: "Copy failed!",
            tone: Tone::Failure,
            expires_at: now + STATUS_TTL,
        }
    }

    pub fn is_visible(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Copy `link` and describe the outcome for the status line.
pub fn copy_link(clipboard: &mut dyn Clipboard, link: &ShareLink, now: Instant) -> StatusLine {
    match clipboard.copy(link.as_str()) {
        Ok(()) => StatusLine::copied(now),
        Err(error) => {
            log::warn!("Failed to copy share link: {error}");
            StatusLine::copy_failed(now)
        }
    }
}

pub struct Playground<S: Sandbox> {
    sources: SourceSet,
    origin: LoadOrigin,
    preview: Preview<S>,
    relay: HostRelay,
    inbox: Inbox,
    autosaver: AutoSaver,
    relay_endpoint: Option<String>,
    status: Option<StatusLine>,
}

impl<S: Sandbox> Playground<S> {
    /// Load buffers by precedence. Nothing is rendered until [`Playground::run`].
    pub fn open(fragment: Option<&str>, sandbox: S, store: SharedStore, quiet: Duration) -> Self {
        let (sources, origin) = {
            let guard = match store.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            load_sources(fragment, &*guard)
        };
        log::debug!("session loaded from {origin}");
        let (tx, inbox) = boundary();
        Self {
            sources,
            origin,
            preview: Preview::new(sandbox, tx),
            relay: HostRelay::new(),
            inbox,
            autosaver: AutoSaver::new(store, quiet),
            relay_endpoint: None,
            status: None,
        }
    }

    /// Also forward every cycle's messages to a WebSocket relay at `endpoint`.
    pub fn with_relay_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.relay_endpoint = Some(endpoint.into());
        self
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    pub fn origin(&self) -> LoadOrigin {
        self.origin
    }

    pub fn panel(&self) -> &LogPanel {
        self.relay.panel()
    }

    pub fn preview(&self) -> &Preview<S> {
        &self.preview
    }

    /// Replace one buffer and schedule a debounced save. Needs a tokio runtime.
    /// Any status message is dismissed.
    pub fn edit(&mut self, kind: SourceKind, text: impl Into<String>) {
        self.status = None;
        self.sources.set(kind, text);
        self.autosaver.schedule(self.sources.clone());
    }

    /// Replace all buffers at once, e.g. after reloading files from disk.
    pub fn replace(&mut self, sources: SourceSet) {
        if sources != self.sources {
            self.status = None;
            self.sources = sources;
            self.autosaver.schedule(self.sources.clone());
        }
    }

    /// Save right away, dropping any pending debounced save.
    pub fn save_now(&mut self) {
        self.autosaver.flush(&self.sources);
    }

    /// Start a render cycle: the panel is emptied, the previous context is
    /// torn down and the current buffers run in a fresh one.
    pub fn run(&mut self) -> Result<ContextId, ContextError> {
        let id = self.preview.next_id();
        self.relay.bind(id);
        let options = ShimOptions {
            relay: self
                .relay_endpoint
                .as_ref()
                .map(|endpoint| RelayTarget::new(endpoint.clone(), id)),
        };
        let document = synthesize_with(&self.sources, &options);
        self.preview.render_as(id, &document)?;
        self.pump();
        Ok(id)
    }

    /// Move everything that crossed the boundary so far into the panel.
    pub fn pump(&mut self) -> usize {
        self.relay.drain(&mut self.inbox)
    }

    pub fn share_link(&self, origin: &str, path: &str) -> ShareLink {
        ShareLink::new(origin, path, &share::encode(&self.sources))
    }

    /// Build the share link, copy it and post the outcome to the status line.
    pub fn copy_share_link(
        &mut self,
        clipboard: &mut dyn Clipboard,
        origin: &str,
        path: &str,
        now: Instant,
    ) -> ShareLink {
        let link = self.share_link(origin, path);
        self.status = Some(copy_link(clipboard, &link, now));
        link
    }

    /// The status message, while it has not expired.
    pub fn status(&self, now: Instant) -> Option<&StatusLine> {
        self.status.as_ref().filter(|status| status.is_visible(now))
    }

    pub fn clear_console(&mut self) {
        self.relay.clear_panel();
    }
}
