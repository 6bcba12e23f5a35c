//! Live HTML/CSS/JS playground core.
//!
//! Three buffers ([`SourceSet`]) are synthesized into one preview
//! [`Document`], rendered into a fresh isolated context per cycle, and
//! everything the preview logs or throws comes back over a one-way boundary
//! into the host's [`LogPanel`].

pub mod autosave;
pub mod context;
#[cfg(feature = "headless")]
pub mod headless;
pub mod relay;
pub mod session;
pub mod share;
pub mod shim;
pub mod snapshot;
pub mod source;
pub mod synth;

pub use codepane_protocol as protocol;

pub use autosave::AutoSaver;
pub use context::{ContextError, ContextId, Envelope, ExecutionContext, Preview, Sandbox};
#[cfg(feature = "headless")]
pub use headless::HeadlessSandbox;
pub use relay::{HostRelay, LogEntry, LogPanel};
pub use session::{Clipboard, ClipboardError, LoadOrigin, Playground};
pub use share::{ShareLink, ShareToken};
pub use snapshot::{FileStore, MemoryStore, SnapshotStore};
pub use source::{SourceKind, SourceSet};
pub use synth::{synthesize, Document};
