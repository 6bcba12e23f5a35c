//! Isolated execution contexts and the boundary they talk through.
//!
//! A context is created for exactly one render cycle. Everything it says to
//! the host goes through its [`Outbox`], which stamps the cycle's
//! [`ContextId`] on each [`Envelope`]; the host never reads context state.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use ulid::Ulid;

use crate::synth::Document;

/// Identity of one render cycle's context. Later cycles compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContextId(Ulid);

impl ContextId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Ulid> for ContextId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ContextId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

/// One message crossing the boundary, with the sender it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub sender: ContextId,
    /// Wire-schema JSON, unparsed.
    pub payload: String,
}

/// Sending half of the boundary, owned by a context.
#[derive(Debug, Clone)]
pub struct Outbox {
    sender: ContextId,
    tx: mpsc::UnboundedSender<Envelope>,
}

impl Outbox {
    pub fn new(sender: ContextId, tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self { sender, tx }
    }

    pub fn sender(&self) -> ContextId {
        self.sender
    }

    /// Fire and forget. A closed boundary drops the message.
    pub fn post(&self, payload: impl Into<String>) {
        let envelope = Envelope {
            sender: self.sender,
            payload: payload.into(),
        };
        if self.tx.send(envelope).is_err() {
            log::trace!("context {}: boundary closed, message dropped", self.sender);
        }
    }
}

/// Receiving half of the boundary, owned by the host.
pub type Inbox = mpsc::UnboundedReceiver<Envelope>;

pub fn boundary() -> (mpsc::UnboundedSender<Envelope>, Inbox) {
    mpsc::unbounded_channel()
}

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("failed to start preview runtime: {0}")]
    Startup(String),

    #[error("preview runtime failed: {0}")]
    Runtime(String),
}

/// A live preview surface. Dropping it tears it down.
pub trait ExecutionContext {
    fn id(&self) -> ContextId;

    /// Load `document` and run its scripts to completion. Errors raised by
    /// user code are reported through the outbox, not returned.
    fn render(&mut self, document: &Document) -> Result<(), ContextError>;
}

/// Creates fresh contexts.
pub trait Sandbox {
    fn spawn(&mut self, id: ContextId, outbox: Outbox) -> Result<Box<dyn ExecutionContext>, ContextError>;
}

/// The preview slot: holds at most one context and replaces it wholesale on
/// every render.
pub struct Preview<S: Sandbox> {
    sandbox: S,
    tx: mpsc::UnboundedSender<Envelope>,
    ids: ulid::Generator,
    current: Option<Box<dyn ExecutionContext>>,
}

impl<S: Sandbox> Preview<S> {
    pub fn new(sandbox: S, tx: mpsc::UnboundedSender<Envelope>) -> Self {
        Self {
            sandbox,
            tx,
            ids: ulid::Generator::new(),
            current: None,
        }
    }

    /// Id for the next cycle; strictly greater than every id handed out
    /// before by this preview.
    pub fn next_id(&mut self) -> ContextId {
        self.ids
            .generate()
            .map(ContextId)
            .unwrap_or_else(|_| ContextId::new())
    }

    pub fn current_id(&self) -> Option<ContextId> {
        self.current.as_ref().map(|context| context.id())
    }

    /// Tear down the previous context, then build and render a new one.
    pub fn render(&mut self, document: &Document) -> Result<ContextId, ContextError> {
        let id = self.next_id();
        self.render_as(id, document)?;
        Ok(id)
    }

    /// Like [`Preview::render`] with a caller-chosen id, for documents whose
    /// shim was built for a specific cycle.
    pub fn render_as(&mut self, id: ContextId, document: &Document) -> Result<(), ContextError> {
        if let Some(previous) = self.current.take() {
            log::debug!("tearing down context {}", previous.id());
            drop(previous);
        }
        let mut context = self.sandbox.spawn(id, Outbox::new(id, self.tx.clone()))?;
        log::debug!("rendering into context {id}");
        context.render(document)?;
        self.current = Some(context);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A context that replays canned wire messages instead of running scripts.

    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default, Clone)]
    pub struct ScriptedSandbox {
        pub replies: Vec<String>,
        pub spawned: Rc<RefCell<Vec<ContextId>>>,
        pub live: Rc<RefCell<usize>>,
    }

    struct ScriptedContext {
        id: ContextId,
        outbox: Outbox,
        replies: Vec<String>,
        live: Rc<RefCell<usize>>,
    }

    impl Drop for ScriptedContext {
        fn drop(&mut self) {
            *self.live.borrow_mut() -= 1;
        }
    }

    impl ExecutionContext for ScriptedContext {
        fn id(&self) -> ContextId {
            self.id
        }

        fn render(&mut self, _document: &Document) -> Result<(), ContextError> {
            for reply in &self.replies {
                self.outbox.post(reply.clone());
            }
            Ok(())
        }
    }

    impl Sandbox for ScriptedSandbox {
        fn spawn(&mut self, id: ContextId, outbox: Outbox) -> Result<Box<dyn ExecutionContext>, ContextError> {
            self.spawned.borrow_mut().push(id);
            *self.live.borrow_mut() += 1;
            Ok(Box::new(ScriptedContext {
                id,
                outbox,
                replies: self.replies.clone(),
                live: self.live.clone(),
            }))
        }
    }
}
