//! In-process preview context on QuickJS.
//!
//! There is no layout engine and only a stub `document`: the headless
//! context exists to run the preview's scripts and observe what they relay.
//! Each render builds a new QuickJS runtime, so no global, timer or pending
//! job survives into the next cycle.

mod rejections;

use rquickjs::{Context, Ctx, Function, Runtime};

use self::rejections::RejectionTracker;
use crate::context::{ContextError, ContextId, ExecutionContext, Outbox, Sandbox};
use crate::shim::USER_SCRIPT_URL;
use crate::synth::Document;

const PRELUDE: &str = include_str!("prelude.js");

/// Upper bound on timer callbacks run per render.
pub const MAX_TIMER_TURNS: usize = 1000;

#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessSandbox;

impl Sandbox for HeadlessSandbox {
    fn spawn(&mut self, id: ContextId, outbox: Outbox) -> Result<Box<dyn ExecutionContext>, ContextError> {
        Ok(Box::new(HeadlessContext::new(id, outbox)?))
    }
}

pub struct HeadlessContext {
    id: ContextId,
    outbox: Outbox,
    // Field order matters: the context must drop before its runtime.
    context: Context,
    runtime: Runtime,
    rejections: Box<RejectionTracker>,
}

impl HeadlessContext {
    pub fn new(id: ContextId, outbox: Outbox) -> Result<Self, ContextError> {
        let runtime = Runtime::new().map_err(|error| ContextError::Startup(error.to_string()))?;
        let context = Context::full(&runtime).map_err(|error| ContextError::Startup(error.to_string()))?;
        let rejections = RejectionTracker::install(&context);
        Ok(Self {
            id,
            outbox,
            context,
            runtime,
            rejections,
        })
    }

    /// Drain the job queue, then announce what it left rejected.
    fn settle(&self) -> Result<(), ContextError> {
        self.run_pending_jobs();
        self.context.with(|ctx| {
            let rejected = self.rejections.take(&ctx);
            if rejected.is_empty() {
                return Ok(());
            }
            let announce: Function = ctx
                .globals()
                .get("__codepaneRejected")
                .map_err(|error| runtime_error(&ctx, error))?;
            for (promise, reason) in rejected {
                announce
                    .call::<_, ()>((promise, reason))
                    .map_err(|error| runtime_error(&ctx, error))?;
            }
            Ok::<(), ContextError>(())
        })?;
        self.run_pending_jobs();
        Ok(())
    }

    fn run_pending_jobs(&self) {
        loop {
            match self.runtime.execute_pending_job() {
                Ok(true) => {}
                Ok(false) => break,
                Err(_) => log::debug!("context {}: promise job threw", self.id),
            }
        }
    }

    fn run_timers(&self) -> Result<(), ContextError> {
        for _ in 0..MAX_TIMER_TURNS {
            let ran = self
                .context
                .with(|ctx| ctx.eval::<bool, _>("__codepaneRunTimer()").map_err(|error| runtime_error(&ctx, error)))?;
            self.settle()?;
            if !ran {
                return Ok(());
            }
        }
        log::debug!("context {}: stopped after {MAX_TIMER_TURNS} timer turns", self.id);
        Ok(())
    }
}

impl ExecutionContext for HeadlessContext {
    fn id(&self) -> ContextId {
        self.id
    }

    fn render(&mut self, document: &Document) -> Result<(), ContextError> {
        let outbox = self.outbox.clone();
        let [preamble, user] = document.scripts();
        self.context.with(|ctx| {
            install(&ctx, outbox).map_err(|error| runtime_error(&ctx, error))?;
            ctx.eval::<(), _>(preamble).map_err(|error| runtime_error(&ctx, error))?;
            // Indirect eval, so a syntax error is reported like any other
            // uncaught error and its frames are named as user code.
            ctx.eval::<(), _>(run_call(&user, USER_SCRIPT_URL))
                .map_err(|error| runtime_error(&ctx, error))
        })?;
        self.settle()?;
        self.run_timers()
    }
}

impl Drop for HeadlessContext {
    fn drop(&mut self) {
        self.rejections.release();
    }
}

/// Bind the boundary and the window surface into a fresh context.
fn install(ctx: &Ctx<'_>, outbox: Outbox) -> rquickjs::Result<()> {
    let deliver = Function::new(ctx.clone(), move |payload: String| {
        outbox.post(payload);
    })?;
    ctx.globals().set("__codepaneDeliver", deliver)?;
    ctx.eval::<(), _>(PRELUDE)
}

/// `__codepaneRun("<source>", "<name>");` with both strings as literals.
fn run_call(source: &str, name: &str) -> String {
    let quote = |text: &str| serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string());
    format!("__codepaneRun({}, {});", quote(source), quote(name))
}

fn runtime_error(ctx: &Ctx<'_>, error: rquickjs::Error) -> ContextError {
    if matches!(error, rquickjs::Error::Exception) {
        let caught = ctx.catch();
        let text = caught
            .as_exception()
            .and_then(|exception| exception.message())
            .unwrap_or_else(|| format!("{caught:?}"));
        return ContextError::Runtime(text);
    }
    ContextError::Runtime(error.to_string())
}
