//! Debounced persistence of the buffers into the snapshot store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::snapshot::{self, SnapshotStore};
use crate::source::SourceSet;

pub type SharedStore = Arc<Mutex<dyn SnapshotStore + Send>>;

pub fn shared(store: impl SnapshotStore + Send + 'static) -> SharedStore {
    Arc::new(Mutex::new(store))
}

/// Coalesces rapid edits into one write after a quiet period.
///
/// Each [`AutoSaver::schedule`] cancels the pending write, so at most one save
/// is ever waiting and no two saves overlap.
pub struct AutoSaver {
    store: SharedStore,
    quiet: Duration,
    pending: Option<JoinHandle<()>>,
}

impl AutoSaver {
    pub const DEFAULT_QUIET: Duration = Duration::from_millis(500);

    pub fn new(store: SharedStore, quiet: Duration) -> Self {
        Self {
            store,
            quiet,
            pending: None,
        }
    }

    /// Save `sources` once no further edit arrives for the quiet period.
    /// Must be called from inside a tokio runtime.
    pub fn schedule(&mut self, sources: SourceSet) {
        self.cancel();
        let store = Arc::clone(&self.store);
        let quiet = self.quiet;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            write(&store, &sources);
        }));
    }

    /// Drop the pending write and save `sources` right away.
    pub fn flush(&mut self, sources: &SourceSet) {
        self.cancel();
        write(&self.store, sources);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn cancel(&mut self) {
        if let Some(task) = self.pending.take() {
            task.abort();
        }
    }
}

impl Drop for AutoSaver {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn write(store: &SharedStore, sources: &SourceSet) {
    let mut guard = match store.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Err(error) = snapshot::save(&mut *guard, sources) {
        log::error!("Failed to store snapshot: {error}");
    }
}
