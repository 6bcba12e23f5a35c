//! Local snapshot store: the three buffers under fixed keys.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::source::{SourceKind, SourceSet};

pub const HTML_KEY: &str = "htmlCode";
pub const CSS_KEY: &str = "cssCode";
pub const JS_KEY: &str = "jsCode";

pub fn key_for(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Html => HTML_KEY,
        SourceKind::Css => CSS_KEY,
        SourceKind::Js => JS_KEY,
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot entry is not a JSON string: {0}")]
    Format(#[from] serde_json::Error),
}

/// String key-value storage, shaped like the browser's local storage.
pub trait SnapshotStore {
    fn get(&self, key: &str) -> Result<Option<String>, SnapshotError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), SnapshotError>;
    fn remove(&mut self, key: &str) -> Result<(), SnapshotError>;
}

/// Write all three buffers.
pub fn save(store: &mut dyn SnapshotStore, sources: &SourceSet) -> Result<(), SnapshotError> {
    for kind in SourceKind::ALL {
        store.set(key_for(kind), sources.get(kind))?;
    }
    log::debug!("snapshot saved");
    Ok(())
}

/// Read all three buffers. `None` when the store holds none of them; a
/// missing or unreadable key falls back to that buffer's built-in content.
pub fn load(store: &dyn SnapshotStore) -> Option<SourceSet> {
    let mut sources = SourceSet::default();
    let mut found = false;
    for kind in SourceKind::ALL {
        match store.get(key_for(kind)) {
            Ok(Some(text)) => {
                found = true;
                sources.set(kind, text);
            }
            Ok(None) => sources.set(kind, kind.builtin()),
            Err(error) => {
                log::warn!("Failed to read snapshot entry {}: {error}", key_for(kind));
                sources.set(kind, kind.builtin());
            }
        }
    }
    found.then_some(sources)
}

pub fn clear(store: &mut dyn SnapshotStore) -> Result<(), SnapshotError> {
    for kind in SourceKind::ALL {
        store.remove(key_for(kind))?;
    }
    Ok(())
}

/// In-memory store for tests and embedders without a disk.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SnapshotError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SnapshotError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per entry, each holding a JSON string.
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{key}.json"))
    }
}

impl SnapshotStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SnapshotError> {
        match fs::read_to_string(self.path(key)) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.base_path)?;
        fs::write(self.path(key), serde_json::to_string(value)?)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SnapshotError> {
        match fs::remove_file(self.path(key)) {
            Err(error) if error.kind() != std::io::ErrorKind::NotFound => Err(error.into()),
            _ => Ok(()),
        }
    }
}
