//! The project directory: one file per buffer.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use codepane::{SourceKind, SourceSet};

pub fn file_name(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::Html => "index.html",
        SourceKind::Css => "style.css",
        SourceKind::Js => "script.js",
    }
}

pub struct Project {
    dir: PathBuf,
}

impl Project {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: SourceKind) -> PathBuf {
        self.dir.join(file_name(kind))
    }

    /// Which buffer `path` holds, if any.
    pub fn kind_of(&self, path: &Path) -> Option<SourceKind> {
        let name = path.file_name()?;
        SourceKind::ALL.into_iter().find(|kind| name == file_name(*kind))
    }

    /// Missing files read as empty buffers.
    pub fn read(&self) -> Result<SourceSet> {
        let mut sources = SourceSet::default();
        for kind in SourceKind::ALL {
            let path = self.path(kind);
            match std::fs::read_to_string(&path) {
                Ok(text) => sources.set(kind, text),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                    log::debug!("{} not found, using an empty buffer", path.display());
                }
                Err(error) => {
                    return Err(error).with_context(|| format!("Failed to read {}", path.display()));
                }
            }
        }
        Ok(sources)
    }

    pub fn write(&self, sources: &SourceSet) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        for kind in SourceKind::ALL {
            let path = self.path(kind);
            std::fs::write(&path, sources.get(kind)).with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Ok(())
    }

    /// Snapshot directory for this project.
    pub fn storage_dir(&self, configured: &Path) -> PathBuf {
        self.dir.join(configured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path().join("demo"));
        let sources = SourceSet::new("<p>x</p>", "p {}", "console.log(1)");

        project.write(&sources).unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("demo/script.js")).unwrap(), "console.log(1)");
        assert_eq!(project.read().unwrap(), sources);
    }

    #[test]
    fn missing_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<b>only</b>").unwrap();

        let sources = Project::new(dir.path()).read().unwrap();
        assert_eq!(sources, SourceSet::new("<b>only</b>", "", ""));
    }

    #[test]
    fn kind_from_path() {
        let project = Project::new("/work");
        assert_eq!(project.kind_of(Path::new("/work/style.css")), Some(SourceKind::Css));
        assert_eq!(project.kind_of(Path::new("/work/notes.md")), None);
        assert_eq!(project.kind_of(&project.path(SourceKind::Js)), Some(SourceKind::Js));
    }
}
