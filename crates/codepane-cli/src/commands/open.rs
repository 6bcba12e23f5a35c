//! Open command - load a share link or the snapshot into the project files

use anyhow::{Context, Result};
use codepane::session::load_sources;
use codepane::share::fragment_of;
use codepane::{snapshot, FileStore};

use crate::config::Config;
use crate::project::Project;

/// With `reset`, the stored snapshot is forgotten first, so a missing or
/// broken link falls back to the starter content.
pub fn run(project: &Project, config: &Config, target: Option<&str>, reset: bool) -> Result<()> {
    let mut store = FileStore::new(project.storage_dir(&config.storage.dir));
    if reset {
        snapshot::clear(&mut store).context("Failed to clear snapshot")?;
    }
    let fragment = target.and_then(fragment_of);
    if target.is_some() && fragment.is_none() {
        log::warn!("No share token in the given link");
    }

    let (sources, origin) = load_sources(fragment, &store);
    project.write(&sources)?;
    snapshot::save(&mut store, &sources).context("Failed to store snapshot")?;

    println!("Opened {} from {origin}", project.dir().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use codepane::{SourceSet, SnapshotStore};

    use super::*;

    fn saved(project: &Project, config: &Config, sources: &SourceSet) {
        let mut store = FileStore::new(project.storage_dir(&config.storage.dir));
        snapshot::save(&mut store, sources).unwrap();
    }

    #[test]
    fn snapshot_is_restored() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path());
        let config = Config::default();
        let sources = SourceSet::new("<p>mine</p>", "p {}", "go()");
        saved(&project, &config, &sources);

        run(&project, &config, None, false).unwrap();
        assert_eq!(project.read().unwrap(), sources);
    }

    #[test]
    fn reset_starts_from_the_starter() {
        let dir = tempfile::tempdir().unwrap();
        let project = Project::new(dir.path());
        let config = Config::default();
        saved(&project, &config, &SourceSet::new("<p>mine</p>", "", ""));

        run(&project, &config, None, true).unwrap();
        assert_eq!(project.read().unwrap(), SourceSet::builtin());
        let store = FileStore::new(project.storage_dir(&config.storage.dir));
        assert_eq!(store.get(snapshot::HTML_KEY).unwrap(), Some(SourceSet::builtin().html));
    }
}
