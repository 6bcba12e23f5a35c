//! Run command - execute the preview headlessly and print its console

use anyhow::Result;
use codepane::autosave;
use codepane::{FileStore, HeadlessSandbox, Playground};

use crate::config::Config;
use crate::project::Project;
use crate::report;

/// Returns `false` when the preview raised any error.
pub fn run(project: &Project, config: &Config) -> Result<bool> {
    let sources = project.read()?;
    let store = autosave::shared(FileStore::new(project.storage_dir(&config.storage.dir)));

    tokio::runtime::Runtime::new()?.block_on(async {
        let mut playground = Playground::open(None, HeadlessSandbox, store, config.autosave.quiet());
        playground.replace(sources);
        playground.save_now();

        playground.run()?;
        report::print_panel(playground.panel());
        Ok(playground.panel().faults().next().is_none())
    })
}
