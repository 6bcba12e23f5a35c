//! Watch command - re-run the preview whenever a project file changes

use std::time::Duration;

use anyhow::{Context, Result};
use codepane::autosave;
use codepane::{FileStore, HeadlessSandbox, Playground};
use notify::{Event, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::project::Project;
use crate::report;

/// Editors often write a file in several steps; wait this long for the rest.
const SETTLE: Duration = Duration::from_millis(50);

pub fn run(project: &Project, config: &Config) -> Result<()> {
    let store = autosave::shared(FileStore::new(project.storage_dir(&config.storage.dir)));

    tokio::runtime::Runtime::new()?.block_on(async {
        let (tx, mut events) = mpsc::unbounded_channel::<notify::Result<Event>>();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            let _ = tx.send(event);
        })?;
        watcher
            .watch(project.dir(), RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch {}", project.dir().display()))?;

        let mut playground = Playground::open(None, HeadlessSandbox, store, config.autosave.quiet());
        playground.replace(project.read()?);
        rerun(&mut playground)?;
        println!("\nWatching {} (Ctrl+C to stop)", project.dir().display());

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                event = events.recv() => {
                    let Some(event) = event else { break };
                    if !touches_sources(project, event) {
                        continue;
                    }
                    tokio::time::sleep(SETTLE).await;
                    while events.try_recv().is_ok() {}

                    playground.replace(project.read()?);
                    rerun(&mut playground)?;
                }
            }
        }

        playground.save_now();
        Ok(())
    })
}

fn touches_sources(project: &Project, event: notify::Result<Event>) -> bool {
    match event {
        Ok(event) => event.paths.iter().any(|path| project.kind_of(path).is_some()),
        Err(error) => {
            log::warn!("File watch error: {error}");
            false
        }
    }
}

fn rerun(playground: &mut Playground<HeadlessSandbox>) -> Result<()> {
    playground.run()?;
    report::print_panel(playground.panel());
    Ok(())
}
