//! Render command - write the preview document for a browser

use std::path::Path;

use anyhow::{Context, Result};
use codepane::shim::{RelayTarget, ShimOptions};
use codepane::synth::synthesize_with;
use codepane::ContextId;

use crate::config::Config;
use crate::project::Project;

const DEFAULT_OUTPUT: &str = "preview.html";

pub fn run(project: &Project, config: &Config, output: Option<&Path>, relay: bool) -> Result<()> {
    let sources = project.read()?;
    let context = ContextId::new();
    let options = ShimOptions {
        relay: relay.then(|| RelayTarget::new(config.relay.endpoint(), context)),
    };
    let document = synthesize_with(&sources, &options);

    if output == Some(Path::new("-")) {
        print!("{document}");
        return Ok(());
    }

    let path = output.map_or_else(|| project.dir().join(DEFAULT_OUTPUT), Path::to_path_buf);
    std::fs::write(&path, document.to_html()).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    if let Some(target) = &options.relay {
        println!("Relaying context {context} to {}", target.url());
    }
    Ok(())
}
