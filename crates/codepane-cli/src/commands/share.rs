//! Share command - print the share link and copy it to the clipboard

use std::time::Instant;

use anyhow::Result;
use codepane::session::{copy_link, Tone};
use codepane::share::{encode, ShareLink};

use crate::clipboard::SystemClipboard;
use crate::config::Config;
use crate::project::Project;

pub fn run(project: &Project, config: &Config) -> Result<()> {
    let sources = project.read()?;
    let link = ShareLink::new(&config.share.origin, &config.share.path, &encode(&sources));
    println!("{link}");

    let status = copy_link(&mut SystemClipboard::detect(), &link, Instant::now());
    match status.tone {
        Tone::Success => eprintln!("{}", status.text),
        Tone::Failure => eprintln!("{} (select the link above)", status.text),
    }
    Ok(())
}
