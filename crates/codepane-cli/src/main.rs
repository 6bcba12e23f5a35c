mod clipboard;
mod commands;
mod config;
mod project;
mod report;
mod ws_server;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::project::Project;

#[derive(Parser)]
#[command(name = "codepane")]
#[command(about = "Live HTML/CSS/JS playground with a console relay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory holding index.html, style.css and script.js
    #[arg(long, global = true, default_value = ".")]
    dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a share link (or the local snapshot) into the project files
    Open {
        /// Share link URL or bare token
        target: Option<String>,

        /// Forget the stored snapshot before loading
        #[arg(long)]
        reset: bool,
    },

    /// Print a share link for the project files and copy it
    Share,

    /// Write the preview document
    Render {
        /// Output HTML file ("-" for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also forward console output to the WebSocket relay
        #[arg(long)]
        relay: bool,
    },

    /// Run the preview headlessly and print its console
    Run,

    /// Re-run the preview whenever a project file changes
    Watch,

    /// Start the WebSocket relay for browser previews
    Relay {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("codepane=info"))
        .filter_module("notify", log::LevelFilter::Warn)
        .filter_module("tungstenite", log::LevelFilter::Warn)
        .filter_module("tokio_tungstenite", log::LevelFilter::Warn)
        .init();

    let cli = Cli::parse();
    let config = config::detect()?;
    let project = Project::new(&cli.dir);

    match cli.command {
        Commands::Open { target, reset } => {
            commands::open::run(&project, &config, target.as_deref(), reset)?;
        }

        Commands::Share => {
            commands::share::run(&project, &config)?;
        }

        Commands::Render { output, relay } => {
            commands::render::run(&project, &config, output.as_deref(), relay)?;
        }

        Commands::Run => {
            if !commands::run::run(&project, &config)? {
                std::process::exit(1);
            }
        }

        Commands::Watch => {
            commands::watch::run(&project, &config)?;
        }

        Commands::Relay { port } => {
            let port = port.unwrap_or(config.relay.port);
            tokio::runtime::Runtime::new()?.block_on(ws_server::serve(port))?;
        }
    }

    Ok(())
}
