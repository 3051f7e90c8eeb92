pub mod commands;
pub mod utils;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::console::Console;
use crate::router::MemoryLocation;
use crate::session::FileStore;

#[derive(Parser)]
#[command(name = "schoolops")]
#[command(about = "SchoolOps console - session-aware command-line shell for the ERP API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Credential and session management")]
    Auth {
        #[command(subcommand)]
        cmd: commands::auth::AuthCommands,
    },

    #[command(about = "Raw API calls through the session gateway")]
    Api {
        #[command(subcommand)]
        cmd: commands::api::ApiCommands,
    },

    #[command(about = "Boot the console and render a page (e.g. '#/students?grade=4')")]
    Open {
        #[arg(help = "Location fragment (defaults to the landing page)")]
        fragment: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Console backed by the on-disk session store, starting at `fragment`.
pub fn open_console(fragment: &str) -> anyhow::Result<Console> {
    let config = config::config().clone();
    let store = Arc::new(FileStore::in_dir(&config.storage.config_dir));
    let location = Arc::new(MemoryLocation::new(fragment));

    let console = Console::builder(config)
        .store(store)
        .location(location)
        .build()?;
    Ok(console)
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Auth { cmd } => commands::auth::handle(cmd, output_format).await,
        Commands::Api { cmd } => commands::api::handle(cmd, output_format).await,
        Commands::Open { fragment } => commands::open::handle(fragment, output_format).await,
    }
}
