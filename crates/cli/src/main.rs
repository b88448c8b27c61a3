mod commands;

use std::{
    fs::{self, OpenOptions},
    sync::Mutex,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use modcat_core::{
    config::{self, AppConfig},
    SortKey,
};
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "modcat", version, about = "Keep a local mod catalog in step with its remote manifest")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Refresh catalogs from their remote manifests.
    Sync {
        /// Only refresh this category.
        #[arg(long)]
        category: Option<String>,
    },
    /// Print the cached catalog.
    List {
        /// Category to print; defaults to the one used last.
        #[arg(long)]
        category: Option<String>,
        /// Order by name, author, initial or latest.
        #[arg(long)]
        sort: Option<SortKey>,
    },
    /// Show what a mod needs and what needs it.
    Deps {
        /// Category holding the mod.
        category: String,
        /// Mod name.
        name: String,
    },
    /// Record the install state of a mod.
    Mark {
        /// Category holding the mod.
        category: String,
        /// Mod name.
        name: String,
        /// Whether the mod is installed.
        #[arg(long)]
        installed: Option<bool>,
        /// Whether the mod is enabled.
        #[arg(long)]
        enabled: Option<bool>,
    },
    /// Check whether a newer installer release exists.
    CheckUpdate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = config::ensure_default_config()?;
    let mut config = AppConfig::load()?;
    init_logging(&config)?;

    match cli.command {
        Command::Sync { category } => commands::sync(&config, category.as_deref()).await,
        Command::List { category, sort } => {
            commands::list(&mut config, &config_path, category.as_deref(), sort)
        }
        Command::Deps { category, name } => commands::deps(&config, &category, &name),
        Command::Mark {
            category,
            name,
            installed,
            enabled,
        } => commands::mark(&config, &category, &name, installed, enabled),
        Command::CheckUpdate => commands::check_update(&config).await,
    }
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let log_dir = config.log_dir();
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join("modcat.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let default_level = if config.debug { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}
