use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use specter_core::{ScanOptionsBuilder, Settings, preflight};
use specter_paths::SpecterPaths;
use tracing::{error, info};

mod app;
mod logging;

use app::InstallPolicy;

#[derive(Debug, Parser)]
#[command(name = "specter", version, about = "Scan samples with containerised analysis plugins")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan a sample with every plugin that accepts its mime type
    Scan {
        /// File to scan
        #[arg(default_value = "")]
        path: String,
        /// Show plugin output and debug logs
        #[arg(long)]
        logs: bool,
        /// Install missing plugins without asking
        #[arg(long, short = 'y', conflicts_with = "no_install")]
        yes: bool,
        /// Never install missing plugins
        #[arg(long)]
        no_install: bool,
        /// Also run plugins disabled in the manifest
        #[arg(long)]
        all: bool,
        /// Settings file to use instead of the one in the config dir
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,
    },
}

impl Command {
    fn verbose(&self) -> bool {
        match self {
            Command::Scan { logs, .. } => *logs,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.command.verbose());

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<()> {
    match command {
        Command::Scan {
            path,
            logs,
            yes,
            no_install,
            all,
            config,
        } => {
            // Antes de crear carpetas, leer configuración o tomar el lock.
            let Some(path) = preflight(&path)? else {
                error!("please supply a valid file to scan");
                return Ok(());
            };

            let paths = SpecterPaths::new()?;
            let settings_file = config.unwrap_or_else(|| paths.settings_file.clone());
            let settings = Settings::load(Some(settings_file.as_path()))?;
            let catalog = app::load_catalog(&settings, &paths)?;

            let _lock = paths.lock().context("another scan is already running")?;

            let policy = InstallPolicy::from_flags(yes, no_install);
            let coordinator = app::build_coordinator(&settings, catalog, policy)?;
            let opts = ScanOptionsBuilder::default()
                .logs(logs)
                .enabled_only(!all)
                .build()?;

            let report = coordinator.scan(&path, &opts).await?;
            info!(
                session = %report.session_id,
                mime = report.sample.mime.as_deref().unwrap_or_default(),
                plugins = report.dispatched.len(),
                "scan complete"
            );
            Ok(())
        }
    }
}
