mod commands;
mod generate;
mod session;
mod tui;

use std::io::IsTerminal;

use clap::Parser;

use crate::args::{CliArgs, Command};
use crate::config::load_config;
use crate::logging::init_logging;

pub use session::Session;

pub async fn run() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let loaded = load_config(args.config.clone())?;
    let _logger = init_logging(&loaded.config.logging, &loaded.paths)?;

    let mut config = loaded.config;
    if let Some(max_parallel) = args.max_parallel {
        config.jobs.max_parallel = max_parallel;
    }
    let project = args.project_dir()?;
    log::info!(
        "creator-panel {} in {} (config {})",
        env!("CARGO_PKG_VERSION"),
        project.display(),
        if loaded.config_exists {
            loaded.paths.config_file.display().to_string()
        } else {
            "defaults".to_string()
        }
    );
    let session = Session::new(project, config);

    match args.command {
        Some(Command::Targets) => {
            commands::list_targets();
            Ok(())
        }
        Some(Command::Changes { json }) => commands::show_changes(&session, json).await,
        Some(Command::Diff { path, side_by_side }) => {
            commands::show_diff(&session, &path, side_by_side).await
        }
        Some(Command::Generate { targets, json }) => {
            generate::run_generate(&session, &targets, json).await
        }
        None if std::io::stdout().is_terminal() => tui::run_tui(session).await,
        None => Err(anyhow::anyhow!(
            "the panel needs a terminal; run a subcommand instead (see --help)"
        )),
    }
}
