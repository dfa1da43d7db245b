pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

use application::commands::AppState;
use clap::Parser;
use cli::{Cli, Commands};
use domain::task_store::TaskStore;
use infrastructure::config::{load_credentials_from_env, load_dashboard_config};
use infrastructure::error::InfraError;
use infrastructure::logging;
use std::process::ExitCode;

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    match run_cli(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("focusdesk: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run_cli(cli: Cli) -> Result<(), InfraError> {
    let config = load_dashboard_config(&cli.config_dir)?;
    logging::init(&config.log_level);

    let credentials = load_credentials_from_env();
    let tasks = match cli.command {
        Commands::Shell { demo: true } => TaskStore::with_demo_tasks(),
        _ => TaskStore::new(),
    };
    let state = AppState::new(config, credentials, tasks)?;
    tracing::info!(coach_live = state.coach_is_live(), "focusdesk starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(cli::execute(&state, cli.command))
}
