mod args;
mod config;

use std::process::ExitCode;

use clap::Parser;
use pulse_app::{ApiError, AppState, Result};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use args::{Cli, Command};

/// Exit status for failures worth retrying later (EX_TEMPFAIL).
const EXIT_TEMPFAIL: u8 = 75;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let api = ApiError::from(err);
            match serde_json::to_string_pretty(&api) {
                Ok(json) => eprintln!("{json}"),
                Err(_) => eprintln!("{}", api.message),
            }
            if api.retryable {
                ExitCode::from(EXIT_TEMPFAIL)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let loaded = config::load(cli.config)?;
    if loaded.created {
        info!(path = %loaded.path.display(), "created default config");
    }

    let app_state = AppState::new(loaded.config);
    if app_state.is_fresh_db() {
        info!(path = %app_state.config.db_path.display(), "creating database");
    }
    app_state.setup_db()?;
    let services = &app_state.services;

    match cli.command {
        Command::Fetch {
            scope,
            no_cache,
            with_commits,
        } => {
            let mut report = services.ingest.fetch(&args::fetch_params(&scope, no_cache))?;
            if !with_commits {
                report.ingest.commits.clear();
            }
            print_json(&report)
        }
        Command::Recompute { scope } => print_json(&services.ingest.recompute(&scope.query())?),
        Command::Authors { scope } => print_json(&services.analytics.authors(&scope.query())?),
        Command::Deviations { scope, threshold } => {
            print_json(&services.analytics.deviations(&scope.query(), threshold)?)
        }
        Command::DayOfWeek {
            scope,
            metric,
            author,
        } => print_json(&services.analytics.day_of_week(
            &scope.query(),
            metric,
            author.as_deref(),
        )?),
        Command::Words { scope } => {
            print_json(&services.analytics.word_frequencies(&scope.query())?)
        }
        Command::Ledger { owner, name } => {
            print_json(&services.ingest.ledger(owner.as_deref(), name.as_deref())?)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
