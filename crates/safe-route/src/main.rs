//! Safe Route - command-line shell around the routing engine
//!
//! Loads incident data, routes one request (or a batch file of requests) and prints the
//! result as JSON on stdout. Logs go to stderr.

mod batch;
mod export;
mod logging;
mod output;
mod settings;
mod state;

use clap::Parser;
use safe_route_lib::RouteError;
use settings::Settings;
use state::AppState;
use std::process::ExitCode;

/// Errors that end the program with a failure exit code
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GPX error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

fn main() -> ExitCode {
    let settings = Settings::parse();
    logging::setup_logging(settings.verbose);

    match run(settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(settings: Settings) -> Result<()> {
    let state = AppState::new(settings);

    match &state.settings.incidents {
        Some(path) => state.load_incidents(path)?,
        None => tracing::warn!("No incident file given, routing without penalties"),
    }

    let json = match &state.settings.batch {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            let entries = batch::run_batch(&state, &text);
            output::to_json(&entries, state.settings.pretty)?
        }
        None => {
            let (Some(from), Some(to)) = (state.settings.from, state.settings.to) else {
                return Err(RouteError::InvalidInput(
                    "both --from and --to are required without --batch".to_string(),
                )
                .into());
            };
            let snapshot = state.index.snapshot();
            let response = state.route(&snapshot.index, from.pair(), to.pair(), 0)?;
            if let Some(path) = &state.settings.gpx_out {
                export::write_gpx_file(&response.waypoints, path)?;
            }
            output::to_json(&response, state.settings.pretty)?
        }
    };

    println!("{}", json);
    Ok(())
}
