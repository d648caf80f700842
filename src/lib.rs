pub mod application;
pub mod domain;
pub mod infrastructure;

use application::bootstrap::bootstrap_workspace;
use application::commands::{
    build_day_impl, current_marker_impl, watch_marker_impl, AppState, CurrentMarkerResponse,
    DayPlanResponse,
};
use application::render_model::marker_view;
use clap::{Parser, Subcommand};
use infrastructure::config::load_settings;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Serialize)]
struct BootstrapResponse {
    workspace_root: String,
    config_dir: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse<'a> {
    error: &'a str,
}

/// Builds today's plan from the schedule, day-type calendar and event feed.
#[derive(Parser, Debug)]
#[command(name = "dayplanner", version)]
struct Cli {
    /// Workspace holding `config/` and `logs/` (defaults to the current directory)
    #[arg(long, global = true, value_name = "PATH")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Create the workspace folders and default config files
    Bootstrap,
    /// Print today's plan (the default)
    Day,
    /// Print the current-time marker
    Marker,
    /// Print today's plan, then the marker on every refresh
    Watch,
}

impl Cli {
    fn subcommand(&self) -> Command {
        self.command.unwrap_or(Command::Day)
    }
}

fn workspace_root(root: Option<PathBuf>) -> Result<PathBuf, String> {
    match root {
        Some(path) => Ok(path),
        None => std::env::current_dir().map_err(|error| error.to_string()),
    }
}

fn bootstrap(root: Option<PathBuf>) -> Result<BootstrapResponse, String> {
    let workspace_root = workspace_root(root)?;
    let result = bootstrap_workspace(&workspace_root).map_err(|error| error.to_string())?;
    Ok(BootstrapResponse {
        workspace_root: result.workspace_root.display().to_string(),
        config_dir: result.config_dir.display().to_string(),
    })
}

async fn build_day(state: &AppState) -> Result<DayPlanResponse, String> {
    build_day_impl(state)
        .await
        .map_err(|error| state.command_error("build_day", &error))
}

fn current_marker(state: &AppState) -> Result<CurrentMarkerResponse, String> {
    current_marker_impl(state).map_err(|error| state.command_error("current_marker", &error))
}

async fn watch(state: &AppState) -> Result<(), String> {
    let plan = build_day(state).await?;
    print_json(&plan);

    let pixels_per_minute = load_settings(state.config_dir())
        .map_err(|error| state.command_error("watch_marker", &error))?
        .display
        .pixels_per_minute;
    let (mut receiver, _handle) =
        watch_marker_impl(state).map_err(|error| state.command_error("watch_marker", &error))?;
    while receiver.changed().await.is_ok() {
        let minutes = *receiver.borrow_and_update();
        print_json(&CurrentMarkerResponse {
            marker: marker_view(minutes, pixels_per_minute),
        });
    }
    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(error) => eprintln!("failed to encode output: {error}"),
    }
}

async fn dispatch(cli: Cli) -> Result<(), String> {
    let command = cli.subcommand();
    if command == Command::Bootstrap {
        print_json(&bootstrap(cli.root)?);
        return Ok(());
    }

    let state = AppState::new(workspace_root(cli.root)?).map_err(|error| error.to_string())?;
    match command {
        Command::Bootstrap => Ok(()),
        Command::Day => {
            print_json(&build_day(&state).await?);
            Ok(())
        }
        Command::Marker => {
            print_json(&current_marker(&state)?);
            Ok(())
        }
        Command::Watch => watch(&state).await,
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("failed to start runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(dispatch(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            print_json(&ErrorResponse { error: &message });
            ExitCode::FAILURE
        }
    }
}
