//! Relay command-line front end.
//!
//! Loads a request (or one request out of a collection), an optional
//! environment and the executor settings, then drives the request through
//! the execution pipeline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use relay_application::{
    ApplicationResult, HistoryRepository, RequestExecutor, Session, StandardVariables,
    VariableResolver,
};
use relay_domain::{ApiResponse, Collection, Environment, ExecutorSettings, Request};
use relay_infrastructure::{
    FileHistoryRepository, InMemoryHistoryRepository, ReqwestTransport, SettingsRepository,
    SystemClock, default_engines, from_json_bytes,
};
use tokio::fs;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "relay",
    version,
    about = "Runs API requests with variables and scripts",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Request file to execute (.json), or a collection with --name
    #[arg(value_name = "REQUEST")]
    pub request: Option<PathBuf>,

    /// Request id or name to pick out of a collection file
    #[arg(short, long)]
    pub name: Option<String>,

    /// Environment file (.json)
    #[arg(short, long)]
    pub environment: Option<PathBuf>,

    /// Settings file (defaults to the platform config directory)
    #[arg(short, long)]
    pub settings: Option<PathBuf>,

    /// Command to run instead of a request
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Commands other than running a request.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the most recent history entries
    History {
        /// Number of entries to print
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// List the standard variables
    Variables,
}

/// Loads a request file. With `name`, the file is read as a collection and
/// the request with that id or name is returned.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the
/// collection has no such request.
pub async fn load_request(path: &Path, name: Option<&str>) -> Result<Request> {
    let content = fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;

    let Some(name) = name else {
        return from_json_bytes(&content).with_context(|| format!("parsing request {}", path.display()));
    };
    let collection: Collection = from_json_bytes(&content)
        .with_context(|| format!("parsing collection {}", path.display()))?;
    collection
        .find(name)
        .cloned()
        .with_context(|| format!("no request named {name} in collection {}", collection.name))
}

/// Loads an environment file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub async fn load_environment(path: &Path) -> Result<Environment> {
    let content = fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    from_json_bytes(&content).with_context(|| format!("parsing environment {}", path.display()))
}

/// Loads settings from `path`, or from the default location.
///
/// # Errors
///
/// Returns an error if an existing settings file cannot be read or parsed.
pub async fn load_settings(path: Option<&Path>) -> Result<ExecutorSettings> {
    let repository = path.map_or_else(SettingsRepository::new, SettingsRepository::at);
    repository.load().await.context("loading settings")
}

/// Opens the history file at the default location, falling back to memory
/// when there is no config directory.
#[must_use]
pub fn open_history(settings: &ExecutorSettings) -> Arc<dyn HistoryRepository> {
    match FileHistoryRepository::at_default_location(settings.history_limit) {
        Ok(repository) => {
            tracing::debug!(path = %repository.path().display(), "using history file");
            Arc::new(repository)
        }
        Err(error) => {
            tracing::warn!(%error, "history will not be persisted");
            Arc::new(InMemoryHistoryRepository::new(settings.history_limit))
        }
    }
}

/// Wires the executor from settings.
///
/// # Errors
///
/// Returns an error if the HTTP client or a script engine cannot be created.
pub fn build_executor(
    settings: &ExecutorSettings,
    history: Arc<dyn HistoryRepository>,
) -> ApplicationResult<RequestExecutor<ReqwestTransport>> {
    let clock = Arc::new(SystemClock::new());
    let standard = StandardVariables::from_os_rng(clock.clone());

    Ok(RequestExecutor::new(
        Arc::new(ReqwestTransport::new(settings)?),
        VariableResolver::new(Arc::new(standard)),
        default_engines(&settings.script)?,
        history,
        clock,
        settings.user_agent.clone(),
    ))
}

/// Executes one request and waits for its post-response script and
/// history write.
///
/// # Errors
///
/// Returns an error if the executor cannot be built.
pub async fn run_request(
    request: &Request,
    environment: &Environment,
    settings: &ExecutorSettings,
    history: Arc<dyn HistoryRepository>,
) -> Result<ApiResponse> {
    let executor = build_executor(settings, history)?;
    let response = executor.execute(request, &Session::new(environment)).await;
    executor.drain_background().await;
    Ok(response)
}
