//! Execute Request Use Case
//!
//! Drives one request through the pipeline:
//!
//! ```text
//! Created -> PreScriptRun? -> Dispatched -> ResponseCaptured
//!         -> PostScriptRun (detached) -> HistoryPersisted (detached) -> Done
//! ```
//!
//! A failed pre-request script or transport ends the run early with a
//! synthetic status-0 response. Nothing after dispatch can change the
//! response handed back to the caller.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use relay_domain::{
    ApiResponse, HistoryEntry, Request, ScriptContext, ScriptExecutionResult, ScriptLanguage,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::background::BackgroundTasks;
use crate::error::ApplicationResult;
use crate::message::{assemble_response, build_outbound};
use crate::ports::{CancellationReceiver, Clock, HistoryRepository, HttpTransport};
use crate::scripting::ScriptEngines;
use crate::session::Session;
use crate::variable_resolver::{VariableResolver, VariableSyntax};

/// Error type for cancellable execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecuteError {
    /// The caller cancelled before a response was captured.
    #[error("request cancelled")]
    Cancelled,
}

/// Pipeline stages, reported in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    /// Context built, immediate tokens resolved.
    Created,
    /// Pre-request script finished successfully.
    PreScriptRun,
    /// Pre-request script failed; terminal.
    PreScriptFailed,
    /// Message sent.
    Dispatched,
    /// Message could not be built or sent; terminal.
    TransportFailed,
    /// Response assembled.
    ResponseCaptured,
    /// Post-response script finished (detached).
    PostScriptRun,
    /// History entry written (detached).
    HistoryPersisted,
    /// Response handed back to the caller.
    Done,
}

impl ExecutionState {
    /// Lowercase stage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::PreScriptRun => "pre_script_run",
            Self::PreScriptFailed => "pre_script_failed",
            Self::Dispatched => "dispatched",
            Self::TransportFailed => "transport_failed",
            Self::ResponseCaptured => "response_captured",
            Self::PostScriptRun => "post_script_run",
            Self::HistoryPersisted => "history_persisted",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Use case for executing requests.
///
/// One executor is shared by every execution; it holds only long-lived
/// collaborators. Per-execution state lives in a `ScriptContext` owned by
/// the call.
///
/// # Example
///
/// ```ignore
/// let executor = RequestExecutor::new(transport, resolver, engines, history, clock, "Relay/0.1.0");
/// let response = executor.execute(&request, &Session::default()).await;
/// executor.drain_background().await;
/// ```
pub struct RequestExecutor<T: HttpTransport> {
    transport: Arc<T>,
    resolver: VariableResolver,
    scripts: Arc<ScriptEngines>,
    history: Arc<dyn HistoryRepository>,
    clock: Arc<dyn Clock>,
    user_agent: String,
    background: BackgroundTasks,
}

impl<T: HttpTransport> RequestExecutor<T> {
    /// Creates an executor.
    pub fn new(
        transport: Arc<T>,
        resolver: VariableResolver,
        scripts: ScriptEngines,
        history: Arc<dyn HistoryRepository>,
        clock: Arc<dyn Clock>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            resolver,
            scripts: Arc::new(scripts),
            history,
            clock,
            user_agent: user_agent.into(),
            background: BackgroundTasks::new(),
        }
    }

    /// The most recent history entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the history store cannot be read.
    pub async fn recent_history(&self, limit: usize) -> ApplicationResult<Vec<HistoryEntry>> {
        let mut entries = self.history.all().await?;
        entries.truncate(limit);
        Ok(entries)
    }

    /// Executes a snapshot of `request`.
    ///
    /// Always produces a response: script and transport failures come back
    /// as synthetic status-0 responses.
    pub async fn execute(&self, request: &Request, session: &Session) -> ApiResponse {
        self.run(request, session, None)
            .await
            .unwrap_or_else(|error| ApiResponse::network_error(Duration::ZERO, &error.to_string()))
    }

    /// Executes a snapshot of `request`, stopping early if `cancel` fires
    /// before the response is captured.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteError::Cancelled`] when cancelled. Detached work is
    /// only started after the response is captured, so a cancelled run
    /// writes no history.
    pub async fn execute_with_cancellation(
        &self,
        request: &Request,
        session: &Session,
        mut cancel: CancellationReceiver,
    ) -> Result<ApiResponse, ExecuteError> {
        self.run(request, session, Some(&mut cancel)).await
    }

    /// Waits for every detached post-response script and history write.
    pub async fn drain_background(&self) {
        self.background.drain().await;
    }

    async fn run(
        &self,
        request: &Request,
        session: &Session,
        mut cancel: Option<&mut CancellationReceiver>,
    ) -> Result<ApiResponse, ExecuteError> {
        let mut context = ScriptContext::new(session.environment().clone())
            .with_variables(session.variables());
        let resolved = self
            .resolver
            .resolve_request(VariableSyntax::Immediate, request, &mut context);
        context.set_request(resolved);
        debug!(request_id = %request.id, state = %ExecutionState::Created, "execution started");

        if let Some((language, code)) = request.pre_request() {
            if cancel.as_ref().is_some_and(|cancel| cancel.is_cancelled()) {
                return Err(ExecuteError::Cancelled);
            }
            let before = context.variables().clone();
            let result = race(
                cancel.as_deref_mut(),
                self.scripts.run(language, code, context),
            )
            .await?;
            match result {
                ScriptExecutionResult::Success { context: updated, .. } => {
                    session.apply_changes(&before, updated.variables());
                    context = updated;
                    debug!(state = %ExecutionState::PreScriptRun, %language, "pre-request script finished");
                }
                ScriptExecutionResult::Failure { error, .. } => {
                    warn!(state = %ExecutionState::PreScriptFailed, %language, %error, "pre-request script failed");
                    return Ok(ApiResponse::pre_script_failure(&error));
                }
            }
        }

        let pending = context.request().cloned().unwrap_or_else(|| request.clone());
        let sent = self
            .resolver
            .resolve_request(VariableSyntax::Deferred, &pending, &mut context);
        context.set_request(sent.clone());

        let started = Instant::now();
        let outbound = match build_outbound(&sent, &self.user_agent) {
            Ok(outbound) => outbound,
            Err(error) => {
                warn!(state = %ExecutionState::TransportFailed, %error, "request could not be built");
                return Ok(ApiResponse::network_error(started.elapsed(), &error.to_string()));
            }
        };
        debug!(state = %ExecutionState::Dispatched, method = %outbound.method, url = %outbound.url, "sending request");

        let raw = match race(cancel, self.transport.send(outbound)).await? {
            Ok(raw) => raw,
            Err(error) => {
                warn!(state = %ExecutionState::TransportFailed, %error, "request failed");
                return Ok(ApiResponse::network_error(started.elapsed(), &error.to_string()));
            }
        };
        let response = assemble_response(raw, started.elapsed());
        info!(
            state = %ExecutionState::ResponseCaptured,
            status = response.status_code(),
            elapsed_ms = %response.elapsed().as_millis(),
            "response received"
        );

        context.set_response(response.clone());
        let entry = HistoryEntry::new(sent.clone(), response.clone(), self.clock.now());

        if let Some((language, code)) = sent.post_response() {
            self.spawn_post_script(language, code.to_string(), context, session.clone());
        }
        self.spawn_history_write(entry);

        debug!(state = %ExecutionState::Done, "execution finished");
        Ok(response)
    }

    fn spawn_post_script(
        &self,
        language: ScriptLanguage,
        code: String,
        context: ScriptContext,
        session: Session,
    ) {
        let scripts = Arc::clone(&self.scripts);
        let before = context.variables().clone();
        self.background.spawn("post-response script", async move {
            match scripts.run(language, &code, context).await {
                ScriptExecutionResult::Success { context, .. } => {
                    session.apply_changes(&before, context.variables());
                    debug!(state = %ExecutionState::PostScriptRun, %language, "post-response script finished");
                }
                ScriptExecutionResult::Failure { error, .. } => {
                    warn!(%language, %error, "post-response script failed");
                }
            }
        });
    }

    fn spawn_history_write(&self, entry: HistoryEntry) {
        let history = Arc::clone(&self.history);
        self.background.spawn("history write", async move {
            let id = entry.id().to_string();
            match history.insert(entry).await {
                Ok(()) => debug!(state = %ExecutionState::HistoryPersisted, entry_id = %id, "history entry saved"),
                Err(error) => warn!(entry_id = %id, %error, "failed to save history entry"),
            }
        });
    }
}

async fn race<F: Future>(
    cancel: Option<&mut CancellationReceiver>,
    future: F,
) -> Result<F::Output, ExecuteError> {
    match cancel {
        None => Ok(future.await),
        Some(cancel) => tokio::select! {
            output = future => Ok(output),
            () = cancel.cancelled() => Err(ExecuteError::Cancelled),
        },
    }
}
