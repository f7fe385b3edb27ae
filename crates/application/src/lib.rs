//! Relay Application - Ports and the request execution pipeline
//!
//! This crate defines:
//! - Port traits for the transport, script engines, history and the clock
//! - The two-phase variable resolver and the standard variable provider
//! - The request executor that drives one request through the pipeline

pub mod background;
pub mod error;
pub mod execute_request;
pub mod message;
pub mod ports;
pub mod scripting;
pub mod session;
pub mod variable_resolver;

pub use background::BackgroundTasks;
pub use error::{ApplicationError, ApplicationResult};
pub use execute_request::{ExecuteError, ExecutionState, RequestExecutor};
pub use ports::{
    CancellationReceiver, CancellationToken, Clock, HistoryError, HistoryRepository,
    HttpTransport, OutboundContent, OutboundRequest, ScriptEngine, ScriptEngineError,
    TransportError, TransportResponse,
};
pub use scripting::ScriptEngines;
pub use session::Session;
pub use variable_resolver::{StandardVariables, VariableResolver, VariableSyntax};
