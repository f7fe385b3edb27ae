//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the pipeline and external systems.
//! Each port is a trait implemented by adapters in the infrastructure layer.

mod cancellation;
mod clock;
mod history_repository;
mod http_transport;
mod script_engine;

pub use cancellation::{CancellationReceiver, CancellationToken};
pub use clock::Clock;
pub use history_repository::{HistoryError, HistoryRepository};
pub use http_transport::{
    HttpTransport, OutboundContent, OutboundRequest, TransportError, TransportResponse,
};
pub use script_engine::{ScriptEngine, ScriptEngineError};
