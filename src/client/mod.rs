//! Bus endpoints
//!
//! Everything that talks to the router from the outside:
//!
//! - [`BusConnector`]: one raw connection, for short-lived callers
//! - [`Multiplexer`]: correlated request/response over one shared connection
//! - [`ServiceRunner`]: a registered service that reconnects after failures

pub mod config;
pub mod connector;
pub mod envelope;
pub mod multiplexer;
pub mod pending;
pub mod service;

pub use config::ClientConfig;
pub use connector::BusConnector;
pub use envelope::{Envelope, Message, ReplyStatus, Request};
pub use multiplexer::Multiplexer;
pub use pending::{PendingTable, Settlement};
pub use service::{RequestHandler, ServiceRunner, ServiceState};
