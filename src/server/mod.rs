//! Bus router server
//!
//! Accepts connections, registers names on `sinit`, and relays every other
//! frame to the connection registered under its destination.

pub mod config;
pub mod connection;
pub mod listener;
pub mod router;

pub use config::ServerConfig;
pub use connection::Connection;
pub use listener::BusServer;
pub use router::Router;
