//! svcbus
//!
//! A name-routed TCP service bus. Endpoints connect to a central router,
//! claim a five-byte name with a `sinit` frame, and then exchange frames
//! addressed by name. The router forwards frames verbatim and never looks
//! past the destination field.
//!
//! # Wire format
//!
//! ```text
//! +---------+-------------+-----------------+
//! | 5 bytes | 5 bytes     | N bytes         |
//! | length  | destination | content         |
//! | "00012" | "alpha"     | ...             |
//! +---------+-------------+-----------------+
//! ```
//!
//! The length is the zero-padded decimal byte count of destination plus
//! content. Destinations are space-padded on the right.
//!
//! # Running a bus
//!
//! ```no_run
//! use svcbus::{BusServer, ServerConfig};
//!
//! # async fn run() -> svcbus::Result<()> {
//! let server = BusServer::new(ServerConfig::default());
//! server.run().await
//! # }
//! ```
//!
//! # Calling a service
//!
//! ```no_run
//! use serde_json::json;
//! use svcbus::{ClientConfig, Multiplexer, ServiceName};
//!
//! # async fn call() -> svcbus::Result<()> {
//! let bus = Multiplexer::connect(ClientConfig::default()).await?;
//! let reply = bus
//!     .request(&ServiceName::new("alpha")?, json!({"msg": "ping"}))
//!     .await?;
//! println!("{}", reply);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod io;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use client::{BusConnector, ClientConfig, Multiplexer, RequestHandler, ServiceRunner, ServiceState};
pub use error::{Error, FrameError, RequestError, Result};
pub use protocol::{CorruptionPolicy, Frame, ServiceName};
pub use server::{BusServer, ServerConfig};
