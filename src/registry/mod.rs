//! Service registry for name-based routing
//!
//! The registry maps fixed-width service names to the connection that
//! currently receives traffic for them.
//!
//! # Architecture
//!
//! ```text
//!                         Arc<ServiceRegistry>
//!                    ┌──────────────────────────┐
//!                    │ services: HashMap<Name,  │
//!                    │   RegistryEntry {        │
//!                    │     handle: tx ──────────┼──► connection writer ──► TCP
//!                    │   }                      │
//!                    │ >                        │
//!                    └────────────▲─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!    [Connection]            [Connection]            [Connection]
//!    sinit -> register()     route -> lookup()       close -> release_session()
//! ```
//!
//! Handles carry only an outbound queue, so the table never owns a socket.
//! Forwarded frames are `bytes::Bytes`, shared rather than copied.

pub mod entry;
pub mod error;
pub mod store;

pub use entry::{ConnectionHandle, DeliveryError, RegistryEntry};
pub use error::RegistryError;
pub use store::ServiceRegistry;
