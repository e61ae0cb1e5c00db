//! Connection state machine
//!
//! Tracks one bus connection from accept to close.
//!
//! ```text
//! Connecting ──► Connected ──► Registered ──► Closed
//!                    │                          ▲
//!                    └──────────────────────────┘
//! ```
//!
//! Staying `Connected` forever is normal for callers that never register.

use std::net::SocketAddr;
use std::time::Instant;

use crate::protocol::ServiceName;

/// Connection lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Accepted, not yet set up
    Connecting,
    /// Ready to originate traffic, no name bound
    Connected,
    /// Bound to a name and receiving routed traffic
    Registered,
    /// Socket closed
    Closed,
}

/// Per-connection router state
#[derive(Debug)]
pub struct SessionState {
    /// Unique session ID
    pub id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: ConnectionPhase,

    /// Name this connection registered, if any
    pub name: Option<ServiceName>,

    /// Accept time
    pub connected_at: Instant,

    /// Frames decoded from this connection
    pub frames_received: u64,

    /// Bytes read from this connection
    pub bytes_received: u64,
}

impl SessionState {
    /// Create state for a freshly accepted socket
    pub fn new(id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: ConnectionPhase::Connecting,
            name: None,
            connected_at: Instant::now(),
            frames_received: 0,
            bytes_received: 0,
        }
    }

    /// Socket is set up and reading
    pub fn on_connected(&mut self) {
        if self.phase == ConnectionPhase::Connecting {
            self.phase = ConnectionPhase::Connected;
        }
    }

    /// Record a registration
    ///
    /// Returns the name previously held by this connection when it differs.
    pub fn on_registered(&mut self, name: ServiceName) -> Option<ServiceName> {
        if self.phase == ConnectionPhase::Closed {
            return None;
        }
        self.phase = ConnectionPhase::Registered;
        self.name.replace(name).filter(|prev| *prev != name)
    }

    /// Mark the connection closed
    pub fn close(&mut self) {
        self.phase = ConnectionPhase::Closed;
    }

    /// Whether the connection has a name bound
    pub fn is_registered(&self) -> bool {
        self.phase == ConnectionPhase::Registered
    }

    /// Time since accept
    pub fn duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }
}
