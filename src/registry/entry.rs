//! Registry entries and connection handles

use std::net::SocketAddr;
use std::time::Instant;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Why a frame could not be queued for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    /// The connection's outbound queue is full
    QueueFull,
    /// The connection's writer has gone away
    Closed,
}

/// Cheap, cloneable handle for writing to one bus connection
///
/// The registry stores these; the socket itself stays with its
/// connection task.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    session_id: u64,
    peer_addr: SocketAddr,
    tx: mpsc::Sender<Bytes>,
}

impl ConnectionHandle {
    /// Create a handle around a connection's outbound queue
    pub fn new(session_id: u64, peer_addr: SocketAddr, tx: mpsc::Sender<Bytes>) -> Self {
        Self {
            session_id,
            peer_addr,
            tx,
        }
    }

    /// Session this handle writes to
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Remote address of the connection
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Queue wire bytes without waiting
    pub fn try_deliver(&self, bytes: Bytes) -> Result<(), DeliveryError> {
        self.tx.try_send(bytes).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Whether the connection's writer is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// One name binding in the registry
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// Connection authorised to receive traffic for the name
    pub handle: ConnectionHandle,

    /// When the binding was made
    pub registered_at: Instant,
}

impl RegistryEntry {
    pub(super) fn new(handle: ConnectionHandle) -> Self {
        Self {
            handle,
            registered_at: Instant::now(),
        }
    }
}
