//! Frame routing
//!
//! The router is a pure relay keyed on the destination field. It knows two
//! things besides forwarding: `sinit` registers the sender, and an unknown
//! destination earns the sender an `NK` reply.

use std::sync::Arc;

use crate::protocol::{BusStatus, Frame, ServiceName};
use crate::registry::{ConnectionHandle, DeliveryError, RegistryError, ServiceRegistry};
use crate::session::SessionState;
use crate::stats::BusStats;

/// Routing logic shared by all connections
pub struct Router {
    registry: Arc<ServiceRegistry>,
    stats: Arc<BusStats>,
}

impl Router {
    pub fn new(registry: Arc<ServiceRegistry>, stats: Arc<BusStats>) -> Self {
        Self { registry, stats }
    }

    /// Registry this router mutates
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Handle one decoded frame from `session`
    pub async fn on_frame(&self, session: &mut SessionState, handle: &ConnectionHandle, frame: Frame) {
        session.frames_received += 1;
        let destination = frame.destination();

        if destination.is_register_sentinel() {
            self.register(session, handle, &frame.content()).await;
            return;
        }

        match self.registry.route(&destination).await {
            Ok(target) => {
                let len = frame.as_bytes().len();
                match target.try_deliver(frame.into_bytes()) {
                    Ok(()) => {
                        self.stats.routed(len);
                        tracing::trace!(
                            session_id = session.id,
                            destination = %destination,
                            target = target.session_id(),
                            bytes = len,
                            "Frame routed"
                        );
                    }
                    Err(err) => self.drop_frame(session.id, &destination, &target, err),
                }
            }
            Err(RegistryError::NotRegistered(_)) => {
                self.stats.unroutable();
                self.reply_not_found(session, handle, &destination);
            }
        }
    }

    /// Release everything a closing connection held
    pub async fn on_close(&self, session: &mut SessionState) {
        let released = self.registry.release_session(session.id).await;
        session.close();

        tracing::debug!(
            session_id = session.id,
            released = released.len(),
            duration_ms = session.duration().as_millis() as u64,
            "Session closed"
        );
    }

    async fn register(&self, session: &mut SessionState, handle: &ConnectionHandle, content: &[u8]) {
        let name = match ServiceName::from_bytes(content) {
            Ok(name) if !name.is_register_sentinel() => name,
            _ => {
                tracing::warn!(
                    session_id = session.id,
                    content = %String::from_utf8_lossy(content),
                    "Ignoring registration with invalid name"
                );
                return;
            }
        };

        if let Some(previous) = session.on_registered(name) {
            self.registry.release(&previous, session.id).await;
        }
        self.registry.register(name, handle.clone()).await;
        self.stats.registered();

        let confirmation = Frame::new(&name, &BusStatus::registered(&name));
        match confirmation {
            Ok(frame) => {
                if let Err(err) = handle.try_deliver(frame.into_bytes()) {
                    self.drop_frame(session.id, &name, handle, err);
                }
            }
            Err(err) => tracing::error!(error = %err, "Failed to encode confirmation"),
        }
    }

    fn reply_not_found(&self, session: &SessionState, handle: &ConnectionHandle, destination: &ServiceName) {
        let Some(sender) = session.name else {
            tracing::debug!(
                session_id = session.id,
                destination = %destination,
                "Unroutable frame from unregistered sender dropped"
            );
            return;
        };

        tracing::debug!(
            session_id = session.id,
            sender = %sender,
            destination = %destination,
            "Destination not registered"
        );

        match Frame::new(&sender, &BusStatus::not_found(destination)) {
            Ok(frame) => {
                if let Err(err) = handle.try_deliver(frame.into_bytes()) {
                    self.drop_frame(session.id, &sender, handle, err);
                }
            }
            Err(err) => tracing::error!(error = %err, "Failed to encode not-found reply"),
        }
    }

    fn drop_frame(
        &self,
        session_id: u64,
        destination: &ServiceName,
        target: &ConnectionHandle,
        err: DeliveryError,
    ) {
        self.stats.dropped();
        tracing::warn!(
            session_id = session_id,
            destination = %destination,
            target = target.session_id(),
            peer = %target.peer_addr(),
            reason = ?err,
            "Frame dropped"
        );
    }
}
