//! Long-running services
//!
//! A [`ServiceRunner`] keeps one registered connection alive and feeds its
//! inbound requests to a [`RequestHandler`]. When the connection drops it
//! waits the configured backoff, then connects and registers from scratch;
//! nothing from the old connection is resumed.
//!
//! ```text
//! Disconnected ──► Connecting ──► Registered
//!      ▲               │              │
//!      └───────────────┴──────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

use super::config::ClientConfig;
use super::envelope::Request;
use super::multiplexer::Multiplexer;
use crate::error::Result;
use crate::protocol::ServiceName;

/// Supervisor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// No connection; waiting to retry
    Disconnected,
    /// Connecting and registering
    Connecting,
    /// Registered and serving requests
    Registered,
}

/// Handler invoked for every inbound request
///
/// The returned error string is sent back as an error reply. `bus` lets the
/// handler call other services over the same connection.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle(
        &self,
        request: Request,
        bus: Multiplexer,
    ) -> impl Future<Output = std::result::Result<Value, String>> + Send;
}

/// Reconnecting service supervisor
pub struct ServiceRunner<H: RequestHandler> {
    config: ClientConfig,
    name: ServiceName,
    handler: Arc<H>,
    state_tx: watch::Sender<ServiceState>,
}

impl<H: RequestHandler> ServiceRunner<H> {
    /// Create a runner registering as `name`
    pub fn new(name: ServiceName, config: ClientConfig, handler: H) -> Self {
        let (state_tx, _) = watch::channel(ServiceState::Disconnected);
        Self {
            config: ClientConfig {
                name: Some(name),
                ..config
            },
            name,
            handler: Arc::new(handler),
            state_tx,
        }
    }

    /// Name the service registers under
    pub fn name(&self) -> ServiceName {
        self.name
    }

    /// Watch the supervisor state
    pub fn state(&self) -> watch::Receiver<ServiceState> {
        self.state_tx.subscribe()
    }

    /// Serve forever
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` completes
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            self.set_state(ServiceState::Connecting);

            let connected = tokio::select! {
                _ = &mut shutdown => break,
                result = Multiplexer::connect(self.config.clone()) => result,
            };

            match connected {
                Ok(bus) => {
                    self.set_state(ServiceState::Registered);
                    tokio::select! {
                        _ = &mut shutdown => {
                            bus.shutdown().await;
                            break;
                        }
                        _ = self.serve(bus.clone()) => {}
                    }
                    tracing::warn!(service = %self.name, "Connection to bus lost");
                }
                Err(e) => {
                    tracing::warn!(service = %self.name, error = %e, "Failed to connect to bus");
                }
            }

            self.set_state(ServiceState::Disconnected);
            tracing::info!(
                service = %self.name,
                backoff_ms = self.config.reconnect_backoff.as_millis() as u64,
                "Reconnecting after backoff"
            );

            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(self.config.reconnect_backoff) => {}
            }
        }

        self.set_state(ServiceState::Disconnected);
        tracing::info!(service = %self.name, "Service stopped");
        Ok(())
    }

    /// Dispatch requests until the connection closes
    async fn serve(&self, bus: Multiplexer) {
        let Some(mut requests) = bus.incoming().await else {
            return;
        };

        while let Some(request) = requests.recv().await {
            let handler = Arc::clone(&self.handler);
            let bus = bus.clone();

            tokio::spawn(async move {
                tracing::debug!(
                    service = %bus.name(),
                    from = %request.from,
                    correlation_id = %request.correlation_id,
                    "Handling request"
                );

                let outcome = handler.handle(request.clone(), bus.clone()).await;
                if let Err(e) = bus.reply(&request, outcome).await {
                    tracing::warn!(
                        correlation_id = %request.correlation_id,
                        error = %e,
                        "Failed to send reply"
                    );
                }
            });
        }
    }

    fn set_state(&self, state: ServiceState) {
        self.state_tx.send_replace(state);
    }
}
