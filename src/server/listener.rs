//! Bus server listener
//!
//! Handles TCP accept loop and spawns connection handlers.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};

use crate::error::Result;
use crate::registry::ServiceRegistry;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::server::router::Router;
use crate::stats::BusStats;

/// Bus router server
pub struct BusServer {
    config: ServerConfig,
    router: Arc<Router>,
    registry: Arc<ServiceRegistry>,
    stats: Arc<BusStats>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
    shutdown_tx: watch::Sender<bool>,
}

impl BusServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let registry = Arc::new(ServiceRegistry::new());
        let stats = Arc::new(BusStats::new());
        let router = Arc::new(Router::new(Arc::clone(&registry), Arc::clone(&stats)));

        Self {
            config,
            router,
            registry,
            stats,
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
            shutdown_tx: watch::channel(false).0,
        }
    }

    /// Get a reference to the service registry
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Get a reference to the router counters
    pub fn stats(&self) -> &Arc<BusStats> {
        &self.stats
    }

    /// Run the server
    ///
    /// This method blocks until the listener fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_until(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.serve_until(listener, std::future::pending()).await
    }

    /// Serve on an already bound listener until `shutdown` completes
    ///
    /// On shutdown the listener stops accepting, every open connection is
    /// told to close, and the call returns once they have released their
    /// names and flushed, or after `shutdown_timeout`. A server that has
    /// shut down closes any connection it is handed afterwards.
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Bus listening");

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
            }
            result = self.accept_loop(&listener) => return result,
        }

        drop(listener);
        self.close_connections().await;
        Ok(())
    }

    /// Tell every connection to close and wait for them
    async fn close_connections(&self) {
        self.shutdown_tx.send_replace(true);

        let open = self.shutdown_tx.receiver_count();
        if open == 0 {
            return;
        }
        tracing::info!(connections = open, "Closing open connections");

        let timeout = self.config.shutdown_timeout;
        if tokio::time::timeout(timeout, self.shutdown_tx.closed()).await.is_err() {
            tracing::warn!(
                remaining = self.shutdown_tx.receiver_count(),
                timeout_ms = timeout.as_millis() as u64,
                "Connections still open after shutdown timeout"
            );
        }
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.stats.connection_rejected();
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if self.config.tcp_nodelay {
            if let Err(e) = socket.set_nodelay(true) {
                tracing::error!(error = %e, "Failed to configure socket");
                return;
            }
        }

        let config = self.config.clone();
        let router = Arc::clone(&self.router);
        let stats = Arc::clone(&self.stats);
        let shutdown = self.shutdown_tx.subscribe();
        stats.connection_opened();

        tokio::spawn(async move {
            let _permit = permit;
            let mut connection = Connection::new(session_id, socket, peer_addr, config, router, shutdown);

            if let Err(e) = connection.run().await {
                tracing::debug!(
                    session_id = session_id,
                    error = %e,
                    "Connection error"
                );
            }

            stats.connection_closed();
            tracing::debug!(session_id = session_id, "Connection closed");
        });
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_without_connections_returns() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = BusServer::new(ServerConfig::with_addr(addr));

        assert_eq!(server.bind_addr(), addr);
        server.serve_until(listener, async {}).await.unwrap();
        assert_eq!(server.stats().snapshot().active_connections, 0);
    }
}
