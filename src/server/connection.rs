//! Per-connection task
//!
//! Reads the socket, drains every complete frame through the router, and
//! releases the connection's names when the socket goes away. Frames
//! already queued for the peer are flushed before the socket closes.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpStream;
use tokio::sync::watch;

use crate::error::Result;
use crate::io::spawn_writer;
use crate::protocol::FrameBuffer;
use crate::registry::ConnectionHandle;
use crate::server::config::ServerConfig;
use crate::server::router::Router;
use crate::session::SessionState;

/// One accepted bus connection
pub struct Connection {
    state: SessionState,
    socket: Option<TcpStream>,
    config: ServerConfig,
    router: Arc<Router>,
    shutdown: watch::Receiver<bool>,
}

impl Connection {
    /// `shutdown` flips to `true` when the server stops
    pub fn new(
        session_id: u64,
        socket: TcpStream,
        peer_addr: SocketAddr,
        config: ServerConfig,
        router: Arc<Router>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            state: SessionState::new(session_id, peer_addr),
            socket: Some(socket),
            config,
            router,
            shutdown,
        }
    }

    /// Run until the peer disconnects, the stream becomes unusable, or the
    /// server shuts down
    ///
    /// Registry cleanup happens on every exit path.
    pub async fn run(&mut self) -> Result<()> {
        let Some(socket) = self.socket.take() else {
            return Ok(());
        };

        let (mut reader, writer) = socket.into_split();
        let (tx, mut writer_task) = spawn_writer(writer, self.config.outbound_queue_capacity);
        let handle = ConnectionHandle::new(self.state.id, self.state.peer_addr, tx);
        self.state.on_connected();

        let result = self.read_loop(&mut reader, &handle).await;

        // Release names first so no other connection queues more frames here
        self.router.on_close(&mut self.state).await;
        drop(handle);

        match tokio::time::timeout(self.config.drain_timeout, &mut writer_task).await {
            Ok(Ok(Err(e))) => {
                tracing::debug!(session_id = self.state.id, error = %e, "Writer failed while draining");
            }
            Ok(_) => {}
            Err(_) => {
                tracing::warn!(
                    session_id = self.state.id,
                    timeout_ms = self.config.drain_timeout.as_millis() as u64,
                    "Outbound queue not drained in time"
                );
                writer_task.abort();
            }
        }

        result
    }

    async fn read_loop(&mut self, reader: &mut OwnedReadHalf, handle: &ConnectionHandle) -> Result<()> {
        let mut frames = FrameBuffer::with_policy(self.config.corruption_policy);
        let mut buf = vec![0u8; self.config.read_buffer_size.max(1)];

        loop {
            let n = tokio::select! {
                read = reader.read(&mut buf) => read?,
                _ = stopped(&mut self.shutdown) => {
                    tracing::debug!(session_id = self.state.id, "Closing for server shutdown");
                    return Ok(());
                }
            };
            if n == 0 {
                return Ok(());
            }
            self.state.bytes_received += n as u64;

            for frame in frames.push(&buf[..n])? {
                self.router.on_frame(&mut self.state, handle, frame).await;
            }
        }
    }
}

/// Resolves once the shutdown flag is set
///
/// Never resolves if the server side of the channel is gone.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    loop {
        let stop = *rx.borrow_and_update();
        if stop {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
