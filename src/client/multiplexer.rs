//! Request multiplexer
//!
//! Many concurrent requests share one bus connection. Each request carries a
//! fresh correlation ID inside its envelope; the reader task matches every
//! inbound reply back to the caller waiting on that ID.
//!
//! ```text
//! request() ──► PendingTable.insert(id) ──► writer task ──► bus
//!     ▲                                                      │
//!     └──── oneshot ◄── PendingTable.settle(id) ◄── reader task
//! ```
//!
//! Inbound requests (this endpoint acting as a service) are handed to
//! whoever took [`Multiplexer::incoming`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use super::config::ClientConfig;
use super::connector::BusConnector;
use super::envelope::{Envelope, Message, Request};
use super::pending::PendingTable;
use crate::error::{Error, RequestError, Result};
use crate::io::spawn_writer;
use crate::protocol::{BusStatus, Frame, FrameBuffer, ServiceName};

/// Handle to a registered bus connection
///
/// Cheap to clone; the connection closes when the last clone is dropped or
/// [`shutdown`](Self::shutdown) is called.
#[derive(Clone)]
pub struct Multiplexer {
    inner: Arc<Inner>,
}

struct Inner {
    name: ServiceName,
    request_timeout: Duration,
    tx: mpsc::Sender<Bytes>,
    pending: Arc<Mutex<PendingTable>>,
    incoming: Mutex<Option<mpsc::Receiver<Request>>>,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<Result<()>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.reader_task.abort();
        self.writer_task.abort();
    }
}

impl Multiplexer {
    /// Connect, register the configured (or a random) name, and start the
    /// reader and writer tasks
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let name = config.name_or_random();
        let mut connector = BusConnector::connect(config).await?;
        connector.register(name).await?;
        Self::from_connector(connector)
    }

    /// Take over a registered connector
    pub fn from_connector(connector: BusConnector) -> Result<Self> {
        let name = connector
            .name()
            .ok_or_else(|| Error::Protocol("multiplexer needs a registered name".to_string()))?;
        let (stream, buffer, unread, config) = connector.into_parts();
        let (reader, writer) = stream.into_split();

        let (tx, writer_task) = spawn_writer(writer, config.outbound_queue_capacity);
        let (incoming_tx, incoming_rx) = mpsc::channel(config.inbound_queue_capacity.max(1));
        let pending = Arc::new(Mutex::new(PendingTable::new()));

        let inbound = Reader {
            name,
            pending: Arc::clone(&pending),
            incoming: incoming_tx,
        };
        let read_buf_size = config.read_buffer_size.max(1);
        let reader_task = tokio::spawn(inbound.run(reader, buffer, unread, read_buf_size));

        Ok(Self {
            inner: Arc::new(Inner {
                name,
                request_timeout: config.request_timeout,
                tx,
                pending,
                incoming: Mutex::new(Some(incoming_rx)),
                reader_task,
                writer_task,
            }),
        })
    }

    /// Name this connection is registered under
    pub fn name(&self) -> ServiceName {
        self.inner.name
    }

    /// Send `payload` to `destination` and wait for the matching reply
    pub async fn request(&self, destination: &ServiceName, payload: Value) -> Result<Value> {
        self.request_with_timeout(destination, payload, self.inner.request_timeout)
            .await
    }

    /// Like [`request`](Self::request) with an explicit deadline
    pub async fn request_with_timeout(
        &self,
        destination: &ServiceName,
        payload: Value,
        timeout: Duration,
    ) -> Result<Value> {
        let correlation_id = uuid::Uuid::new_v4().to_string();
        let content = Envelope::request(&correlation_id, &self.inner.name, payload).to_vec()?;
        let frame = Frame::new(destination, &content)?;

        let rx = self
            .inner
            .pending
            .lock()
            .await
            .insert(correlation_id.clone(), *destination)?;

        tracing::debug!(
            correlation_id = %correlation_id,
            destination = %destination,
            "Sending request"
        );

        // Queueing counts against the deadline too
        let exchange = async {
            if self.inner.tx.send(frame.into_bytes()).await.is_err() {
                return Err(RequestError::ConnectionClosed);
            }
            rx.await.unwrap_or(Err(RequestError::ConnectionClosed))
        };

        match tokio::time::timeout(timeout, exchange).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                self.inner.pending.lock().await.expire(&correlation_id);
                Err(e.into())
            }
            Err(_) => {
                self.inner.pending.lock().await.expire(&correlation_id);
                tracing::warn!(
                    correlation_id = %correlation_id,
                    destination = %destination,
                    timeout_ms = timeout.as_millis() as u64,
                    "Request timed out"
                );
                Err(RequestError::Timeout {
                    destination: destination.to_string(),
                    after: timeout,
                }
                .into())
            }
        }
    }

    /// Answer a request received through [`incoming`](Self::incoming)
    pub async fn reply(
        &self,
        request: &Request,
        outcome: std::result::Result<Value, String>,
    ) -> Result<()> {
        let envelope = match outcome {
            Ok(data) => Envelope::success(&request.correlation_id, data),
            Err(message) => Envelope::failure(&request.correlation_id, message),
        };
        self.send(&request.from, &envelope.to_vec()?).await
    }

    /// Send raw content without waiting for any reply
    pub async fn send(&self, destination: &ServiceName, content: &[u8]) -> Result<()> {
        let frame = Frame::new(destination, content)?;
        self.inner
            .tx
            .send(frame.into_bytes())
            .await
            .map_err(|_| RequestError::ConnectionClosed.into())
    }

    /// Take the stream of inbound requests
    ///
    /// Only the first call gets it. The stream ends when the connection
    /// closes.
    pub async fn incoming(&self) -> Option<mpsc::Receiver<Request>> {
        self.inner.incoming.lock().await.take()
    }

    /// Requests still waiting for a reply
    pub async fn pending_count(&self) -> usize {
        self.inner.pending.lock().await.len()
    }

    /// Whether the connection to the bus is gone
    pub async fn is_closed(&self) -> bool {
        self.inner.pending.lock().await.is_closed()
    }

    /// Close the connection, failing every pending request
    pub async fn shutdown(&self) {
        self.inner.reader_task.abort();
        self.inner.writer_task.abort();
        self.inner
            .pending
            .lock()
            .await
            .close(RequestError::Shutdown);
    }
}

/// Inbound side of a multiplexed connection
struct Reader {
    name: ServiceName,
    pending: Arc<Mutex<PendingTable>>,
    incoming: mpsc::Sender<Request>,
}

impl Reader {
    async fn run(self, mut socket: OwnedReadHalf, mut buffer: FrameBuffer, unread: Vec<Frame>, buf_size: usize) {
        for frame in unread {
            self.dispatch(frame).await;
        }

        let mut buf = vec![0u8; buf_size];
        let result: Result<()> = async {
            loop {
                let n = socket.read(&mut buf).await?;
                if n == 0 {
                    return Ok(());
                }
                for frame in buffer.push(&buf[..n])? {
                    self.dispatch(frame).await;
                }
            }
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(service = %self.name, error = %e, "Bus connection failed");
        }

        let failed = self
            .pending
            .lock()
            .await
            .close(RequestError::ConnectionClosed);
        tracing::info!(
            service = %self.name,
            failed_requests = failed,
            "Bus connection closed"
        );
    }

    async fn dispatch(&self, frame: Frame) {
        let destination = frame.destination();
        if destination != self.name {
            tracing::warn!(
                service = %self.name,
                destination = %destination,
                "Ignoring frame addressed to another name"
            );
            return;
        }

        let content = frame.content();
        if let Some(status) = BusStatus::parse(&content) {
            self.on_status(status).await;
            return;
        }

        let message = match Envelope::from_slice(&content).and_then(Envelope::into_message) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(service = %self.name, error = %e, "Dropping unreadable message");
                return;
            }
        };

        match message {
            Message::Reply {
                correlation_id,
                outcome,
            } => {
                if !self.pending.lock().await.settle(&correlation_id, outcome) {
                    tracing::warn!(
                        service = %self.name,
                        correlation_id = %correlation_id,
                        "Dropping reply with no pending request"
                    );
                }
            }
            Message::Request(request) => {
                if let Err(e) = self.incoming.try_send(request) {
                    tracing::warn!(
                        service = %self.name,
                        reason = %e,
                        "Dropping inbound request"
                    );
                }
            }
        }
    }

    async fn on_status(&self, status: BusStatus) {
        match status {
            BusStatus::Registered(name) => {
                tracing::debug!(service = %name, "Registration confirmed");
            }
            BusStatus::NotFound {
                destination,
                message,
            } => {
                let error = RequestError::RouteNotFound {
                    destination: destination.to_string(),
                    message: message.clone(),
                };
                let rejected = self
                    .pending
                    .lock()
                    .await
                    .reject_oldest_for(&destination, error);
                tracing::warn!(
                    service = %self.name,
                    destination = %destination,
                    correlation_id = ?rejected,
                    "{}",
                    message
                );
            }
        }
    }
}
