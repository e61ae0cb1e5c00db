//! Raw bus connection
//!
//! Opens a socket to the router, optionally registers a name, and moves
//! whole frames in both directions. Short-lived callers can use it
//! directly; [`Multiplexer`](super::Multiplexer) builds on it.

use std::collections::VecDeque;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::config::ClientConfig;
use super::multiplexer::Multiplexer;
use crate::error::{Error, Result};
use crate::protocol::{BusStatus, Frame, FrameBuffer, ServiceName};

/// A connection to the bus that has not been split yet
pub struct BusConnector {
    config: ClientConfig,
    stream: TcpStream,
    buffer: FrameBuffer,
    decoded: VecDeque<Frame>,
    backlog: VecDeque<Frame>,
    read_buf: Vec<u8>,
    name: Option<ServiceName>,
}

impl BusConnector {
    /// Connect to the router
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(config.bus_addr))
            .await
            .map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    format!("connecting to bus at {} timed out", config.bus_addr),
                )
            })??;
        stream.set_nodelay(true)?;

        tracing::debug!(bus = %config.bus_addr, "Connected to bus");

        Ok(Self {
            buffer: FrameBuffer::with_policy(config.corruption_policy),
            read_buf: vec![0u8; config.read_buffer_size.max(1)],
            config,
            stream,
            decoded: VecDeque::new(),
            backlog: VecDeque::new(),
            name: None,
        })
    }

    /// Bind this connection to `name` and wait for the bus to confirm
    ///
    /// Frames that arrive before the confirmation are kept for
    /// [`recv`](Self::recv).
    pub async fn register(&mut self, name: ServiceName) -> Result<()> {
        self.send(&ServiceName::register_sentinel(), name.as_bytes())
            .await?;

        let timeout = self.config.connect_timeout;
        tokio::time::timeout(timeout, self.await_confirmation(name))
            .await
            .map_err(|_| {
                Error::RegistrationRejected(format!(
                    "no confirmation for '{}' within {:?}",
                    name, timeout
                ))
            })??;

        self.name = Some(name);
        tracing::info!(service = %name, "Registered on bus");
        Ok(())
    }

    async fn await_confirmation(&mut self, name: ServiceName) -> Result<()> {
        loop {
            let frame = self.read_frame().await?.ok_or_else(|| {
                Error::RegistrationRejected("bus closed the connection".to_string())
            })?;

            if frame.destination() == name
                && BusStatus::parse(&frame.content()) == Some(BusStatus::Registered(name))
            {
                return Ok(());
            }
            self.backlog.push_back(frame);
        }
    }

    /// Write one frame
    pub async fn send(&mut self, destination: &ServiceName, content: &[u8]) -> Result<()> {
        let frame = Frame::new(destination, content)?;
        self.stream.write_all(frame.as_bytes()).await?;
        Ok(())
    }

    /// Next inbound frame, or `None` once the bus closes the connection
    pub async fn recv(&mut self) -> Result<Option<Frame>> {
        if let Some(frame) = self.backlog.pop_front() {
            return Ok(Some(frame));
        }
        self.read_frame().await
    }

    async fn read_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.decoded.pop_front() {
                return Ok(Some(frame));
            }

            let n = self.stream.read(&mut self.read_buf).await?;
            if n == 0 {
                return Ok(None);
            }
            let frames = self.buffer.push(&self.read_buf[..n])?;
            self.decoded.extend(frames);
        }
    }

    /// Name registered on this connection
    pub fn name(&self) -> Option<ServiceName> {
        self.name
    }

    /// Split into the pieces a multiplexer needs
    ///
    /// Frames already received but not consumed come back in arrival order.
    pub(crate) fn into_parts(self) -> (TcpStream, FrameBuffer, Vec<Frame>, ClientConfig) {
        let mut unread: Vec<Frame> = self.backlog.into_iter().collect();
        unread.extend(self.decoded);
        (self.stream, self.buffer, unread, self.config)
    }

    /// Issue one correlated request on a throwaway connection
    ///
    /// Registers a random name for the reply, waits for it, and closes. A
    /// lost connection fails the call; nothing is retried.
    pub async fn call(config: ClientConfig, destination: &ServiceName, payload: Value) -> Result<Value> {
        let config = ClientConfig {
            name: Some(config.name_or_random()),
            ..config
        };
        let bus = Multiplexer::connect(config).await?;
        let reply = bus.request(destination, payload).await;
        bus.shutdown().await;
        reply
    }
}
