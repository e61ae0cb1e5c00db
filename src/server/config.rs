//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::protocol::constants::DEFAULT_BUS_PORT;
use crate::protocol::CorruptionPolicy;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Application-level read buffer size
    pub read_buffer_size: usize,

    /// Frames queued per connection before forwarded frames are dropped
    pub outbound_queue_capacity: usize,

    /// Reaction to an unparseable length header
    pub corruption_policy: CorruptionPolicy,

    /// How long a closing connection may spend flushing queued frames
    pub drain_timeout: Duration,

    /// How long shutdown waits for open connections to finish
    pub shutdown_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_BUS_PORT)),
            max_connections: 0, // Unlimited
            tcp_nodelay: true,
            read_buffer_size: 64 * 1024, // 64KB
            outbound_queue_capacity: 1024,
            corruption_policy: CorruptionPolicy::Resync,
            drain_timeout: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the per-connection outbound queue capacity
    pub fn outbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.outbound_queue_capacity = capacity.max(1);
        self
    }

    /// Set the read buffer size
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    /// Set the corruption policy
    pub fn corruption_policy(mut self, policy: CorruptionPolicy) -> Self {
        self.corruption_policy = policy;
        self
    }

    /// Set the flush deadline for closing connections
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    /// Set how long shutdown waits for connections
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 5001);
        assert_eq!(config.max_connections, 0);
        assert!(config.tcp_nodelay);
        assert_eq!(config.corruption_policy, CorruptionPolicy::Resync);
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:6001".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 6001);
    }

    #[test]
    fn test_builder_queue_capacity_floor() {
        let config = ServerConfig::default().outbound_queue_capacity(0);

        assert_eq!(config.outbound_queue_capacity, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:5001".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .max_connections(50)
            .read_buffer_size(4096)
            .outbound_queue_capacity(16)
            .corruption_policy(CorruptionPolicy::Close);

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.read_buffer_size, 4096);
        assert_eq!(config.outbound_queue_capacity, 16);
        assert_eq!(config.corruption_policy, CorruptionPolicy::Close);
    }

    #[test]
    fn test_drain_and_shutdown_deadlines() {
        let config = ServerConfig::default();
        assert_eq!(config.drain_timeout, Duration::from_secs(1));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));

        let config = config
            .drain_timeout(Duration::from_millis(200))
            .shutdown_timeout(Duration::from_secs(1));
        assert_eq!(config.drain_timeout, Duration::from_millis(200));
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));
    }
}
