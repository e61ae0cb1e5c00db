//! Client configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::protocol::constants::DEFAULT_BUS_PORT;
use crate::protocol::{CorruptionPolicy, ServiceName};

/// Configuration shared by connectors, multiplexers and service runners
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Address of the bus router
    pub bus_addr: SocketAddr,

    /// Name to register (a random one is used when absent)
    pub name: Option<ServiceName>,

    /// Deadline for each correlated request
    pub request_timeout: Duration,

    /// Deadline for TCP connect and registration confirmation
    pub connect_timeout: Duration,

    /// Pause between reconnect attempts of a service runner
    pub reconnect_backoff: Duration,

    /// Reaction to an unparseable length header
    pub corruption_policy: CorruptionPolicy,

    /// Frames queued for writing before senders wait
    pub outbound_queue_capacity: usize,

    /// Inbound requests queued for the handler before new ones are dropped
    pub inbound_queue_capacity: usize,

    /// Application-level read buffer size
    pub read_buffer_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            bus_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_BUS_PORT)),
            name: None,
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            reconnect_backoff: Duration::from_secs(5),
            corruption_policy: CorruptionPolicy::Resync,
            outbound_queue_capacity: 1024,
            inbound_queue_capacity: 256,
            read_buffer_size: 64 * 1024,
        }
    }
}

impl ClientConfig {
    /// Create a config pointing at `addr`
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            bus_addr: addr,
            ..Default::default()
        }
    }

    /// Register under `name`
    pub fn name(mut self, name: ServiceName) -> Self {
        self.name = Some(name);
        self
    }

    /// Set the request deadline
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the connect and registration deadline
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the reconnect pause
    pub fn reconnect_backoff(mut self, backoff: Duration) -> Self {
        self.reconnect_backoff = backoff;
        self
    }

    /// Set the corruption policy
    pub fn corruption_policy(mut self, policy: CorruptionPolicy) -> Self {
        self.corruption_policy = policy;
        self
    }

    /// Name to register, generating one if none was configured
    pub fn name_or_random(&self) -> ServiceName {
        self.name.unwrap_or_else(ServiceName::random)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();

        assert_eq!(config.bus_addr.port(), 5001);
        assert!(config.name.is_none());
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.reconnect_backoff, Duration::from_secs(5));
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        let name = ServiceName::new("point").unwrap();
        let config = ClientConfig::new(addr)
            .name(name)
            .request_timeout(Duration::from_millis(250))
            .connect_timeout(Duration::from_secs(1))
            .reconnect_backoff(Duration::from_millis(100))
            .corruption_policy(CorruptionPolicy::Close);

        assert_eq!(config.bus_addr, addr);
        assert_eq!(config.name_or_random(), name);
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.connect_timeout, Duration::from_secs(1));
        assert_eq!(config.reconnect_backoff, Duration::from_millis(100));
        assert_eq!(config.corruption_policy, CorruptionPolicy::Close);
    }

    #[test]
    fn test_random_name_when_unset() {
        let config = ClientConfig::default();
        assert_ne!(config.name_or_random(), config.name_or_random());
    }
}
