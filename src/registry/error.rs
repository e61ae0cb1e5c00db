//! Registry error types

use thiserror::Error;

use crate::protocol::ServiceName;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No connection holds the name
    #[error("service not registered: {0}")]
    NotRegistered(ServiceName),
}
