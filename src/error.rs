//! Error types
//!
//! Wire-level problems are [`FrameError`], request/response failures seen by a
//! caller are [`RequestError`], and [`Error`] wraps everything else.

use std::time::Duration;

use thiserror::Error;

/// Errors produced while encoding or decoding frames
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The length header is not five ASCII digits
    #[error("invalid frame header: {0:?}")]
    InvalidHeader(String),

    /// Declared body is too short to hold a destination
    #[error("frame body of {0} bytes is shorter than the destination field")]
    BodyTooShort(usize),

    /// Body does not fit in the length header
    #[error("frame body of {0} bytes exceeds the maximum")]
    BodyTooLarge(usize),

    /// Service name wider than the destination field
    #[error("service name of {0} bytes does not fit the destination field")]
    NameTooLong(usize),

    /// Service name is empty or contains control bytes
    #[error("invalid service name")]
    InvalidName,
}

/// Failure of a correlated request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// No reply arrived before the deadline
    #[error("timed out after {after:?} waiting for {destination}")]
    Timeout { destination: String, after: Duration },

    /// The bus connection closed while the request was pending
    #[error("connection to the bus closed")]
    ConnectionClosed,

    /// The bus has no service registered under the destination
    #[error("no service registered as {destination}: {message}")]
    RouteNotFound { destination: String, message: String },

    /// The remote handler answered with an error status
    #[error("remote error: {message}")]
    Remote { message: String },

    /// The endpoint is shutting down
    #[error("endpoint shut down")]
    Shutdown,
}

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// Socket I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing failure
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Request failure
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Content was not a valid envelope
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Peer violated the bus conventions
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The bus did not confirm a registration
    #[error("registration rejected: {0}")]
    RegistrationRejected(String),
}

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;
