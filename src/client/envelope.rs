//! Endpoint message envelope
//!
//! The bus never parses content, but every endpoint agrees on one JSON shape
//! so replies can be matched to requests:
//!
//! ```text
//! request: {"correlationId": "...", "clientId": "beta", "payload": {...}}
//! reply:   {"correlationId": "...", "status": "success", "data": {...}}
//!          {"correlationId": "...", "status": "error", "message": "..."}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, RequestError, Result};
use crate::protocol::ServiceName;

/// Outcome marker of a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Error,
}

/// Wire form of every endpoint message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub correlation_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ReplyStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A request delivered to a service
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Token to echo in the reply
    pub correlation_id: String,
    /// Registered name of the caller
    pub from: ServiceName,
    /// Request body
    pub payload: Value,
}

/// An envelope sorted by direction
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Request(Request),
    Reply {
        correlation_id: String,
        outcome: std::result::Result<Value, RequestError>,
    },
}

impl Envelope {
    /// Build a request from `from`
    pub fn request(correlation_id: &str, from: &ServiceName, payload: Value) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            client_id: Some(from.to_string()),
            status: None,
            payload: Some(payload),
            data: None,
            message: None,
        }
    }

    /// Build a successful reply
    pub fn success(correlation_id: &str, data: Value) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            client_id: None,
            status: Some(ReplyStatus::Success),
            payload: None,
            data: Some(data),
            message: None,
        }
    }

    /// Build an error reply
    pub fn failure(correlation_id: &str, message: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            client_id: None,
            status: Some(ReplyStatus::Error),
            payload: None,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Parse frame content
    pub fn from_slice(content: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(content)?)
    }

    /// Serialize to frame content
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Classify as request or reply
    ///
    /// Anything with a status is a reply; otherwise the caller's name is
    /// required so the service knows where to answer.
    pub fn into_message(self) -> Result<Message> {
        match self.status {
            Some(ReplyStatus::Success) => Ok(Message::Reply {
                correlation_id: self.correlation_id,
                outcome: Ok(self.data.unwrap_or(Value::Null)),
            }),
            Some(ReplyStatus::Error) => Ok(Message::Reply {
                correlation_id: self.correlation_id,
                outcome: Err(RequestError::Remote {
                    message: self.message.unwrap_or_else(|| "unknown error".to_string()),
                }),
            }),
            None => {
                let client_id = self
                    .client_id
                    .ok_or_else(|| Error::Protocol("request without clientId".to_string()))?;
                Ok(Message::Request(Request {
                    correlation_id: self.correlation_id,
                    from: ServiceName::new(&client_id)?,
                    payload: self.payload.unwrap_or(Value::Null),
                }))
            }
        }
    }
}
