//! Bus-generated status content
//!
//! The router talks to endpoints in two situations only:
//!
//! - registration confirmed: `OK<name>`
//! - destination unknown: `NK<destination><message>`
//!
//! Anything else an endpoint receives came from another endpoint.

use bytes::{BufMut, Bytes, BytesMut};

use super::constants::{NAME_WIDTH, STATUS_NOT_FOUND, STATUS_OK};
use super::name::ServiceName;

/// A status message from the bus itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusStatus {
    /// Registration of the name succeeded
    Registered(ServiceName),
    /// No service is registered under the destination
    NotFound {
        destination: ServiceName,
        message: String,
    },
}

impl BusStatus {
    /// Content bytes for a registration confirmation
    pub fn registered(name: &ServiceName) -> Bytes {
        let mut buf = BytesMut::with_capacity(STATUS_OK.len() + NAME_WIDTH);
        buf.put_slice(STATUS_OK);
        buf.put_slice(name.as_bytes());
        buf.freeze()
    }

    /// Content bytes for an unroutable destination
    pub fn not_found(destination: &ServiceName) -> Bytes {
        let message = format!("service '{}' is not registered", destination);
        let mut buf = BytesMut::with_capacity(STATUS_NOT_FOUND.len() + NAME_WIDTH + message.len());
        buf.put_slice(STATUS_NOT_FOUND);
        buf.put_slice(destination.as_bytes());
        buf.put_slice(message.as_bytes());
        buf.freeze()
    }

    /// Recognise bus status content
    ///
    /// Returns `None` for anything that is not a well-formed status, such as
    /// JSON sent by another endpoint.
    pub fn parse(content: &[u8]) -> Option<Self> {
        if content.len() < STATUS_OK.len() + NAME_WIDTH {
            return None;
        }

        let (marker, rest) = content.split_at(STATUS_OK.len());
        let mut field = [0u8; NAME_WIDTH];
        field.copy_from_slice(&rest[..NAME_WIDTH]);
        let name = ServiceName::from_field(field);

        if marker == STATUS_OK {
            Some(BusStatus::Registered(name))
        } else if marker == STATUS_NOT_FOUND {
            Some(BusStatus::NotFound {
                destination: name,
                message: String::from_utf8_lossy(&rest[NAME_WIDTH..]).into_owned(),
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_content() {
        let name = ServiceName::new("point").unwrap();
        let content = BusStatus::registered(&name);
        assert_eq!(&content[..], b"OKpoint");
        assert_eq!(BusStatus::parse(&content), Some(BusStatus::Registered(name)));
    }

    #[test]
    fn test_not_found_content() {
        let name = ServiceName::new("cart").unwrap();
        let content = BusStatus::not_found(&name);
        assert!(content.starts_with(b"NKcart "));

        match BusStatus::parse(&content) {
            Some(BusStatus::NotFound {
                destination,
                message,
            }) => {
                assert_eq!(destination, name);
                assert!(message.contains("cart"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_json_is_not_status() {
        assert_eq!(BusStatus::parse(br#"{"correlationId":"x"}"#), None);
        assert_eq!(BusStatus::parse(b"OK"), None);
    }
}
