//! Fixed-width service names
//!
//! Every body starts with a five byte destination field. Short names are
//! right-padded with spaces; names are compared on the padded form so
//! `"cat"` and `"cat  "` are the same destination.

use std::fmt;
use std::str::FromStr;

use super::constants::{NAME_PAD, NAME_WIDTH, REGISTER_SENTINEL};
use crate::error::FrameError;

/// A symbolic name occupying exactly [`NAME_WIDTH`] bytes on the wire
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceName([u8; NAME_WIDTH]);

impl ServiceName {
    /// Build a name from text, padding it to the field width
    ///
    /// Width is measured in bytes, so multi-byte characters count for more
    /// than one position. Names that do not fit are rejected.
    pub fn new(name: &str) -> Result<Self, FrameError> {
        Self::from_bytes(name.as_bytes())
    }

    /// Build a name from raw bytes, such as the content of a registration
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() > NAME_WIDTH {
            return Err(FrameError::NameTooLong(bytes.len()));
        }
        if bytes.iter().all(|b| *b == NAME_PAD) || bytes.iter().any(|b| *b < 0x20 || *b == 0x7f) {
            return Err(FrameError::InvalidName);
        }

        let mut field = [NAME_PAD; NAME_WIDTH];
        field[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(field))
    }

    /// Take a destination field exactly as it appeared on the wire
    pub fn from_field(field: [u8; NAME_WIDTH]) -> Self {
        Self(field)
    }

    /// The registration sentinel (`sinit`)
    pub fn register_sentinel() -> Self {
        let mut field = [NAME_PAD; NAME_WIDTH];
        field.copy_from_slice(REGISTER_SENTINEL.as_bytes());
        Self(field)
    }

    /// Random five character identifier for short-lived callers
    pub fn random() -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let mut field = [NAME_PAD; NAME_WIDTH];
        field.copy_from_slice(&id.as_bytes()[..NAME_WIDTH]);
        Self(field)
    }

    /// Whether this is the registration sentinel
    pub fn is_register_sentinel(&self) -> bool {
        self.0 == REGISTER_SENTINEL.as_bytes()
    }

    /// The padded field bytes
    pub fn as_bytes(&self) -> &[u8; NAME_WIDTH] {
        &self.0
    }

    /// The name without trailing padding
    pub fn trimmed(&self) -> &[u8] {
        let end = self
            .0
            .iter()
            .rposition(|b| *b != NAME_PAD)
            .map_or(0, |i| i + 1);
        &self.0[..end]
    }
}

impl FromStr for ServiceName {
    type Err = FrameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.trimmed()))
    }
}

impl fmt::Debug for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceName({:?})", String::from_utf8_lossy(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name_is_padded() {
        let name = ServiceName::new("cat").unwrap();
        assert_eq!(name.as_bytes(), b"cat  ");
        assert_eq!(name.to_string(), "cat");
    }

    #[test]
    fn test_padded_and_unpadded_are_equal() {
        assert_eq!(
            ServiceName::new("cat").unwrap(),
            ServiceName::new("cat  ").unwrap()
        );
    }

    #[test]
    fn test_long_name_rejected() {
        assert_eq!(
            ServiceName::new("catalog"),
            Err(FrameError::NameTooLong(7))
        );
    }

    #[test]
    fn test_width_counts_bytes() {
        // "ñandú" is five characters but seven bytes
        assert_eq!(ServiceName::new("ñandú"), Err(FrameError::NameTooLong(7)));
        assert!(ServiceName::new("ñu").is_ok());
    }

    #[test]
    fn test_empty_and_control_rejected() {
        assert_eq!(ServiceName::new(""), Err(FrameError::InvalidName));
        assert_eq!(ServiceName::new("   "), Err(FrameError::InvalidName));
        assert_eq!(ServiceName::new("a\nb"), Err(FrameError::InvalidName));
    }

    #[test]
    fn test_sentinel() {
        let sentinel = ServiceName::register_sentinel();
        assert!(sentinel.is_register_sentinel());
        assert_eq!(sentinel, "sinit".parse().unwrap());
        assert!(!ServiceName::new("catal").unwrap().is_register_sentinel());
    }

    #[test]
    fn test_random_names_fill_width() {
        let a = ServiceName::random();
        let b = ServiceName::random();
        assert_eq!(a.trimmed().len(), NAME_WIDTH);
        assert_ne!(a, b);
    }
}
