//! Bus wire constants

/// Width of the decimal length header in bytes
pub const HEADER_WIDTH: usize = 5;

/// Width of the destination field at the start of every body
pub const NAME_WIDTH: usize = 5;

/// Largest body the header can describe
pub const MAX_BODY_SIZE: usize = 99_999;

/// Byte used to pad short names
pub const NAME_PAD: u8 = b' ';

/// Destination that marks a registration frame
pub const REGISTER_SENTINEL: &str = "sinit";

/// Status prefix of a successful bus reply
pub const STATUS_OK: &[u8] = b"OK";

/// Status prefix of a bus "not found" reply
pub const STATUS_NOT_FOUND: &[u8] = b"NK";

/// Default TCP port of the bus
pub const DEFAULT_BUS_PORT: u16 = 5001;
