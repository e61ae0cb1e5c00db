//! Bus wire protocol
//!
//! Framing is a fixed-width decimal length header followed by a body whose
//! first five bytes name the destination. The bus never looks past the
//! destination of a routed frame.

pub mod constants;
pub mod frame;
pub mod frame_buffer;
pub mod name;
pub mod status;

pub use frame::{decode, decode_one, encode, Frame};
pub use frame_buffer::{CorruptionPolicy, FrameBuffer};
pub use name::ServiceName;
pub use status::BusStatus;
