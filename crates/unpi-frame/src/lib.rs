//! UNPI frame encoding and decoding.
//!
//! This is the core of unpi. Every message on the wire is framed as:
//! - A start-of-frame marker `0xFE`
//! - A payload length, 1 byte or 2 bytes big-endian depending on the peer
//! - Two header bytes: command type and subsystem packed into the first,
//!   the command identifier in the second
//! - The payload
//! - An XOR checksum over everything between the marker and the checksum
//!
//! Framing errors are reported, never repaired: the decoder does not scan
//! ahead for the next start marker.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod frame;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

#[cfg(feature = "async")]
pub use async_codec::UnpiCodec;
pub use checksum::checksum;
pub use codec::{decode_frame, encode_frame, render_frame, FrameConfig, LengthWidth, SOF};
pub use error::{FrameError, Result};
pub use frame::{CommandType, Frame, Subsystem, COMMAND_TYPE_MASK, SUBSYSTEM_MASK};
pub use reader::FrameReader;
pub use writer::FrameWriter;
