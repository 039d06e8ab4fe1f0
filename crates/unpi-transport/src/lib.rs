//! Byte-stream transport abstraction for UNPI.
//!
//! The co-processor link is any ordered, reliable byte stream: a UART device
//! node, a TCP bridge, a Unix socket to a serial multiplexer. This crate
//! provides:
//! - [`Transport`], which splits a stream into an owned read half and a write half
//! - [`ByteSource`], the one-byte-at-a-time interface the frame decoder consumes
//! - [`StreamSource`], a background reader thread bridging the two
//!
//! This is the lowest layer of unpi. Opening and configuring the serial port
//! itself is left to the caller.

pub mod error;
pub mod source;
pub mod traits;

pub use error::{Result, TransportError};
pub use source::{
    ByteSource, SourceConfig, StreamSource, DEFAULT_EOF_BACKOFF, DEFAULT_QUEUE_CAPACITY,
};
pub use traits::{open_device, Duplex, Transport};
