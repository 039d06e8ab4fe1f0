//! UNPI framing for serial links to radio co-processors.
//!
//! UNPI is the command/response framing spoken by Texas Instruments Z-Stack
//! network processors and similar radio co-processors over UART. This crate
//! wires the pieces together into [`Unpi`], a codec bound to one transport.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte-stream transports and the background byte source
//! - [`frame`]: Frame model, checksum, encoder and decoder
//! - [`Unpi`]: One link: `write_frame` / `read_frame` over a [`transport::Transport`]

pub mod link;

pub use link::{Unpi, UnpiConfig};

/// Re-export transport types.
pub mod transport {
    pub use unpi_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use unpi_frame::*;
}
