//! Tokio codec adapter for UNPI framing.
//!
//! [`UnpiCodec`] plugs the buffer decoder and encoder into
//! [`tokio_util::codec::Framed`], so an async serial or TCP stream yields
//! [`Frame`] values directly. Framing errors follow the blocking reader: a bad
//! start byte costs one byte, a bad checksum costs the whole frame.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_frame, encode_frame, LengthWidth};
use crate::error::FrameError;
use crate::frame::Frame;

/// Tokio codec for UNPI frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnpiCodec {
    length_width: LengthWidth,
}

impl UnpiCodec {
    /// Create a codec for the given length field width.
    pub fn new(length_width: LengthWidth) -> Self {
        Self { length_width }
    }

    /// Length field width this codec uses.
    pub fn length_width(&self) -> LengthWidth {
        self.length_width
    }
}

impl Decoder for UnpiCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        decode_frame(src, self.length_width)
    }
}

impl Encoder<Frame> for UnpiCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&item, self.length_width, dst);
        Ok(())
    }
}

impl Encoder<&Frame> for UnpiCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(item, self.length_width, dst);
        Ok(())
    }
}
