use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::{debug, warn};
use unpi_transport::TransportError;

use crate::codec::{encode_frame, LengthWidth};
use crate::error::Result;
use crate::frame::Frame;

const INITIAL_BUFFER_CAPACITY: usize = 256;

/// Writes complete frames to any `Write` stream.
///
/// Every frame is rendered into an internal buffer before anything touches
/// the stream, then written in one go. Concurrent producers must serialize
/// access themselves.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    length_width: LengthWidth,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer for the given length field width.
    pub fn new(inner: T, length_width: LengthWidth) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            length_width,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.payload.len() > self.length_width.max_payload() {
            warn!(
                payload_len = frame.payload.len(),
                max = self.length_width.max_payload(),
                "payload exceeds length field, length will wrap"
            );
        }

        self.buf.clear();
        encode_frame(frame, self.length_width, &mut self.buf);

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(TransportError::Io(ErrorKind::WriteZero.into()).into()),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
        self.flush()?;

        debug!(
            command_type = %frame.command_type,
            subsystem = %frame.subsystem,
            command = frame.command,
            wire_len = self.buf.len(),
            "frame written"
        );
        Ok(())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Length field width this writer encodes with.
    pub fn length_width(&self) -> LengthWidth {
        self.length_width
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> std::fmt::Debug for FrameWriter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameWriter")
            .field("length_width", &self.length_width)
            .finish_non_exhaustive()
    }
}
