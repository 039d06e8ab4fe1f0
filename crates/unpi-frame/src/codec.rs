use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::checksum::checksum;
use crate::error::{FrameError, Result};
use crate::frame::Frame;

/// Start-of-frame marker.
pub const SOF: u8 = 0xFE;

/// Width of the payload length field.
///
/// Fixed per peer: most ZNP firmware uses one byte, newer co-processors two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LengthWidth {
    #[default]
    One,
    /// Two bytes, big-endian.
    Two,
}

impl LengthWidth {
    /// Number of bytes the length field occupies.
    pub fn size(self) -> usize {
        match self {
            LengthWidth::One => 1,
            LengthWidth::Two => 2,
        }
    }

    /// Largest payload length the field can represent.
    pub fn max_payload(self) -> usize {
        match self {
            LengthWidth::One => u8::MAX as usize,
            LengthWidth::Two => u16::MAX as usize,
        }
    }

    /// Interpret a length field of exactly [`LengthWidth::size`] bytes.
    pub fn read_length(self, field: &[u8]) -> usize {
        match self {
            LengthWidth::One => usize::from(field[0]),
            LengthWidth::Two => usize::from(u16::from_be_bytes([field[0], field[1]])),
        }
    }
}

impl TryFrom<u8> for LengthWidth {
    type Error = FrameError;

    fn try_from(width: u8) -> Result<Self> {
        match width {
            1 => Ok(LengthWidth::One),
            2 => Ok(LengthWidth::Two),
            other => Err(FrameError::InvalidLengthWidth(other)),
        }
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬────────────┬────────┬────────┬──────────────┬──────┐
/// │ SOF  │ Length     │ Cmd0   │ Cmd1   │ Payload      │ FCS  │
/// │ 0xFE │ (1B or 2B  │ type:3 │ cmd id │ (Length      │ (1B) │
/// │      │  BE)       │ subs:5 │        │  bytes)      │      │
/// └──────┴────────────┴────────┴────────┴──────────────┴──────┘
/// ```
///
/// FCS is the XOR of every byte between SOF and FCS. A payload longer than
/// the length field can represent is written in full while the length field
/// silently wraps; keeping payloads within [`LengthWidth::max_payload`] is the
/// caller's job.
pub fn encode_frame(frame: &Frame, width: LengthWidth, dst: &mut BytesMut) {
    let start = dst.len();
    dst.reserve(frame.wire_size(width));

    dst.put_u8(SOF);
    let len = frame.payload.len();
    match width {
        LengthWidth::One => dst.put_u8(len as u8),
        LengthWidth::Two => dst.put_u16(len as u16),
    }
    dst.put_slice(&frame.header());
    dst.put_slice(&frame.payload);

    let fcs = checksum(&dst[start + 1..]);
    dst.put_u8(fcs);
}

/// Render a frame into a standalone wire buffer.
pub fn render_frame(frame: &Frame, width: LengthWidth) -> Bytes {
    let mut buf = BytesMut::with_capacity(frame.wire_size(width));
    encode_frame(frame, width, &mut buf);
    buf.freeze()
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer. A wrong start byte
/// consumes exactly that byte; a checksum mismatch consumes the whole frame.
/// Nothing is skipped looking for the next start marker.
pub fn decode_frame(src: &mut BytesMut, width: LengthWidth) -> Result<Option<Frame>> {
    let Some(&first) = src.first() else {
        return Ok(None);
    };
    if first != SOF {
        src.advance(1);
        return Err(FrameError::InvalidStartOfFrame { found: first });
    }

    let field_end = 1 + width.size();
    if src.len() < field_end {
        return Ok(None); // Need more data
    }
    let payload_len = width.read_length(&src[1..field_end]);

    let total = field_end + 2 + payload_len + 1;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None); // Need more data
    }

    let received = src[total - 1];
    let computed = checksum(&src[1..total - 1]);
    if received != computed {
        src.advance(total);
        return Err(FrameError::ChecksumMismatch { received, computed });
    }

    src.advance(field_end);
    let header = [src[0], src[1]];
    src.advance(2);
    let payload = src.split_to(payload_len).freeze();
    src.advance(1);

    Ok(Some(Frame::from_header(header, payload)))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone, Default)]
pub struct FrameConfig {
    /// Length field width agreed with the peer. Default: one byte.
    pub length_width: LengthWidth,
    /// Upper bound on a whole `read_frame` call. Default: wait forever.
    pub read_timeout: Option<Duration>,
}

impl FrameConfig {
    /// Configuration for the given width with no read timeout.
    pub fn with_width(length_width: LengthWidth) -> Self {
        Self {
            length_width,
            ..Self::default()
        }
    }
}
