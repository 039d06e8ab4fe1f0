use std::time::Duration;

use unpi_transport::TransportError;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The byte where a frame should begin was not the start marker.
    #[error("invalid start of frame (expected 0xFE, found {found:#04x})")]
    InvalidStartOfFrame { found: u8 },

    /// A complete frame arrived but its trailing checksum does not match.
    #[error("invalid checksum (received {received:#010b}, computed {computed:#010b})")]
    ChecksumMismatch { received: u8, computed: u8 },

    /// The length field width is neither 1 nor 2 bytes.
    #[error("unsupported length field width {0} (expected 1 or 2)")]
    InvalidLengthWidth(u8),

    /// The value does not fit in the 5-bit subsystem field.
    #[error("subsystem {0:#04x} out of range (max 0x1f)")]
    SubsystemOutOfRange(u8),

    /// The value does not fit in the 3-bit command type field.
    #[error("command type {0} out of range (max 7)")]
    CommandTypeOutOfRange(u8),

    /// No complete frame arrived within the configured read timeout.
    #[error("no complete frame within {0:?}")]
    Timeout(Duration),

    /// The transport failed to deliver or accept bytes.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl From<std::io::Error> for FrameError {
    fn from(err: std::io::Error) -> Self {
        FrameError::Transport(TransportError::Io(err))
    }
}

impl FrameError {
    /// True for a malformed frame on an otherwise healthy link: a bad start
    /// byte or a checksum mismatch. The next read may well succeed.
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            FrameError::InvalidStartOfFrame { .. } | FrameError::ChecksumMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_errors_are_recoverable() {
        assert!(FrameError::InvalidStartOfFrame { found: 0x00 }.is_framing());
        let mismatch = FrameError::ChecksumMismatch {
            received: 1,
            computed: 2,
        };
        assert!(mismatch.is_framing());
        assert!(!FrameError::Timeout(Duration::from_millis(5)).is_framing());
        let gone = FrameError::Transport(TransportError::Disconnected);
        assert!(!gone.is_framing());
    }
}
