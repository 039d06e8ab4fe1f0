use std::io::Read;
use std::time::{Duration, Instant};

use bytes::{BufMut, BytesMut};
use tracing::{debug, warn};
use unpi_transport::{ByteSource, StreamSource, TransportError};

use crate::checksum::checksum;
use crate::codec::{FrameConfig, LengthWidth, SOF};
use crate::error::{FrameError, Result};
use crate::frame::Frame;

/// Reads complete frames from a [`ByteSource`], one byte at a time.
///
/// Each [`FrameReader::read_frame`] call starts fresh at the start marker.
/// After an error the bytes already taken are gone; the next call treats
/// whatever byte comes next as a candidate start marker. There is no
/// resynchronization beyond that.
pub struct FrameReader<S> {
    source: S,
    config: FrameConfig,
}

impl<S: ByteSource> FrameReader<S> {
    /// Create a new frame reader for the given length field width.
    pub fn new(source: S, length_width: LengthWidth) -> Self {
        Self::with_config(source, FrameConfig::with_width(length_width))
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(source: S, config: FrameConfig) -> Self {
        Self { source, config }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Fails with [`FrameError::InvalidStartOfFrame`] when the first byte is
    /// not `0xFE`, [`FrameError::ChecksumMismatch`] when the trailing checksum
    /// disagrees, [`FrameError::Timeout`] when `read_timeout` elapses, and
    /// [`FrameError::Transport`] for anything the source reports.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let deadline = self.config.read_timeout.map(|t| Instant::now() + t);
        let budget = self.config.read_timeout.unwrap_or_default();
        expire(self.read_frame_until(deadline), budget)
    }

    /// Read the next frame, giving up at `deadline` instead of after the
    /// configured `read_timeout`.
    ///
    /// Lets a caller spread one time budget over several frames.
    pub fn read_frame_before(&mut self, deadline: Instant) -> Result<Frame> {
        let budget = deadline.saturating_duration_since(Instant::now());
        expire(self.read_frame_until(Some(deadline)), budget)
    }

    fn read_frame_until(&mut self, deadline: Option<Instant>) -> Result<Frame> {
        let start = self.next_byte(deadline)?;
        if start != SOF {
            debug!(found = start, "invalid start of frame");
            return Err(FrameError::InvalidStartOfFrame { found: start });
        }

        let width = self.config.length_width;
        let mut field = [0u8; 2];
        for slot in field.iter_mut().take(width.size()) {
            *slot = self.next_byte(deadline)?;
        }
        let field = &field[..width.size()];
        let payload_len = width.read_length(field);

        let header = [self.next_byte(deadline)?, self.next_byte(deadline)?];

        let mut payload = BytesMut::with_capacity(payload_len);
        for _ in 0..payload_len {
            payload.put_u8(self.next_byte(deadline)?);
        }

        let received = self.next_byte(deadline)?;
        let computed = checksum(field) ^ checksum(&header) ^ checksum(&payload);
        if received != computed {
            warn!(received, computed, payload_len, "frame checksum mismatch");
            return Err(FrameError::ChecksumMismatch { received, computed });
        }

        let frame = Frame::from_header(header, payload.freeze());
        debug!(
            command_type = %frame.command_type,
            subsystem = %frame.subsystem,
            command = frame.command,
            payload_len,
            "frame received"
        );
        Ok(frame)
    }

    fn next_byte(&mut self, deadline: Option<Instant>) -> Result<u8> {
        let byte = match deadline {
            Some(deadline) => self.source.next_byte_before(deadline)?,
            None => self.source.next_byte()?,
        };
        Ok(byte)
    }

    /// Borrow the underlying byte source.
    pub fn get_ref(&self) -> &S {
        &self.source
    }

    /// Mutably borrow the underlying byte source.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Consume the reader and return the byte source.
    pub fn into_inner(self) -> S {
        self.source
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

fn expire(result: Result<Frame>, budget: Duration) -> Result<Frame> {
    match result {
        Err(FrameError::Transport(TransportError::TimedOut)) => Err(FrameError::Timeout(budget)),
        other => other,
    }
}

impl FrameReader<StreamSource> {
    /// Start a background byte reader on `reader` and decode frames from it.
    pub fn spawn<R: Read + Send + 'static>(reader: R, config: FrameConfig) -> Result<Self> {
        let source = StreamSource::spawn(reader)?;
        Ok(Self::with_config(source, config))
    }
}

impl<S> std::fmt::Debug for FrameReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::{Cursor, ErrorKind, Write};

    use proptest::prelude::*;

    use super::*;
    use crate::codec::render_frame;
    use crate::frame::{CommandType, Subsystem};

    struct ScriptedSource {
        items: VecDeque<std::result::Result<u8, ErrorKind>>,
    }

    impl ScriptedSource {
        fn bytes(bytes: &[u8]) -> Self {
            Self {
                items: bytes.iter().copied().map(Ok).collect(),
            }
        }

        fn remaining(&self) -> usize {
            self.items.len()
        }
    }

    impl ByteSource for ScriptedSource {
        fn next_byte(&mut self) -> unpi_transport::Result<u8> {
            match self.items.pop_front() {
                Some(Ok(byte)) => Ok(byte),
                Some(Err(kind)) => Err(TransportError::Io(std::io::Error::from(kind))),
                None => Err(TransportError::Disconnected),
            }
        }
    }

    fn sreq_three() -> Frame {
        Frame::new(CommandType::Sreq, Subsystem::Sapi, 0, vec![0, 1, 2])
    }

    #[test]
    fn read_known_vectors_width_one() {
        let mut reader = FrameReader::new(
            ScriptedSource::bytes(&[0xFE, 0x00, 0x66, 0x00, 0x66]),
            LengthWidth::One,
        );
        let frame = reader.read_frame().unwrap();
        assert_eq!(
            frame,
            Frame::without_payload(CommandType::Srsp, Subsystem::Sapi, 0)
        );

        let mut reader = FrameReader::new(
            ScriptedSource::bytes(&[0xFE, 0x03, 0x26, 0x00, 0x00, 0x01, 0x02, 0x26]),
            LengthWidth::One,
        );
        assert_eq!(reader.read_frame().unwrap(), sreq_three());
        assert_eq!(reader.get_ref().remaining(), 0);
    }

    #[test]
    fn read_known_vectors_width_two() {
        let mut reader = FrameReader::new(
            ScriptedSource::bytes(&[
                0xFE, 0x00, 0x00, 0x66, 0x00, 0x66, 0xFE, 0x00, 0x03, 0x26, 0x00, 0x00, 0x01,
                0x02, 0x26,
            ]),
            LengthWidth::Two,
        );
        let first = reader.read_frame().unwrap();
        assert_eq!(first.command_type, CommandType::Srsp);
        assert!(first.payload.is_empty());
        assert_eq!(reader.read_frame().unwrap(), sreq_three());
    }

    #[test]
    fn invalid_start_consumes_exactly_one_byte() {
        for junk in (0..=u8::MAX).filter(|b| *b != SOF) {
            let mut bytes = vec![junk];
            bytes.extend_from_slice(&render_frame(&sreq_three(), LengthWidth::One));
            let mut reader = FrameReader::new(ScriptedSource::bytes(&bytes), LengthWidth::One);

            let err = reader.read_frame().unwrap_err();
            assert!(
                matches!(err, FrameError::InvalidStartOfFrame { found } if found == junk),
                "byte {junk:#04x}: {err}"
            );
            assert_eq!(reader.get_ref().remaining(), bytes.len() - 1);

            // No automatic recovery: the caller retries and the next byte is a SOF.
            assert_eq!(reader.read_frame().unwrap(), sreq_three());
        }
    }

    #[test]
    fn no_resync_inside_garbage() {
        let mut reader = FrameReader::new(
            ScriptedSource::bytes(&[0x01, 0x02, 0xFE, 0x00, 0x66, 0x00, 0x66]),
            LengthWidth::One,
        );

        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::InvalidStartOfFrame { found: 0x01 })
        ));
        assert!(matches!(
            reader.read_frame(),
            Err(FrameError::InvalidStartOfFrame { found: 0x02 })
        ));
        assert!(reader.read_frame().is_ok());
    }

    #[test]
    fn checksum_mismatch_reports_both_values() {
        let mut reader = FrameReader::new(
            ScriptedSource::bytes(&[0xFE, 0x03, 0x26, 0x00, 0x00, 0x01, 0x02, 0x27]),
            LengthWidth::One,
        );
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::ChecksumMismatch {
                received: 0x27,
                computed: 0x26,
            }
        ));
        assert_eq!(reader.get_ref().remaining(), 0);
    }

    #[test]
    fn single_bit_flips_are_detected() {
        for width in [LengthWidth::One, LengthWidth::Two] {
            let wire = render_frame(&sreq_three(), width);
            for idx in (1 + width.size())..wire.len() {
                for bit in 0..8 {
                    let mut corrupted = wire.to_vec();
                    corrupted[idx] ^= 1 << bit;
                    let mut reader = FrameReader::new(ScriptedSource::bytes(&corrupted), width);
                    assert!(matches!(
                        reader.read_frame(),
                        Err(FrameError::ChecksumMismatch { .. })
                    ));
                }
            }
        }
    }

    #[test]
    fn source_error_short_circuits() {
        let mut source = ScriptedSource::bytes(&[0xFE, 0x03, 0x26]);
        source.items.push_back(Err(ErrorKind::BrokenPipe));
        let mut reader = FrameReader::new(source, LengthWidth::One);

        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::Transport(TransportError::Io(e)) if e.kind() == ErrorKind::BrokenPipe
        ));
    }

    #[test]
    fn exhausted_source_is_a_transport_error() {
        let mut reader = FrameReader::new(ScriptedSource::bytes(&[0xFE, 0x03]), LengthWidth::One);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            FrameError::Transport(TransportError::Disconnected)
        ));
    }

    #[test]
    fn read_from_stream_source() {
        let mut wire = render_frame(&sreq_three(), LengthWidth::Two).to_vec();
        wire.extend_from_slice(&render_frame(
            &Frame::new(CommandType::Areq, Subsystem::Zdo, 0xC1, vec![0xAB; 300]),
            LengthWidth::Two,
        ));

        let mut reader =
            FrameReader::spawn(Cursor::new(wire), FrameConfig::with_width(LengthWidth::Two))
                .unwrap();
        assert_eq!(reader.read_frame().unwrap(), sreq_three());
        let second = reader.read_frame().unwrap();
        assert_eq!(second.subsystem, Subsystem::Zdo);
        assert_eq!(second.payload.len(), 300);
    }

    #[test]
    fn read_timeout_when_idle() {
        let config = FrameConfig {
            length_width: LengthWidth::One,
            read_timeout: Some(Duration::from_millis(30)),
        };
        let mut reader = FrameReader::spawn(Cursor::new(Vec::<u8>::new()), config).unwrap();
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Timeout(t) if t == Duration::from_millis(30)));
    }

    #[test]
    fn read_timeout_mid_frame() {
        let config = FrameConfig {
            length_width: LengthWidth::One,
            read_timeout: Some(Duration::from_millis(30)),
        };
        let mut reader = FrameReader::spawn(Cursor::new(vec![0xFE, 0x03, 0x26]), config).unwrap();
        assert!(matches!(reader.read_frame(), Err(FrameError::Timeout(_))));
    }

    #[test]
    fn read_before_deadline_reports_remaining_budget() {
        let mut reader =
            FrameReader::spawn(Cursor::new(Vec::<u8>::new()), FrameConfig::default()).unwrap();
        let err = reader
            .read_frame_before(Instant::now() + Duration::from_millis(30))
            .unwrap_err();
        assert!(matches!(err, FrameError::Timeout(t) if t <= Duration::from_millis(30)));

        let err = reader.read_frame_before(Instant::now()).unwrap_err();
        assert!(matches!(err, FrameError::Timeout(_)));
    }

    #[test]
    fn read_before_deadline_ignores_configured_timeout() {
        let config = FrameConfig {
            length_width: LengthWidth::One,
            read_timeout: Some(Duration::from_millis(1)),
        };
        let mut reader =
            FrameReader::spawn(Cursor::new(vec![0xFE, 0x00, 0x66, 0x00, 0x66]), config).unwrap();
        let frame = reader
            .read_frame_before(Instant::now() + Duration::from_secs(5))
            .unwrap();
        assert_eq!(frame.command_type, CommandType::Srsp);
    }

    #[test]
    #[cfg(unix)]
    fn bytes_trickling_over_socket() {
        let (mut left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut reader = FrameReader::spawn(right, FrameConfig::default()).unwrap();

        let wire = render_frame(&sreq_three(), LengthWidth::One);
        let writer = std::thread::spawn(move || {
            for byte in wire.iter() {
                left.write_all(&[*byte]).unwrap();
                std::thread::sleep(Duration::from_millis(1));
            }
            left
        });

        assert_eq!(reader.read_frame().unwrap(), sreq_three());
        let _left = writer.join().unwrap();
    }

    fn any_frame() -> impl Strategy<Value = Frame> {
        (
            0..8u8,
            0..32u8,
            any::<u8>(),
            proptest::collection::vec(any::<u8>(), 0..=300),
        )
            .prop_map(|(ty, subsystem, command, payload)| {
                Frame::new(
                    CommandType::from_bits(ty),
                    Subsystem::from_bits(subsystem),
                    command,
                    payload,
                )
            })
    }

    proptest! {
        #[test]
        fn streamed_frames_roundtrip(frames in proptest::collection::vec(any_frame(), 1..8)) {
            // A 300-byte payload does not fit a one-byte length field.
            let width_one: Vec<Frame> = frames
                .iter()
                .filter(|f| f.payload.len() <= LengthWidth::One.max_payload())
                .cloned()
                .collect();

            for (width, frames) in [(LengthWidth::One, width_one), (LengthWidth::Two, frames)] {
                let mut wire = Vec::new();
                for frame in &frames {
                    wire.extend_from_slice(&render_frame(frame, width));
                }

                let mut reader = FrameReader::new(ScriptedSource::bytes(&wire), width);
                for frame in &frames {
                    prop_assert_eq!(&reader.read_frame().unwrap(), frame);
                }
                prop_assert_eq!(reader.get_ref().remaining(), 0);
            }
        }
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut reader = FrameReader::new(ScriptedSource::bytes(&[]), LengthWidth::Two);
        assert_eq!(reader.config().length_width, LengthWidth::Two);
        let _ = reader.get_mut();
        let _inner = reader.into_inner();
    }
}
