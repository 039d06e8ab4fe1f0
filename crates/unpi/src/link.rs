use std::io::Write;
use std::time::Instant;

use bytes::Bytes;
use tracing::debug;
use unpi_frame::{render_frame, Frame, FrameConfig, FrameReader, FrameWriter, LengthWidth, Result};
use unpi_transport::{SourceConfig, StreamSource, Transport};

/// Everything needed to bring up a [`Unpi`] link.
#[derive(Debug, Clone, Default)]
pub struct UnpiConfig {
    /// Length field width and read timeout.
    pub frame: FrameConfig,
    /// Background reader tuning.
    pub source: SourceConfig,
}

impl UnpiConfig {
    /// Defaults for the given length field width.
    pub fn with_width(length_width: LengthWidth) -> Self {
        Self {
            frame: FrameConfig::with_width(length_width),
            ..Self::default()
        }
    }
}

/// A UNPI codec bound to one transport.
///
/// Construction splits the transport: the read half moves onto a background
/// thread feeding [`Unpi::read_frame`], the write half stays here for
/// [`Unpi::write_frame`]. The two directions never contend. Callers with
/// several producers must serialize `write_frame` themselves.
///
/// Dropping a link stops its reader thread only once the blocked `read`
/// returns. On an idle device the thread keeps the cloned read handle open
/// until the next inbound byte arrives, and that byte is discarded.
pub struct Unpi<W> {
    reader: FrameReader<StreamSource>,
    writer: FrameWriter<W>,
}

impl<W: Write> Unpi<W> {
    /// Create a link with default settings for the given length field width.
    pub fn new<T>(length_width: LengthWidth, transport: T) -> Result<Self>
    where
        T: Transport<Writer = W>,
    {
        Self::with_config(transport, UnpiConfig::with_width(length_width))
    }

    /// Create a link with explicit configuration.
    pub fn with_config<T>(transport: T, config: UnpiConfig) -> Result<Self>
    where
        T: Transport<Writer = W>,
    {
        let (reader, writer) = transport.into_split()?;
        let source = StreamSource::spawn_with_config(reader, config.source)?;
        let length_width = config.frame.length_width;
        debug!(?length_width, read_timeout = ?config.frame.read_timeout, "unpi link started");

        Ok(Self {
            reader: FrameReader::with_config(source, config.frame),
            writer: FrameWriter::new(writer, length_width),
        })
    }

    /// Render and send one frame.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.writer.write_frame(frame)
    }

    /// Block until the next frame (or framing/transport error) arrives.
    pub fn read_frame(&mut self) -> Result<Frame> {
        self.reader.read_frame()
    }

    /// Block until the next frame arrives or `deadline` passes, whichever
    /// comes first. The configured `read_timeout` is not applied.
    pub fn read_frame_before(&mut self, deadline: Instant) -> Result<Frame> {
        self.reader.read_frame_before(deadline)
    }

    /// The exact bytes [`Unpi::write_frame`] would send for `frame`.
    pub fn render_frame(&self, frame: &Frame) -> Bytes {
        render_frame(frame, self.length_width())
    }

    /// Length field width this link was built with.
    pub fn length_width(&self) -> LengthWidth {
        self.writer.length_width()
    }

    /// Current frame configuration.
    pub fn config(&self) -> &FrameConfig {
        self.reader.config()
    }

    /// Borrow the write half of the transport.
    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    /// Mutably borrow the write half of the transport.
    pub fn get_mut(&mut self) -> &mut W {
        self.writer.get_mut()
    }
}

impl<W> std::fmt::Debug for Unpi<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unpi")
            .field("reader", &self.reader)
            .field("writer", &self.writer)
            .finish()
    }
}
