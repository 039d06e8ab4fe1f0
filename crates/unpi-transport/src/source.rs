use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{trace, warn};

use crate::error::{Result, TransportError};

/// Default number of bytes buffered between the reader thread and the decoder.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Default pause before re-reading after the transport reported zero bytes.
pub const DEFAULT_EOF_BACKOFF: Duration = Duration::from_millis(5);

/// Something that yields the inbound stream one byte at a time.
pub trait ByteSource {
    /// Block until the next byte (or a transport error) is available.
    fn next_byte(&mut self) -> Result<u8>;

    /// Like [`ByteSource::next_byte`], but give up with
    /// [`TransportError::TimedOut`] once `deadline` has passed.
    ///
    /// Sources that cannot time out ignore the deadline.
    fn next_byte_before(&mut self, deadline: Instant) -> Result<u8> {
        let _ = deadline;
        self.next_byte()
    }
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn next_byte(&mut self) -> Result<u8> {
        (**self).next_byte()
    }

    fn next_byte_before(&mut self, deadline: Instant) -> Result<u8> {
        (**self).next_byte_before(deadline)
    }
}

/// Configuration for the background byte reader.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Bytes (or errors) that may sit in the queue before the reader blocks.
    /// Zero makes every hand-off a rendezvous.
    pub queue_capacity: usize,
    /// Sleep between reads while the transport returns zero bytes.
    pub eof_backoff: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            eof_backoff: DEFAULT_EOF_BACKOFF,
        }
    }
}

/// Bridges a blocking `Read` transport into a [`ByteSource`].
///
/// A dedicated thread reads exactly one byte at a time and pushes it, or the
/// read error, through a bounded channel. Bytes are forwarded in transport
/// order and never dropped. A read of zero bytes is treated as "nothing yet"
/// and retried, so a serial device that reports spurious empty reads does not
/// end the stream.
///
/// Dropping the source asks the thread to stop. A thread blocked inside
/// `read` only notices once that call returns.
pub struct StreamSource {
    rx: Receiver<std::io::Result<u8>>,
    shutdown: Arc<AtomicBool>,
}

impl StreamSource {
    /// Start a reader thread with default configuration.
    pub fn spawn<R: Read + Send + 'static>(reader: R) -> Result<Self> {
        Self::spawn_with_config(reader, SourceConfig::default())
    }

    /// Start a reader thread with explicit configuration.
    pub fn spawn_with_config<R: Read + Send + 'static>(
        reader: R,
        config: SourceConfig,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::sync_channel(config.queue_capacity);
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&shutdown);

        thread::Builder::new()
            .name("unpi-rx".to_string())
            .spawn(move || pump(reader, tx, flag, config.eof_backoff))
            .map_err(TransportError::Spawn)?;

        Ok(Self { rx, shutdown })
    }

    fn unpack(item: std::io::Result<u8>) -> Result<u8> {
        item.map_err(TransportError::Io)
    }
}

impl ByteSource for StreamSource {
    fn next_byte(&mut self) -> Result<u8> {
        match self.rx.recv() {
            Ok(item) => Self::unpack(item),
            Err(_) => Err(TransportError::Disconnected),
        }
    }

    fn next_byte_before(&mut self, deadline: Instant) -> Result<u8> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match self.rx.recv_timeout(remaining) {
            Ok(item) => Self::unpack(item),
            Err(RecvTimeoutError::Timeout) => Err(TransportError::TimedOut),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected),
        }
    }
}

impl Drop for StreamSource {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
    }
}

impl std::fmt::Debug for StreamSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSource")
            .field("shutdown", &self.shutdown.load(Ordering::Relaxed))
            .finish()
    }
}

fn pump<R: Read>(
    mut reader: R,
    tx: SyncSender<std::io::Result<u8>>,
    shutdown: Arc<AtomicBool>,
    eof_backoff: Duration,
) {
    let mut buf = [0u8; 1];
    trace!("byte reader started");

    while !shutdown.load(Ordering::Acquire) {
        let item = match reader.read(&mut buf) {
            Ok(0) => {
                thread::sleep(eof_backoff);
                continue;
            }
            Ok(_) => Ok(buf[0]),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => {
                warn!(error = %err, "transport read failed");
                Err(err)
            }
        };

        // The consumer hung up; nobody is left to deliver to.
        if tx.send(item).is_err() {
            break;
        }
    }

    trace!("byte reader stopped");
}
