use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, TransportError};

/// A byte-stream link to the co-processor.
///
/// The inbound direction is owned by a background reader while the outbound
/// direction stays with the caller, so every transport must be able to hand
/// out its two halves separately.
pub trait Transport {
    /// The read half, moved onto the background reader thread.
    type Reader: Read + Send + 'static;
    /// The write half, used synchronously on the caller's thread.
    type Writer: Write;

    /// Split the transport into independently owned read and write halves.
    fn into_split(self) -> Result<(Self::Reader, Self::Writer)>;
}

impl Transport for File {
    type Reader = File;
    type Writer = File;

    fn into_split(self) -> Result<(Self::Reader, Self::Writer)> {
        let reader = self.try_clone()?;
        Ok((reader, self))
    }
}

impl Transport for TcpStream {
    type Reader = TcpStream;
    type Writer = TcpStream;

    fn into_split(self) -> Result<(Self::Reader, Self::Writer)> {
        let reader = self.try_clone()?;
        Ok((reader, self))
    }
}

#[cfg(unix)]
impl Transport for std::os::unix::net::UnixStream {
    type Reader = std::os::unix::net::UnixStream;
    type Writer = std::os::unix::net::UnixStream;

    fn into_split(self) -> Result<(Self::Reader, Self::Writer)> {
        let reader = self.try_clone()?;
        Ok((reader, self))
    }
}

/// A transport assembled from an already separate reader and writer.
///
/// Useful for USB CDC adapters that expose distinct handles, and for tests
/// that feed canned bytes in while capturing what gets written.
#[derive(Debug)]
pub struct Duplex<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> Duplex<R, W> {
    /// Pair a reader and a writer into one transport.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

impl<R, W> Transport for Duplex<R, W>
where
    R: Read + Send + 'static,
    W: Write,
{
    type Reader = R;
    type Writer = W;

    fn into_split(self) -> Result<(Self::Reader, Self::Writer)> {
        Ok((self.reader, self.writer))
    }
}

/// Open an existing device node (or plain file) for reading and writing.
///
/// Line settings such as baud rate are not touched; configure the port
/// beforehand (e.g. with `stty`).
pub fn open_device(path: impl AsRef<Path>) -> Result<File> {
    let path = path.as_ref();
    debug!(?path, "opening device");
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|source| TransportError::Open {
            path: path.to_path_buf(),
            source,
        })
}
