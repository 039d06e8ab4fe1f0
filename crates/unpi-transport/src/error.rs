use std::path::PathBuf;

/// Errors that can occur in UNPI transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the specified device or file.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to spawn the background byte reader.
    #[error("failed to spawn byte reader: {0}")]
    Spawn(std::io::Error),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The background byte reader is gone and no more bytes will arrive.
    #[error("byte source disconnected")]
    Disconnected,

    /// The deadline passed before a byte arrived.
    #[error("timed out waiting for data")]
    TimedOut,
}

pub type Result<T> = std::result::Result<T, TransportError>;
