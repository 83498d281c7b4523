//! Error types for the encoder launcher.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while launching or supervising the encoder.
#[derive(Debug, Error)]
pub enum EncoderError {
    /// The input source does not exist. Nothing was spawned.
    #[error("Input source '{}' not found", .0.display())]
    InputNotFound(PathBuf),

    /// The encoder executable could not be found.
    #[error("'{0}' not found. Install FFmpeg or pass its path with --ffmpeg-path")]
    ExecutableNotFound(String),

    /// The encoder process failed to start.
    #[error("Failed to start encoder: {0}")]
    LaunchFailed(String),

    /// An encoder process is already running on this launcher.
    #[error("Encoder already running")]
    AlreadyRunning,

    /// The ingest URL could not be parsed.
    #[error("Invalid ingest URL: {0}")]
    InvalidUrl(String),

    /// An encoding option has an unsupported value.
    #[error("Invalid encoding option: {0}")]
    InvalidOption(String),

    /// Process I/O failed while supervising.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
