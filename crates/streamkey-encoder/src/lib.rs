//! External encoder supervision.
//!
//! This crate launches an FFmpeg process that pushes a local input to an
//! ingest URL, forwards its diagnostic output line by line, and stops it
//! gracefully (or forcibly, after a timeout) on request.

mod error;
mod launcher;
mod options;

pub use error::EncoderError;
pub use launcher::{EncoderLauncher, StopHandle, StopOutcome};
pub use options::{EncodingOptions, Preset};

use std::time::Duration;

/// Interval at which the supervising loop checks output and liveness.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Time a terminated encoder gets to exit before it is killed.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Channel capacity for forwarded output lines.
pub const OUTPUT_CHANNEL_CAPACITY: usize = 256;

/// Default encoder executable.
pub const DEFAULT_PROGRAM: &str = "ffmpeg";

/// Result type for encoder operations.
pub type EncoderResult<T> = Result<T, EncoderError>;
