//! Error types for the session module.

use std::path::PathBuf;

use streamkey_types::{InvalidPlatform, RequestError};
use thiserror::Error;

/// Errors that can occur during session operations.
///
/// A platform-level refusal of a room request is not an error; it comes
/// back as [`crate::RoomOutcome::Rejected`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// Credential file missing or malformed.
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Domain lookup did not contain the sentinel host.
    #[error("Endpoint resolution failed: {0}")]
    EndpointResolution(String),

    /// Network-level failure, including timeouts and non-JSON bodies.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Request refused before sending.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Runtime creation failed.
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        SessionError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Parse(err.to_string())
    }
}

impl From<RequestError> for SessionError {
    fn from(err: RequestError) -> Self {
        SessionError::InvalidRequest(err.to_string())
    }
}

impl From<InvalidPlatform> for SessionError {
    fn from(err: InvalidPlatform) -> Self {
        SessionError::InvalidRequest(err.to_string())
    }
}

/// Reasons a credential file is refused.
///
/// The file is validated as a whole; nothing is loaded from a file that
/// fails any check.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// File does not exist.
    #[error("Cookies file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// File could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid JSON.
    #[error("{} is not a valid JSON file: {reason}", path.display())]
    InvalidJson { path: PathBuf, reason: String },

    /// Top-level value is not a list.
    #[error("{} is not a valid cookies file, expected a list of cookies", .0.display())]
    NotAList(PathBuf),

    /// A record is not an object.
    #[error("Invalid cookie format at index {index}")]
    InvalidRecord { index: usize },

    /// A record lacks `name` or `value`, or it is not a string.
    #[error("Cookie at index {index} is missing required field `{field}`")]
    MissingField { index: usize, field: &'static str },
}
