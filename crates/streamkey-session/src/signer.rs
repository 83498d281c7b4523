//! Request signing hook.
//!
//! The client calls its [`Signer`] after a request's query and body are
//! final and before the request is sent. Whatever headers the signer returns
//! are added to that request only. The default [`NoopSigner`] adds nothing,
//! so requests go out unsigned.

use crate::error::SessionError;

/// Epoch constant fed to the secondary encryption header.
pub const SIGNING_EPOCH: u64 = 1_611_921_764;

/// Everything a signer may look at.
#[derive(Debug, Clone, Copy)]
pub struct SigningContext<'a> {
    /// Percent-encoded query string, exactly as sent.
    pub query: &'a str,

    /// Percent-encoded form body, exactly as sent (empty for multipart).
    pub body: &'a str,

    /// `Cookie` header value.
    pub cookies: &'a str,

    /// Numeric application id of the active profile.
    pub app_id: u32,

    /// Epoch constant for the encryption header.
    pub epoch: u64,
}

/// Computes signature headers for an outgoing request.
pub trait Signer: Send + Sync {
    /// Return header name/value pairs to attach to the request.
    fn sign(&self, ctx: &SigningContext<'_>) -> Result<Vec<(String, String)>, SessionError>;

    /// Signer name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Signer that adds no headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSigner;

impl Signer for NoopSigner {
    fn sign(&self, _ctx: &SigningContext<'_>) -> Result<Vec<(String, String)>, SessionError> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
