use thiserror::Error;

/// Error type for token operations.
#[derive(Debug, Clone, Error)]
pub enum TokenError {
    #[error("Failed to sign token: {0}")]
    SigningFailed(String),

    /// Signature mismatch, malformed token, wrong kind, or past expiry.
    /// Callers never learn which; the distinction is not actionable.
    #[error("Token is invalid or expired")]
    InvalidOrExpired,
}
