use thiserror::Error;

/// Error type for credential hashing operations.
#[derive(Debug, Clone, Error)]
pub enum CredentialError {
    #[error("Credential hashing failed: {0}")]
    HashingFailed(String),

    #[error("Credential verification failed: {0}")]
    VerificationFailed(String),
}
