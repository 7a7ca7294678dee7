use chrono::Duration;
use thiserror::Error;

/// Error for IdentityId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Error for DisplayName validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DisplayNameError {
    #[error("Display name too short: minimum {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Error for AuthProvider tag parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Unknown auth provider tag: {0}")]
    Unknown(String),
}

/// Error for Role tag parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoleError {
    #[error("Unknown role tag: {0}")]
    Unknown(String),
}

/// Error for outbound notification delivery
#[derive(Debug, Clone, Error)]
pub enum NotifierError {
    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("Failed to deliver message: {0}")]
    Transport(String),
}

/// Error for third-party OAuth assertion verification
#[derive(Debug, Clone, Error)]
pub enum OauthError {
    #[error("Assertion rejected: {0}")]
    Verification(String),

    #[error("Provider request failed: {0}")]
    Transport(String),
}

/// Top-level error for all identity and auth operations
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    // Value object validation errors (automatically converted via #[from])
    #[error("Invalid identity id: {0}")]
    InvalidIdentityId(#[from] IdentityIdError),

    #[error("Invalid display name: {0}")]
    InvalidDisplayName(#[from] DisplayNameError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid provider tag: {0}")]
    InvalidProvider(#[from] ProviderError),

    #[error("Invalid role tag: {0}")]
    InvalidRole(#[from] RoleError),

    // Domain-level errors
    #[error("Identity not found: {0}")]
    NotFound(String),

    #[error("Email already registered: {0}")]
    EmailAlreadyRegistered(String),

    /// Password flow attempted against an OAuth-only identity.
    #[error("Identity is OAuth-only")]
    LinkedToOauth,

    /// OAuth login attempted against a local-credential identity.
    #[error("Email is bound to a local identity")]
    LinkedToLocal,

    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Active lockout after repeated wrong codes. Checks fail fast with
    /// the remaining block duration, before any code comparison.
    #[error("Account temporarily blocked")]
    TemporarilyBlocked { remaining: Duration },

    #[error("Invalid one-time code")]
    InvalidCode,

    #[error("One-time code expired")]
    CodeExpired,

    /// Resend requested while the current challenge is still live.
    #[error("Active challenge has not expired yet")]
    ResendTooSoon { remaining: Duration },

    #[error("Invalid or expired verify token")]
    InvalidVerifyToken,

    #[error("Invalid or expired resend token")]
    InvalidResendToken,

    #[error("Session required")]
    SessionRequired,

    #[error("Session expired")]
    SessionExpired,

    #[error("OAuth assertion missing")]
    OauthAssertionMissing,

    #[error("OAuth verification failed: {0}")]
    Oauth(#[from] OauthError),

    // Infrastructure errors
    #[error("Credential error: {0}")]
    Credential(#[from] auth::CredentialError),

    #[error("Token signing error: {0}")]
    TokenSigning(String),

    #[error("Notifier error: {0}")]
    Notifier(#[from] NotifierError),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        AuthError::Unknown(err.to_string())
    }
}
