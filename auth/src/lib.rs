//! Authentication utilities library
//!
//! Provides reusable authentication infrastructure for the identity service:
//! - Credential hashing (Argon2id) for passwords and one-time codes
//! - Signed, time-limited token issuance and verification (JWT)
//!
//! Each service defines its own domain traits and adapts these implementations.
//! This avoids coupling services through shared domain logic while reducing
//! code duplication.
//!
//! # Examples
//!
//! ## Credential Hashing
//! ```
//! use auth::CredentialHasher;
//!
//! let hasher = CredentialHasher::new();
//! let digest = hasher.hash("482913").unwrap();
//! let is_valid = hasher.verify("482913", &digest).unwrap();
//! assert!(is_valid);
//! ```
//!
//! ## Signed Tokens
//! ```
//! use auth::{TokenConfig, TokenKind, TokenService};
//!
//! let config = TokenConfig::with_secrets(
//!     "verify_secret_at_least_32_bytes_long!!",
//!     "resend_secret_at_least_32_bytes_long!!",
//!     "access_secret_at_least_32_bytes_long!!",
//!     "refresh_secret_at_least_32_bytes_long!",
//! );
//! let tokens = TokenService::new(&config);
//!
//! let issued = tokens
//!     .issue(TokenKind::Access, "user123", None)
//!     .unwrap();
//! let claims = tokens.verify(TokenKind::Access, &issued.token).unwrap();
//! assert_eq!(claims.sub, "user123");
//!
//! // Each kind signs with its own secret; kinds are not interchangeable.
//! assert!(tokens.verify(TokenKind::Refresh, &issued.token).is_err());
//! ```

pub mod credential;
pub mod token;

// Re-export commonly used items
pub use credential::CredentialError;
pub use credential::CredentialHasher;
pub use token::IssuedToken;
pub use token::TokenClaims;
pub use token::TokenConfig;
pub use token::TokenError;
pub use token::TokenKind;
pub use token::TokenService;
