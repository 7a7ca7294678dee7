use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::Argon2;

use super::errors::CredentialError;

/// One-way credential hashing.
///
/// Hashes both account passwords and one-time codes (internally uses
/// Argon2id with default cost parameters). Codes are treated exactly like
/// passwords so plaintext values never reach storage.
pub struct CredentialHasher;

impl CredentialHasher {
    /// Create a new credential hasher instance.
    ///
    /// # Returns
    /// CredentialHasher instance configured with secure defaults
    pub fn new() -> Self {
        Self
    }

    /// Hash a plaintext secret securely.
    ///
    /// Uses Argon2id with random salt generation.
    ///
    /// # Arguments
    /// * `secret` - Plaintext password or one-time code to hash
    ///
    /// # Returns
    /// PHC string format hash (includes algorithm, parameters, salt, and hash)
    ///
    /// # Errors
    /// * `HashingFailed` - Hashing operation failed
    pub fn hash(&self, secret: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::HashingFailed(e.to_string()))
    }

    /// Verify a secret against a stored hash.
    ///
    /// A mismatch is not an error: it returns `Ok(false)`.
    ///
    /// # Arguments
    /// * `secret` - Plaintext secret to verify
    /// * `hash` - Stored hash in PHC string format
    ///
    /// # Returns
    /// True if the secret matches, false otherwise
    ///
    /// # Errors
    /// * `VerificationFailed` - Hash format is invalid
    pub fn verify(&self, secret: &str, hash: &str) -> Result<bool, CredentialError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            CredentialError::VerificationFailed(format!("Invalid credential hash: {}", e))
        })?;

        let argon2 = Argon2::default();

        Ok(argon2
            .verify_password(secret.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new()
    }
}
