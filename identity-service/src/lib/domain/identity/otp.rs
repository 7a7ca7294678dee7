use auth::CredentialHasher;
use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use rand::Rng;

use crate::identity::errors::AuthError;
use crate::identity::models::OtpChallenge;

/// How long an issued code stays valid.
pub const CODE_MINUTES: i64 = 5;

/// A freshly generated challenge together with the plaintext code.
///
/// The plaintext exists only to hand to the notifier for out-of-band
/// delivery; it is never returned to the HTTP caller and never stored.
#[derive(Debug, Clone)]
pub struct IssuedChallenge {
    pub challenge: OtpChallenge,
    pub code: String,
}

/// Generate and hash a new six-digit challenge.
///
/// The code is drawn uniformly from 000000 through 999999 (leading zeros
/// allowed). Issuing a new challenge always zeroes the wrong-attempt
/// counter and clears any lockout, regardless of prior state.
///
/// # Errors
/// * `Credential` - Hashing the code failed
pub fn issue_challenge(
    hasher: &CredentialHasher,
    now: DateTime<Utc>,
) -> Result<IssuedChallenge, AuthError> {
    let code = generate_code();
    let code_hash = hasher.hash(&code)?;

    Ok(IssuedChallenge {
        challenge: OtpChallenge {
            code_hash: Some(code_hash),
            expires_at: Some(now + Duration::minutes(CODE_MINUTES)),
            wrong_attempts: 0,
            block_expires_at: None,
        },
        code,
    })
}

fn generate_code() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", value)
}
