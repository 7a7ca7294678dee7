use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Claims carried by every issued token.
///
/// Tokens carry only an identity reference (and, for the verify and
/// resend-gate kinds, the owning email) plus the issue/expiry timestamps.
/// No other claims are trusted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Identity reference (user id)
    pub sub: String,

    /// Owning email, present on verify and resend-gate tokens only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl TokenClaims {
    /// Build claims for a subject expiring `ttl` after `now`.
    pub fn new(
        subject: impl Into<String>,
        email: Option<String>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            sub: subject.into(),
            email,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_from_ttl() {
        let now = Utc::now();
        let claims = TokenClaims::new("user123", None, now, Duration::minutes(15));

        assert_eq!(claims.sub, "user123");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
        assert!(claims.email.is_none());
    }

    #[test]
    fn test_email_claim() {
        let claims = TokenClaims::new(
            "user123",
            Some("a@x.com".to_string()),
            Utc::now(),
            Duration::minutes(7),
        );

        assert_eq!(claims.email.as_deref(), Some("a@x.com"));
    }
}
