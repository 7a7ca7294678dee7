use chrono::Duration;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;

use super::claims::TokenClaims;
use super::config::TokenConfig;
use super::config::TokenKind;
use super::errors::TokenError;

/// A freshly signed token together with its lifetime.
///
/// The lifetime is surfaced so transports can align cookie `Max-Age`
/// with the signed expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub max_age: Duration,
}

impl IssuedToken {
    /// Token lifetime in whole seconds, for cookie `Max-Age` attributes.
    pub fn max_age_secs(&self) -> i64 {
        self.max_age.num_seconds()
    }
}

struct KindKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl KindKeys {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

/// Issues and verifies the four classes of time-limited signed tokens.
///
/// Uses HS256 (HMAC with SHA-256) with a dedicated secret per kind.
/// Verification is stateless: validity is determined entirely by signature
/// and expiry at verification time. There is no server-side revocation
/// list; revocation is advisory cookie clearing by the transport, which
/// the short TTLs make acceptable.
pub struct TokenService {
    verify: KindKeys,
    resend_gate: KindKeys,
    access: KindKeys,
    refresh: KindKeys,
    algorithm: Algorithm,
}

impl TokenService {
    /// Create a token service from an immutable configuration.
    ///
    /// # Arguments
    /// * `config` - Per-kind secrets and TTLs
    ///
    /// # Security Notes
    /// - Secrets should be at least 256 bits (32 bytes) for HS256
    /// - Store secrets in environment variables or secure vaults, never in code
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            verify: KindKeys::new(&config.verify.secret, config.verify.ttl),
            resend_gate: KindKeys::new(&config.resend_gate.secret, config.resend_gate.ttl),
            access: KindKeys::new(&config.access.secret, config.access.ttl),
            refresh: KindKeys::new(&config.refresh.secret, config.refresh.ttl),
            algorithm: Algorithm::HS256,
        }
    }

    /// Sign a token of the given kind for an identity reference.
    ///
    /// # Arguments
    /// * `kind` - Token class to issue
    /// * `subject` - Identity reference carried in `sub`
    /// * `email` - Owning email, set for verify and resend-gate tokens
    ///
    /// # Returns
    /// The signed token and its lifetime
    ///
    /// # Errors
    /// * `SigningFailed` - Token encoding failed
    pub fn issue(
        &self,
        kind: TokenKind,
        subject: &str,
        email: Option<&str>,
    ) -> Result<IssuedToken, TokenError> {
        let keys = self.keys(kind);
        let claims = TokenClaims::new(
            subject,
            email.map(|e| e.to_string()),
            Utc::now(),
            keys.ttl,
        );

        let header = Header::new(self.algorithm);
        let token = encode(&header, &claims, &keys.encoding)
            .map_err(|e| TokenError::SigningFailed(e.to_string()))?;

        Ok(IssuedToken {
            token,
            max_age: keys.ttl,
        })
    }

    /// Verify a token against the given kind's secret and return its claims.
    ///
    /// # Arguments
    /// * `kind` - Expected token class
    /// * `token` - Token string to verify
    ///
    /// # Errors
    /// * `InvalidOrExpired` - Signature mismatch, malformed token, token of
    ///   a different kind, or past expiry
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;

        decode::<TokenClaims>(token, &self.keys(kind).decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::InvalidOrExpired)
    }

    fn keys(&self, kind: TokenKind) -> &KindKeys {
        match kind {
            TokenKind::Verify => &self.verify,
            TokenKind::ResendGate => &self.resend_gate,
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}
