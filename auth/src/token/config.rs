use chrono::Duration;

/// The four token classes issued by the service.
///
/// Each kind signs with its own secret and carries its own time-to-live,
/// so compromise or expiry of one kind cannot be used to forge another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Gates OTP submission endpoints.
    Verify,
    /// Gates resend-OTP requests; outlives the verify token so a fresh
    /// code can still be requested after the first verify token expires.
    ResendGate,
    /// Authorizes ordinary API calls.
    Access,
    /// Used only to mint new access tokens.
    Refresh,
}

/// Signing parameters for a single token kind.
#[derive(Debug, Clone)]
pub struct TokenParams {
    pub secret: String,
    pub ttl: Duration,
}

/// Immutable per-kind token configuration.
///
/// Injected into [`super::TokenService`] at construction; secrets and TTLs
/// are never read from ambient globals.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub verify: TokenParams,
    pub resend_gate: TokenParams,
    pub access: TokenParams,
    pub refresh: TokenParams,
}

impl TokenConfig {
    /// Build a configuration from four kind-specific secrets with the
    /// standard TTLs: verify 7 minutes, resend-gate 22 minutes, access
    /// 15 minutes, refresh 15 days.
    ///
    /// # Arguments
    /// * `verify` / `resend_gate` / `access` / `refresh` - Signing secrets,
    ///   one per kind (at least 32 bytes each)
    pub fn with_secrets(
        verify: impl Into<String>,
        resend_gate: impl Into<String>,
        access: impl Into<String>,
        refresh: impl Into<String>,
    ) -> Self {
        Self {
            verify: TokenParams {
                secret: verify.into(),
                ttl: Duration::minutes(7),
            },
            resend_gate: TokenParams {
                secret: resend_gate.into(),
                ttl: Duration::minutes(22),
            },
            access: TokenParams {
                secret: access.into(),
                ttl: Duration::minutes(15),
            },
            refresh: TokenParams {
                secret: refresh.into(),
                ttl: Duration::days(15),
            },
        }
    }

    /// Parameters for the given token kind.
    pub fn params(&self, kind: TokenKind) -> &TokenParams {
        match kind {
            TokenKind::Verify => &self.verify,
            TokenKind::ResendGate => &self.resend_gate,
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}
