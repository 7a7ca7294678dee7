use std::fmt;
use std::str::FromStr;

use auth::IssuedToken;
use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::identity::errors::DisplayNameError;
use crate::identity::errors::EmailError;
use crate::identity::errors::IdentityIdError;
use crate::identity::errors::ProviderError;
use crate::identity::errors::RoleError;

/// Identity aggregate entity.
///
/// Represents a registered account, whether it came in through local
/// credentials or a third-party OAuth assertion. The embedded
/// [`OtpChallenge`] holds the single active one-time-code record.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: IdentityId,
    pub name: DisplayName,
    pub email: EmailAddress,
    /// Always present for local identities once registered; always `None`
    /// for OAuth identities.
    pub password_hash: Option<String>,
    pub provider: AuthProvider,
    pub role: Role,
    pub verified: bool,
    pub challenge: OtpChallenge,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    /// Create a new unverified local identity with an initial challenge.
    pub fn new_local(
        name: DisplayName,
        email: EmailAddress,
        password_hash: String,
        challenge: OtpChallenge,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: IdentityId::new(),
            name,
            email,
            password_hash: Some(password_hash),
            provider: AuthProvider::Local,
            role: Role::User,
            verified: false,
            challenge,
            created_at: now,
        }
    }

    /// Create a new OAuth identity. OAuth identities carry no password
    /// hash and are verified from the moment they exist.
    pub fn new_oauth(name: DisplayName, email: EmailAddress, now: DateTime<Utc>) -> Self {
        Self {
            id: IdentityId::new(),
            name,
            email,
            password_hash: None,
            provider: AuthProvider::Oauth,
            role: Role::User,
            verified: true,
            challenge: OtpChallenge::empty(),
            created_at: now,
        }
    }
}

/// Identity unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentityId(pub Uuid);

impl IdentityId {
    /// Generate a new random identity ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identity ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, IdentityIdError> {
        Uuid::parse_str(s)
            .map(IdentityId)
            .map_err(|e| IdentityIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for IdentityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Display name value type
///
/// Ensures the name is at least 2 characters long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName(String);

impl DisplayName {
    const MIN_LENGTH: usize = 2;

    /// Create a new valid display name.
    ///
    /// # Errors
    /// * `TooShort` - Name shorter than 2 characters
    pub fn new(name: String) -> Result<Self, DisplayNameError> {
        let length = name.chars().count();
        if length < Self::MIN_LENGTH {
            Err(DisplayNameError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            })
        } else {
            Ok(Self(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validates email format using RFC 5322 compliant parser. Stored and
/// compared exactly as given; no case folding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Authentication provider tag for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthProvider {
    Local,
    Oauth,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Local => "local",
            AuthProvider::Oauth => "oauth",
        }
    }

    /// Parse a stored provider tag.
    ///
    /// # Errors
    /// * `Unknown` - Tag is not `local` or `oauth`
    pub fn parse(s: &str) -> Result<Self, ProviderError> {
        match s {
            "local" => Ok(AuthProvider::Local),
            "oauth" => Ok(AuthProvider::Oauth),
            other => Err(ProviderError::Unknown(other.to_string())),
        }
    }
}

/// Account role. Immutable by the account itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parse a stored role tag.
    ///
    /// # Errors
    /// * `Unknown` - Tag is not `user` or `admin`
    pub fn parse(s: &str) -> Result<Self, RoleError> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(RoleError::Unknown(other.to_string())),
        }
    }
}

/// Embedded one-time-code record on an identity.
///
/// Recreated wholesale each time a new code is generated; logically
/// destroyed (all fields nulled, counter zeroed) on successful
/// verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpChallenge {
    /// Argon2 digest of the active code, never the plaintext
    pub code_hash: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Wrong submissions against the active code, 0 through 3
    pub wrong_attempts: u8,
    /// Set only when the wrong-attempt counter reaches its maximum
    pub block_expires_at: Option<DateTime<Utc>>,
}

impl OtpChallenge {
    /// A challenge record with no active code and no lockout.
    pub fn empty() -> Self {
        Self {
            code_hash: None,
            expires_at: None,
            wrong_attempts: 0,
            block_expires_at: None,
        }
    }

    /// Whether a code is still live: one exists and its expiry is ahead
    /// of `now`.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match (&self.code_hash, self.expires_at) {
            (Some(_), Some(expires_at)) => now < expires_at,
            _ => false,
        }
    }
}

/// The flow a one-time code is being consumed for. Carried by the
/// caller's context, not by the challenge itself; the same challenge
/// shape serves all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpPurpose {
    Signup,
    Login,
    PasswordReset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::Signup => "signup",
            OtpPurpose::Login => "login",
            OtpPurpose::PasswordReset => "password-reset",
        }
    }
}

/// Command to register a new local identity with domain types
#[derive(Debug)]
pub struct RegisterCommand {
    pub name: DisplayName,
    pub email: EmailAddress,
    pub password: String,
}

/// Command to start a password login
#[derive(Debug)]
pub struct LoginCommand {
    pub email: EmailAddress,
    pub password: String,
}

/// Profile data asserted by a third-party OAuth provider.
#[derive(Debug, Clone)]
pub struct OauthUserInfo {
    pub name: DisplayName,
    pub email: EmailAddress,
}

/// The identity shape exposed past the session boundary.
///
/// Sensitive fields (password hash, challenge, lockout, provider) are
/// stripped; upstream consumers see only this.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    pub id: IdentityId,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&Identity> for AuthenticatedIdentity {
    fn from(identity: &Identity) -> Self {
        Self {
            id: identity.id,
            name: identity.name.as_str().to_string(),
            email: identity.email.as_str().to_string(),
            role: identity.role,
        }
    }
}

/// Verify and resend-gate tokens issued when a challenge is dispatched.
#[derive(Debug, Clone)]
pub struct ChallengeTokens {
    pub verify: IssuedToken,
    pub resend_gate: IssuedToken,
}

/// Access and refresh tokens issued on full authentication.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Outcome of a successful OTP verification.
///
/// `session` is populated only for the login purpose; signup and
/// password-reset verifications leave the caller unauthenticated.
#[derive(Debug, Clone)]
pub struct VerifiedAccount {
    pub purpose: OtpPurpose,
    pub session: Option<SessionTokens>,
}
