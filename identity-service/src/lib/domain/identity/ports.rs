use async_trait::async_trait;
use auth::IssuedToken;
use chrono::DateTime;
use chrono::Utc;

use crate::identity::errors::AuthError;
use crate::identity::errors::NotifierError;
use crate::identity::errors::OauthError;
use crate::identity::models::AuthenticatedIdentity;
use crate::identity::models::ChallengeTokens;
use crate::identity::models::DisplayName;
use crate::identity::models::EmailAddress;
use crate::identity::models::Identity;
use crate::identity::models::IdentityId;
use crate::identity::models::LoginCommand;
use crate::identity::models::OauthUserInfo;
use crate::identity::models::OtpPurpose;
use crate::identity::models::RegisterCommand;
use crate::identity::models::SessionTokens;
use crate::identity::models::VerifiedAccount;

/// Port for the auth flow orchestrator.
///
/// One method per user-facing operation; the HTTP layer maps requests and
/// cookies onto these calls and never touches the components underneath.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register a new local identity and dispatch its first challenge.
    ///
    /// # Arguments
    /// * `command` - Validated name, email, and plaintext password
    ///
    /// # Returns
    /// Verify and resend-gate tokens for the pending challenge
    ///
    /// # Errors
    /// * `EmailAlreadyRegistered` - Email is already taken
    /// * `Notifier` - Code delivery failed; the identity is not created
    /// * `Credential` / `TokenSigning` / `Database` - Infrastructure failure
    async fn register(&self, command: RegisterCommand) -> Result<ChallengeTokens, AuthError>;

    /// Password step of a login. A correct password never authenticates by
    /// itself; it always re-challenges with a fresh code.
    ///
    /// # Errors
    /// * `NotFound` - Unknown email
    /// * `LinkedToOauth` - Identity has no password to check
    /// * `TemporarilyBlocked` - Active lockout, checked before the password
    /// * `InvalidCredentials` - Password mismatch
    async fn login(&self, command: LoginCommand) -> Result<ChallengeTokens, AuthError>;

    /// Verify a submitted code for the signup or login purpose.
    ///
    /// # Arguments
    /// * `verify_token` - Verify-kind token scoping which identity may submit
    /// * `code` - Candidate six-digit code
    /// * `purpose` - Flow the code was issued for
    ///
    /// # Returns
    /// Session tokens for the login purpose; none for signup
    ///
    /// # Errors
    /// * `InvalidVerifyToken` - Token missing, expired, or forged
    /// * `TemporarilyBlocked` / `CodeExpired` / `InvalidCode` - Challenge
    ///   checks, in that order
    async fn verify_account(
        &self,
        verify_token: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<VerifiedAccount, AuthError>;

    /// Replace an expired challenge with a fresh one.
    ///
    /// # Returns
    /// A new verify token; the resend-gate token stays as issued
    ///
    /// # Errors
    /// * `InvalidResendToken` - Gate token missing, expired, or forged
    /// * `TemporarilyBlocked` - Active lockout
    /// * `ResendTooSoon` - Current challenge has not expired yet
    async fn resend_otp(&self, resend_token: &str) -> Result<IssuedToken, AuthError>;

    /// Expiry of the current challenge, if one is active.
    ///
    /// # Errors
    /// * `InvalidResendToken` - Gate token missing, expired, or forged
    /// * `TemporarilyBlocked` - Active lockout
    async fn otp_expire_time(
        &self,
        resend_token: &str,
    ) -> Result<Option<DateTime<Utc>>, AuthError>;

    /// Start a password reset by dispatching a challenge to a known email.
    ///
    /// # Errors
    /// * `NotFound` - Email is not registered
    /// * `LinkedToOauth` - Identity has no password to reset
    /// * `TemporarilyBlocked` - Active lockout
    async fn forgot_password(&self, email: EmailAddress) -> Result<ChallengeTokens, AuthError>;

    /// Complete a password reset: consume the challenge and replace the
    /// password hash. Never issues session tokens.
    ///
    /// # Errors
    /// * `InvalidVerifyToken` - Token missing, expired, or forged
    /// * `TemporarilyBlocked` / `CodeExpired` / `InvalidCode` - Challenge
    ///   checks, in that order
    async fn reset_password(
        &self,
        verify_token: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    /// OAuth login path. Verifies the third-party assertion out of band,
    /// lazily creating a pre-verified identity on first sight. Never
    /// touches the OTP or lockout machinery.
    ///
    /// # Errors
    /// * `OauthAssertionMissing` - Empty assertion
    /// * `Oauth` - Assertion rejected by the provider
    /// * `LinkedToLocal` - Email already bound to a local identity
    async fn oauth_login(&self, assertion: &str) -> Result<SessionTokens, AuthError>;

    /// Resolve an identity reference into the stripped shape exposed to
    /// the rest of the system.
    ///
    /// # Errors
    /// * `NotFound` - Identity no longer exists
    async fn authenticated_identity(
        &self,
        id: &IdentityId,
    ) -> Result<AuthenticatedIdentity, AuthError>;

    /// Update the display name of an authenticated identity.
    ///
    /// # Errors
    /// * `NotFound` - Identity no longer exists
    async fn update_profile(&self, id: &IdentityId, name: DisplayName) -> Result<(), AuthError>;
}

/// Persistence operations for the identity aggregate.
#[async_trait]
pub trait IdentityRepository: Send + Sync + 'static {
    /// Persist a new identity.
    ///
    /// # Errors
    /// * `EmailAlreadyRegistered` - Email uniqueness violated
    /// * `Database` - Storage operation failed
    async fn create(&self, identity: Identity) -> Result<Identity, AuthError>;

    /// Retrieve an identity by identifier.
    ///
    /// # Errors
    /// * `Database` - Storage operation failed
    async fn find_by_id(&self, id: &IdentityId) -> Result<Option<Identity>, AuthError>;

    /// Retrieve an identity by exact email match.
    ///
    /// # Errors
    /// * `Database` - Storage operation failed
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError>;

    /// Replace all mutable fields of an existing identity.
    ///
    /// # Errors
    /// * `NotFound` - Identity does not exist
    /// * `Database` - Storage operation failed
    async fn update(&self, identity: Identity) -> Result<Identity, AuthError>;

    /// Record a wrong-attempt transition with a compare-and-swap on the
    /// previous counter value, so concurrent failures against one identity
    /// cannot double-count.
    ///
    /// # Arguments
    /// * `id` - Identity to update
    /// * `expected_attempts` - Counter value the transition was computed from
    /// * `attempts` - New counter value
    /// * `block_expires_at` - Block stamp, set on the locking transition
    ///
    /// # Returns
    /// False if the counter moved concurrently and nothing was written
    ///
    /// # Errors
    /// * `Database` - Storage operation failed
    async fn record_wrong_attempt(
        &self,
        id: &IdentityId,
        expected_attempts: u8,
        attempts: u8,
        block_expires_at: Option<DateTime<Utc>>,
    ) -> Result<bool, AuthError>;
}

/// Out-of-band delivery of one-time codes.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    /// Deliver a plaintext code to the identity's email address.
    ///
    /// # Errors
    /// * `InvalidRecipient` - Address could not be parsed by the transport
    /// * `Message` - Message construction failed
    /// * `Transport` - Delivery failed
    async fn send_otp(
        &self,
        to: &EmailAddress,
        name: &str,
        code: &str,
    ) -> Result<(), NotifierError>;
}

/// Third-party identity assertion verification.
#[async_trait]
pub trait OauthVerifier: Send + Sync + 'static {
    /// Verify a provider-issued assertion and extract the asserted profile.
    ///
    /// # Errors
    /// * `Verification` - Assertion rejected (bad signature, wrong audience)
    /// * `Transport` - Provider could not be reached
    async fn verify_assertion(&self, assertion: &str) -> Result<OauthUserInfo, OauthError>;
}
