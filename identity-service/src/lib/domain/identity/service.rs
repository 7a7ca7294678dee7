use std::sync::Arc;

use async_trait::async_trait;
use auth::CredentialHasher;
use auth::IssuedToken;
use auth::TokenKind;
use auth::TokenService;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::identity::lockout;
use crate::domain::identity::lockout::LockoutState;
use crate::domain::identity::lockout::WrongCodeTransition;
use crate::domain::identity::otp;
use crate::identity::errors::AuthError;
use crate::identity::models::AuthProvider;
use crate::identity::models::AuthenticatedIdentity;
use crate::identity::models::ChallengeTokens;
use crate::identity::models::DisplayName;
use crate::identity::models::EmailAddress;
use crate::identity::models::Identity;
use crate::identity::models::IdentityId;
use crate::identity::models::LoginCommand;
use crate::identity::models::OtpChallenge;
use crate::identity::models::OtpPurpose;
use crate::identity::models::RegisterCommand;
use crate::identity::models::SessionTokens;
use crate::identity::models::VerifiedAccount;
use crate::identity::ports::AuthServicePort;
use crate::identity::ports::IdentityRepository;
use crate::identity::ports::Notifier;
use crate::identity::ports::OauthVerifier;

/// Auth flow orchestrator.
///
/// Composes the credential hasher, token service, OTP lifecycle, and
/// lockout machine into the user-facing operations, with dependency
/// injection for persistence, notification, and OAuth verification.
pub struct AuthService<R, N, O>
where
    R: IdentityRepository,
    N: Notifier,
    O: OauthVerifier,
{
    repository: Arc<R>,
    notifier: Arc<N>,
    oauth: Arc<O>,
    tokens: Arc<TokenService>,
    hasher: CredentialHasher,
}

impl<R, N, O> AuthService<R, N, O>
where
    R: IdentityRepository,
    N: Notifier,
    O: OauthVerifier,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `repository` - Identity persistence implementation
    /// * `notifier` - Out-of-band code delivery implementation
    /// * `oauth` - Third-party assertion verification implementation
    /// * `tokens` - Configured signed-token service
    pub fn new(
        repository: Arc<R>,
        notifier: Arc<N>,
        oauth: Arc<O>,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            repository,
            notifier,
            oauth,
            tokens,
            hasher: CredentialHasher::new(),
        }
    }

    fn signing_error(e: auth::TokenError) -> AuthError {
        AuthError::TokenSigning(e.to_string())
    }

    fn challenge_tokens(&self, identity: &Identity) -> Result<ChallengeTokens, AuthError> {
        let subject = identity.id.to_string();
        let email = identity.email.as_str();
        let verify = self
            .tokens
            .issue(TokenKind::Verify, &subject, Some(email))
            .map_err(Self::signing_error)?;
        let resend_gate = self
            .tokens
            .issue(TokenKind::ResendGate, &subject, Some(email))
            .map_err(Self::signing_error)?;
        Ok(ChallengeTokens {
            verify,
            resend_gate,
        })
    }

    fn session_tokens(&self, identity: &Identity) -> Result<SessionTokens, AuthError> {
        let subject = identity.id.to_string();
        let access = self
            .tokens
            .issue(TokenKind::Access, &subject, None)
            .map_err(Self::signing_error)?;
        let refresh = self
            .tokens
            .issue(TokenKind::Refresh, &subject, None)
            .map_err(Self::signing_error)?;
        Ok(SessionTokens { access, refresh })
    }

    /// Resolve a verify or resend-gate token into the identity it scopes.
    async fn identity_for_token(
        &self,
        kind: TokenKind,
        token: &str,
        invalid: AuthError,
    ) -> Result<Identity, AuthError> {
        let claims = self
            .tokens
            .verify(kind, token)
            .map_err(|_| invalid.clone())?;
        let id = IdentityId::from_string(&claims.sub).map_err(|_| invalid)?;
        self.repository
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AuthError::NotFound(id.to_string()))
    }

    /// Reject password and OTP flows against OAuth-only identities.
    fn ensure_local(identity: &Identity) -> Result<(), AuthError> {
        if identity.password_hash.is_none() && identity.provider == AuthProvider::Oauth {
            return Err(AuthError::LinkedToOauth);
        }
        Ok(())
    }

    fn ensure_not_blocked(challenge: &OtpChallenge, now: DateTime<Utc>) -> Result<(), AuthError> {
        if let LockoutState::Locked { until } =
            lockout::state(challenge.wrong_attempts, challenge.block_expires_at, now)
        {
            return Err(AuthError::TemporarilyBlocked {
                remaining: until - now,
            });
        }
        Ok(())
    }

    async fn record_wrong_code(
        &self,
        identity: &Identity,
        now: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        match lockout::on_wrong_code(identity.challenge.wrong_attempts, now) {
            WrongCodeTransition::Count { wrong_attempts } => {
                let applied = self
                    .repository
                    .record_wrong_attempt(
                        &identity.id,
                        identity.challenge.wrong_attempts,
                        wrong_attempts,
                        None,
                    )
                    .await?;
                if !applied {
                    tracing::warn!(
                        identity_id = %identity.id,
                        "Wrong-attempt counter moved concurrently; increment skipped"
                    );
                }
            }
            WrongCodeTransition::Lock {
                wrong_attempts,
                until,
            } => {
                let applied = self
                    .repository
                    .record_wrong_attempt(
                        &identity.id,
                        identity.challenge.wrong_attempts,
                        wrong_attempts,
                        Some(until),
                    )
                    .await?;
                if applied {
                    tracing::info!(
                        identity_id = %identity.id,
                        block_expires_at = %until,
                        "Account locked after repeated wrong codes"
                    );
                } else {
                    tracing::warn!(
                        identity_id = %identity.id,
                        "Wrong-attempt counter moved concurrently; lock skipped"
                    );
                }
            }
            WrongCodeTransition::Saturated => {}
        }
        Ok(())
    }

    /// Shared challenge consumption for account verification and password
    /// reset. Checks run in a fixed order: lockout, expiry, then the code
    /// itself. Returns the identity with the challenge cleared and the
    /// verified flag set; the caller persists it.
    async fn consume_challenge(
        &self,
        mut identity: Identity,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Identity, AuthError> {
        Self::ensure_not_blocked(&identity.challenge, now)?;

        let (code_hash, expires_at) =
            match (identity.challenge.code_hash.clone(), identity.challenge.expires_at) {
                (Some(code_hash), Some(expires_at)) => (code_hash, expires_at),
                _ => return Err(AuthError::CodeExpired),
            };
        if now > expires_at {
            return Err(AuthError::CodeExpired);
        }

        if !self.hasher.verify(code, &code_hash)? {
            self.record_wrong_code(&identity, now).await?;
            return Err(AuthError::InvalidCode);
        }

        identity.challenge = OtpChallenge::empty();
        identity.verified = true;
        Ok(identity)
    }

    /// Issue a fresh challenge on an identity and hand back the tokens
    /// gating it, dispatching the code before anything is persisted.
    async fn dispatch_challenge(
        &self,
        mut identity: Identity,
        now: DateTime<Utc>,
    ) -> Result<ChallengeTokens, AuthError> {
        let issued = otp::issue_challenge(&self.hasher, now)?;
        let tokens = self.challenge_tokens(&identity)?;

        self.notifier
            .send_otp(&identity.email, identity.name.as_str(), &issued.code)
            .await?;

        identity.challenge = issued.challenge;
        self.repository.update(identity).await?;
        Ok(tokens)
    }
}

#[async_trait]
impl<R, N, O> AuthServicePort for AuthService<R, N, O>
where
    R: IdentityRepository,
    N: Notifier,
    O: OauthVerifier,
{
    async fn register(&self, command: RegisterCommand) -> Result<ChallengeTokens, AuthError> {
        if self
            .repository
            .find_by_email(command.email.as_str())
            .await?
            .is_some()
        {
            return Err(AuthError::EmailAlreadyRegistered(
                command.email.as_str().to_string(),
            ));
        }

        let now = Utc::now();
        let password_hash = self.hasher.hash(&command.password)?;
        let issued = otp::issue_challenge(&self.hasher, now)?;
        let identity = Identity::new_local(
            command.name,
            command.email,
            password_hash,
            issued.challenge,
            now,
        );
        let tokens = self.challenge_tokens(&identity)?;

        // Delivery is awaited and happens before the identity exists: a
        // notifier failure must not leave an account pending with no way
        // to ever receive its code.
        self.notifier
            .send_otp(&identity.email, identity.name.as_str(), &issued.code)
            .await?;

        let identity = self.repository.create(identity).await?;
        tracing::info!(identity_id = %identity.id, "Identity registered, verification pending");

        Ok(tokens)
    }

    async fn login(&self, command: LoginCommand) -> Result<ChallengeTokens, AuthError> {
        let identity = self
            .repository
            .find_by_email(command.email.as_str())
            .await?
            .ok_or_else(|| AuthError::NotFound(command.email.as_str().to_string()))?;

        Self::ensure_local(&identity)?;

        let now = Utc::now();
        Self::ensure_not_blocked(&identity.challenge, now)?;

        let password_hash = identity
            .password_hash
            .as_deref()
            .ok_or(AuthError::LinkedToOauth)?;
        if !self.hasher.verify(&command.password, password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        // A correct password never authenticates by itself; every login
        // re-challenges with a fresh code.
        let tokens = self.dispatch_challenge(identity, now).await?;
        Ok(tokens)
    }

    async fn verify_account(
        &self,
        verify_token: &str,
        code: &str,
        purpose: OtpPurpose,
    ) -> Result<VerifiedAccount, AuthError> {
        let identity = self
            .identity_for_token(TokenKind::Verify, verify_token, AuthError::InvalidVerifyToken)
            .await?;
        Self::ensure_local(&identity)?;

        let identity = self.consume_challenge(identity, code, Utc::now()).await?;
        let identity = self.repository.update(identity).await?;
        tracing::info!(
            identity_id = %identity.id,
            purpose = purpose.as_str(),
            "Challenge verified"
        );

        let session = match purpose {
            OtpPurpose::Login => Some(self.session_tokens(&identity)?),
            _ => None,
        };
        Ok(VerifiedAccount { purpose, session })
    }

    async fn resend_otp(&self, resend_token: &str) -> Result<IssuedToken, AuthError> {
        let mut identity = self
            .identity_for_token(
                TokenKind::ResendGate,
                resend_token,
                AuthError::InvalidResendToken,
            )
            .await?;
        Self::ensure_local(&identity)?;

        let now = Utc::now();
        Self::ensure_not_blocked(&identity.challenge, now)?;

        if let Some(expires_at) = identity.challenge.expires_at {
            if identity.challenge.is_active(now) {
                return Err(AuthError::ResendTooSoon {
                    remaining: expires_at - now,
                });
            }
        }

        let issued = otp::issue_challenge(&self.hasher, now)?;
        let verify = self
            .tokens
            .issue(
                TokenKind::Verify,
                &identity.id.to_string(),
                Some(identity.email.as_str()),
            )
            .map_err(Self::signing_error)?;

        identity.challenge = issued.challenge;
        let email = identity.email.clone();
        let name = identity.name.as_str().to_string();
        let id = identity.id;
        self.repository.update(identity).await?;

        // Dispatch is fire-and-forget relative to the response; a delivery
        // failure leaves the challenge standing and the user can resend
        // again once it expires.
        let notifier = Arc::clone(&self.notifier);
        let code = issued.code;
        tokio::spawn(async move {
            if let Err(e) = notifier.send_otp(&email, &name, &code).await {
                tracing::error!(identity_id = %id, error = %e, "Failed to deliver resent code");
            }
        });

        Ok(verify)
    }

    async fn otp_expire_time(
        &self,
        resend_token: &str,
    ) -> Result<Option<DateTime<Utc>>, AuthError> {
        let identity = self
            .identity_for_token(
                TokenKind::ResendGate,
                resend_token,
                AuthError::InvalidResendToken,
            )
            .await?;
        Self::ensure_local(&identity)?;
        Self::ensure_not_blocked(&identity.challenge, Utc::now())?;

        match identity.challenge.code_hash {
            Some(_) => Ok(identity.challenge.expires_at),
            None => Ok(None),
        }
    }

    async fn forgot_password(&self, email: EmailAddress) -> Result<ChallengeTokens, AuthError> {
        let identity = self
            .repository
            .find_by_email(email.as_str())
            .await?
            .ok_or_else(|| AuthError::NotFound(email.as_str().to_string()))?;

        Self::ensure_local(&identity)?;

        let now = Utc::now();
        Self::ensure_not_blocked(&identity.challenge, now)?;

        let tokens = self.dispatch_challenge(identity, now).await?;
        Ok(tokens)
    }

    async fn reset_password(
        &self,
        verify_token: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let identity = self
            .identity_for_token(TokenKind::Verify, verify_token, AuthError::InvalidVerifyToken)
            .await?;
        Self::ensure_local(&identity)?;

        let mut identity = self.consume_challenge(identity, code, Utc::now()).await?;
        identity.password_hash = Some(self.hasher.hash(new_password)?);
        let identity = self.repository.update(identity).await?;
        tracing::info!(identity_id = %identity.id, "Password reset completed");

        Ok(())
    }

    async fn oauth_login(&self, assertion: &str) -> Result<SessionTokens, AuthError> {
        if assertion.trim().is_empty() {
            return Err(AuthError::OauthAssertionMissing);
        }

        let info = self.oauth.verify_assertion(assertion).await?;

        let identity = match self.repository.find_by_email(info.email.as_str()).await? {
            Some(identity) if identity.provider == AuthProvider::Local => {
                return Err(AuthError::LinkedToLocal);
            }
            Some(identity) => identity,
            None => {
                let identity = Identity::new_oauth(info.name, info.email, Utc::now());
                let identity = self.repository.create(identity).await?;
                tracing::info!(identity_id = %identity.id, "OAuth identity created");
                identity
            }
        };

        self.session_tokens(&identity)
    }

    async fn authenticated_identity(
        &self,
        id: &IdentityId,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let identity = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::NotFound(id.to_string()))?;
        Ok(AuthenticatedIdentity::from(&identity))
    }

    async fn update_profile(&self, id: &IdentityId, name: DisplayName) -> Result<(), AuthError> {
        let mut identity = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::NotFound(id.to_string()))?;

        identity.name = name;
        self.repository.update(identity).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use auth::TokenConfig;
    use chrono::Duration;
    use mockall::mock;
    use mockall::predicate::*;

    use super::*;
    use crate::identity::errors::NotifierError;
    use crate::identity::errors::OauthError;
    use crate::identity::models::OauthUserInfo;

    // Define mocks in the test module using mockall
    mock! {
        pub TestIdentityRepository {}

        #[async_trait]
        impl IdentityRepository for TestIdentityRepository {
            async fn create(&self, identity: Identity) -> Result<Identity, AuthError>;
            async fn find_by_id(&self, id: &IdentityId) -> Result<Option<Identity>, AuthError>;
            async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, AuthError>;
            async fn update(&self, identity: Identity) -> Result<Identity, AuthError>;
            async fn record_wrong_attempt(
                &self,
                id: &IdentityId,
                expected_attempts: u8,
                attempts: u8,
                block_expires_at: Option<chrono::DateTime<Utc>>,
            ) -> Result<bool, AuthError>;
        }
    }

    mock! {
        pub TestNotifier {}

        #[async_trait]
        impl Notifier for TestNotifier {
            async fn send_otp(
                &self,
                to: &EmailAddress,
                name: &str,
                code: &str,
            ) -> Result<(), NotifierError>;
        }
    }

    mock! {
        pub TestOauthVerifier {}

        #[async_trait]
        impl OauthVerifier for TestOauthVerifier {
            async fn verify_assertion(&self, assertion: &str) -> Result<OauthUserInfo, OauthError>;
        }
    }

    fn token_service() -> Arc<TokenService> {
        Arc::new(TokenService::new(&TokenConfig::with_secrets(
            "verify_secret_at_least_32_bytes_long!!",
            "resend_secret_at_least_32_bytes_long!!",
            "access_secret_at_least_32_bytes_long!!",
            "refresh_secret_at_least_32_bytes_long!",
        )))
    }

    fn service(
        repository: MockTestIdentityRepository,
        notifier: MockTestNotifier,
        oauth: MockTestOauthVerifier,
    ) -> AuthService<MockTestIdentityRepository, MockTestNotifier, MockTestOauthVerifier> {
        AuthService::new(
            Arc::new(repository),
            Arc::new(notifier),
            Arc::new(oauth),
            token_service(),
        )
    }

    fn local_identity(challenge: OtpChallenge) -> Identity {
        let hasher = CredentialHasher::new();
        Identity {
            id: IdentityId::new(),
            name: DisplayName::new("Al".to_string()).unwrap(),
            email: EmailAddress::new("a@x.com".to_string()).unwrap(),
            password_hash: Some(hasher.hash("Abcdef1!").unwrap()),
            provider: AuthProvider::Local,
            role: crate::identity::models::Role::User,
            verified: false,
            challenge,
            created_at: Utc::now(),
        }
    }

    fn oauth_identity() -> Identity {
        Identity::new_oauth(
            DisplayName::new("Al".to_string()).unwrap(),
            EmailAddress::new("a@x.com".to_string()).unwrap(),
            Utc::now(),
        )
    }

    fn active_challenge(hasher: &CredentialHasher, code: &str) -> OtpChallenge {
        OtpChallenge {
            code_hash: Some(hasher.hash(code).unwrap()),
            expires_at: Some(Utc::now() + Duration::minutes(5)),
            wrong_attempts: 0,
            block_expires_at: None,
        }
    }

    fn verify_token_for(service_tokens: &TokenService, identity: &Identity) -> String {
        service_tokens
            .issue(
                TokenKind::Verify,
                &identity.id.to_string(),
                Some(identity.email.as_str()),
            )
            .unwrap()
            .token
    }

    fn resend_token_for(service_tokens: &TokenService, identity: &Identity) -> String {
        service_tokens
            .issue(
                TokenKind::ResendGate,
                &identity.id.to_string(),
                Some(identity.email.as_str()),
            )
            .unwrap()
            .token
    }

    #[tokio::test]
    async fn test_register_success() {
        let mut repository = MockTestIdentityRepository::new();
        let mut notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        repository
            .expect_find_by_email()
            .withf(|email| email == "a@x.com")
            .times(1)
            .returning(|_| Ok(None));
        repository
            .expect_create()
            .withf(|identity| {
                identity.provider == AuthProvider::Local
                    && !identity.verified
                    && identity
                        .password_hash
                        .as_deref()
                        .is_some_and(|h| h.starts_with("$argon2"))
                    && identity.challenge.code_hash.is_some()
                    && identity.challenge.wrong_attempts == 0
            })
            .times(1)
            .returning(|identity| Ok(identity));

        notifier
            .expect_send_otp()
            .withf(|to, name, code| {
                to.as_str() == "a@x.com" && name == "Al" && code.len() == 6
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = service(repository, notifier, oauth);

        let command = RegisterCommand {
            name: DisplayName::new("Al".to_string()).unwrap(),
            email: EmailAddress::new("a@x.com".to_string()).unwrap(),
            password: "Abcdef1!".to_string(),
        };

        let tokens = service.register(command).await.expect("register failed");
        assert!(!tokens.verify.token.is_empty());
        assert!(!tokens.resend_gate.token.is_empty());
        assert_eq!(tokens.verify.max_age_secs(), 7 * 60);
        assert_eq!(tokens.resend_gate.max_age_secs(), 22 * 60);
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let mut repository = MockTestIdentityRepository::new();
        let mut notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        repository
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(Some(local_identity(OtpChallenge::empty()))));
        repository.expect_create().times(0);
        notifier.expect_send_otp().times(0);

        let service = service(repository, notifier, oauth);

        let command = RegisterCommand {
            name: DisplayName::new("Al".to_string()).unwrap(),
            email: EmailAddress::new("a@x.com".to_string()).unwrap(),
            password: "Abcdef1!".to_string(),
        };

        let result = service.register(command).await;
        assert!(matches!(
            result.unwrap_err(),
            AuthError::EmailAlreadyRegistered(_)
        ));
    }

    #[tokio::test]
    async fn test_register_notifier_failure_creates_nothing() {
        let mut repository = MockTestIdentityRepository::new();
        let mut notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        repository
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(None));
        repository.expect_create().times(0);
        notifier
            .expect_send_otp()
            .times(1)
            .returning(|_, _, _| Err(NotifierError::Transport("smtp down".to_string())));

        let service = service(repository, notifier, oauth);

        let command = RegisterCommand {
            name: DisplayName::new("Al".to_string()).unwrap(),
            email: EmailAddress::new("a@x.com".to_string()).unwrap(),
            password: "Abcdef1!".to_string(),
        };

        let result = service.register(command).await;
        assert!(matches!(result.unwrap_err(), AuthError::Notifier(_)));
    }

    #[tokio::test]
    async fn test_login_always_rechallenges() {
        let mut repository = MockTestIdentityRepository::new();
        let mut notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        // Stale lockout state from an expired block: issuing a fresh
        // challenge must reset it.
        let mut identity = local_identity(OtpChallenge::empty());
        identity.challenge.wrong_attempts = 3;
        identity.challenge.block_expires_at = Some(Utc::now() - Duration::minutes(1));

        let returned = identity.clone();
        repository
            .expect_find_by_email()
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));
        repository
            .expect_update()
            .withf(|identity| {
                identity.challenge.code_hash.is_some()
                    && identity.challenge.wrong_attempts == 0
                    && identity.challenge.block_expires_at.is_none()
            })
            .times(1)
            .returning(|identity| Ok(identity));
        notifier
            .expect_send_otp()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = service(repository, notifier, oauth);

        let command = LoginCommand {
            email: EmailAddress::new("a@x.com".to_string()).unwrap(),
            password: "Abcdef1!".to_string(),
        };

        let tokens = service.login(command).await.expect("login failed");
        assert!(!tokens.verify.token.is_empty());
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        repository
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(None));

        let service = service(repository, notifier, oauth);

        let command = LoginCommand {
            email: EmailAddress::new("a@x.com".to_string()).unwrap(),
            password: "Abcdef1!".to_string(),
        };

        let result = service.login(command).await;
        assert!(matches!(result.unwrap_err(), AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_login_rejects_oauth_only_identity() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        repository
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(Some(oauth_identity())));

        let service = service(repository, notifier, oauth);

        let command = LoginCommand {
            email: EmailAddress::new("a@x.com".to_string()).unwrap(),
            password: "Abcdef1!".to_string(),
        };

        let result = service.login(command).await;
        assert!(matches!(result.unwrap_err(), AuthError::LinkedToOauth));
    }

    #[tokio::test]
    async fn test_login_blocked_before_password_check() {
        let mut repository = MockTestIdentityRepository::new();
        let mut notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let mut identity = local_identity(OtpChallenge::empty());
        identity.challenge.wrong_attempts = 3;
        identity.challenge.block_expires_at = Some(Utc::now() + Duration::minutes(30));

        let returned = identity.clone();
        repository
            .expect_find_by_email()
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));
        repository.expect_update().times(0);
        notifier.expect_send_otp().times(0);

        let service = service(repository, notifier, oauth);

        let command = LoginCommand {
            email: EmailAddress::new("a@x.com".to_string()).unwrap(),
            // Even the correct password is never checked while blocked
            password: "Abcdef1!".to_string(),
        };

        let result = service.login(command).await;
        match result.unwrap_err() {
            AuthError::TemporarilyBlocked { remaining } => {
                assert!(remaining > Duration::minutes(29));
                assert!(remaining <= Duration::minutes(30));
            }
            other => panic!("expected TemporarilyBlocked, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let mut repository = MockTestIdentityRepository::new();
        let mut notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        repository
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(Some(local_identity(OtpChallenge::empty()))));
        repository.expect_update().times(0);
        notifier.expect_send_otp().times(0);

        let service = service(repository, notifier, oauth);

        let command = LoginCommand {
            email: EmailAddress::new("a@x.com".to_string()).unwrap(),
            password: "WrongPass1!".to_string(),
        };

        let result = service.login(command).await;
        assert!(matches!(result.unwrap_err(), AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_verify_account_login_purpose_issues_session() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let hasher = CredentialHasher::new();
        let identity = local_identity(active_challenge(&hasher, "123456"));
        let tokens = token_service();
        let token = verify_token_for(&tokens, &identity);

        let id = identity.id;
        let returned = identity.clone();
        repository
            .expect_find_by_id()
            .withf(move |lookup| *lookup == id)
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));
        repository
            .expect_update()
            .withf(|identity| {
                identity.verified && identity.challenge == OtpChallenge::empty()
            })
            .times(1)
            .returning(|identity| Ok(identity));

        let service = AuthService::new(
            Arc::new(repository),
            Arc::new(notifier),
            Arc::new(oauth),
            Arc::clone(&tokens),
        );

        let outcome = service
            .verify_account(&token, "123456", OtpPurpose::Login)
            .await
            .expect("verification failed");

        assert_eq!(outcome.purpose, OtpPurpose::Login);
        let session = outcome.session.expect("login purpose must authenticate");
        assert_eq!(session.access.max_age_secs(), 15 * 60);
        assert_eq!(session.refresh.max_age_secs(), 15 * 24 * 60 * 60);
    }

    #[tokio::test]
    async fn test_verify_account_signup_purpose_does_not_authenticate() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let hasher = CredentialHasher::new();
        let identity = local_identity(active_challenge(&hasher, "123456"));
        let tokens = token_service();
        let token = verify_token_for(&tokens, &identity);

        let returned = identity.clone();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));
        repository
            .expect_update()
            .times(1)
            .returning(|identity| Ok(identity));

        let service = AuthService::new(
            Arc::new(repository),
            Arc::new(notifier),
            Arc::new(oauth),
            Arc::clone(&tokens),
        );

        let outcome = service
            .verify_account(&token, "123456", OtpPurpose::Signup)
            .await
            .expect("verification failed");

        assert!(outcome.session.is_none());
    }

    #[tokio::test]
    async fn test_verify_account_expired_code() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let hasher = CredentialHasher::new();
        let mut identity = local_identity(active_challenge(&hasher, "123456"));
        identity.challenge.expires_at = Some(Utc::now() - Duration::seconds(1));
        let tokens = token_service();
        let token = verify_token_for(&tokens, &identity);

        let returned = identity.clone();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));
        // The correct code after expiry is Expired, never InvalidCode, and
        // consumes no attempt.
        repository.expect_record_wrong_attempt().times(0);
        repository.expect_update().times(0);

        let service = AuthService::new(
            Arc::new(repository),
            Arc::new(notifier),
            Arc::new(oauth),
            Arc::clone(&tokens),
        );

        let result = service
            .verify_account(&token, "123456", OtpPurpose::Login)
            .await;
        assert!(matches!(result.unwrap_err(), AuthError::CodeExpired));
    }

    #[tokio::test]
    async fn test_verify_account_cleared_challenge_reads_as_expired() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let identity = local_identity(OtpChallenge::empty());
        let tokens = token_service();
        let token = verify_token_for(&tokens, &identity);

        let returned = identity.clone();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));
        repository.expect_update().times(0);

        let service = AuthService::new(
            Arc::new(repository),
            Arc::new(notifier),
            Arc::new(oauth),
            Arc::clone(&tokens),
        );

        let result = service
            .verify_account(&token, "123456", OtpPurpose::Signup)
            .await;
        assert!(matches!(result.unwrap_err(), AuthError::CodeExpired));
    }

    #[tokio::test]
    async fn test_verify_account_wrong_code_counts_attempt() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let hasher = CredentialHasher::new();
        let identity = local_identity(active_challenge(&hasher, "123456"));
        let tokens = token_service();
        let token = verify_token_for(&tokens, &identity);

        let id = identity.id;
        let returned = identity.clone();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));
        repository
            .expect_record_wrong_attempt()
            .withf(move |lookup, expected, attempts, block| {
                *lookup == id && *expected == 0 && *attempts == 1 && block.is_none()
            })
            .times(1)
            .returning(|_, _, _, _| Ok(true));
        repository.expect_update().times(0);

        let service = AuthService::new(
            Arc::new(repository),
            Arc::new(notifier),
            Arc::new(oauth),
            Arc::clone(&tokens),
        );

        let result = service
            .verify_account(&token, "654321", OtpPurpose::Login)
            .await;
        assert!(matches!(result.unwrap_err(), AuthError::InvalidCode));
    }

    #[tokio::test]
    async fn test_verify_account_third_failure_locks() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let hasher = CredentialHasher::new();
        let mut identity = local_identity(active_challenge(&hasher, "123456"));
        identity.challenge.wrong_attempts = 2;
        let tokens = token_service();
        let token = verify_token_for(&tokens, &identity);

        let returned = identity.clone();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));
        repository
            .expect_record_wrong_attempt()
            .withf(|_, expected, attempts, block| {
                *expected == 2 && *attempts == 3 && block.is_some()
            })
            .times(1)
            .returning(|_, _, _, _| Ok(true));

        let service = AuthService::new(
            Arc::new(repository),
            Arc::new(notifier),
            Arc::new(oauth),
            Arc::clone(&tokens),
        );

        let result = service
            .verify_account(&token, "654321", OtpPurpose::Login)
            .await;
        assert!(matches!(result.unwrap_err(), AuthError::InvalidCode));
    }

    #[tokio::test]
    async fn test_verify_account_blocked_fails_fast() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let hasher = CredentialHasher::new();
        let mut identity = local_identity(active_challenge(&hasher, "123456"));
        identity.challenge.wrong_attempts = 3;
        identity.challenge.block_expires_at = Some(Utc::now() + Duration::minutes(59));
        let tokens = token_service();
        let token = verify_token_for(&tokens, &identity);

        let returned = identity.clone();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));
        // Fail-fast: no attempt consumed even for the correct code
        repository.expect_record_wrong_attempt().times(0);
        repository.expect_update().times(0);

        let service = AuthService::new(
            Arc::new(repository),
            Arc::new(notifier),
            Arc::new(oauth),
            Arc::clone(&tokens),
        );

        let result = service
            .verify_account(&token, "123456", OtpPurpose::Login)
            .await;
        assert!(matches!(
            result.unwrap_err(),
            AuthError::TemporarilyBlocked { .. }
        ));
    }

    #[tokio::test]
    async fn test_verify_account_invalid_token() {
        let repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let service = service(repository, notifier, oauth);

        let result = service
            .verify_account("garbage.token.here", "123456", OtpPurpose::Login)
            .await;
        assert!(matches!(result.unwrap_err(), AuthError::InvalidVerifyToken));
    }

    #[tokio::test]
    async fn test_verify_account_rejects_access_token() {
        let repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let tokens = token_service();
        let access = tokens
            .issue(TokenKind::Access, &IdentityId::new().to_string(), None)
            .unwrap();

        let service = AuthService::new(
            Arc::new(repository),
            Arc::new(notifier),
            Arc::new(oauth),
            Arc::clone(&tokens),
        );

        let result = service
            .verify_account(&access.token, "123456", OtpPurpose::Login)
            .await;
        assert!(matches!(result.unwrap_err(), AuthError::InvalidVerifyToken));
    }

    #[tokio::test]
    async fn test_resend_too_soon() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let hasher = CredentialHasher::new();
        let identity = local_identity(active_challenge(&hasher, "123456"));
        let tokens = token_service();
        let token = resend_token_for(&tokens, &identity);

        let returned = identity.clone();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));
        repository.expect_update().times(0);

        let service = AuthService::new(
            Arc::new(repository),
            Arc::new(notifier),
            Arc::new(oauth),
            Arc::clone(&tokens),
        );

        let result = service.resend_otp(&token).await;
        match result.unwrap_err() {
            AuthError::ResendTooSoon { remaining } => {
                assert!(remaining > Duration::minutes(4));
                assert!(remaining <= Duration::minutes(5));
            }
            other => panic!("expected ResendTooSoon, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resend_after_expiry_issues_new_challenge() {
        let mut repository = MockTestIdentityRepository::new();
        let mut notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let hasher = CredentialHasher::new();
        let mut identity = local_identity(active_challenge(&hasher, "123456"));
        identity.challenge.expires_at = Some(Utc::now() - Duration::seconds(30));
        identity.challenge.wrong_attempts = 2;
        let old_hash = identity.challenge.code_hash.clone();
        let tokens = token_service();
        let token = resend_token_for(&tokens, &identity);

        let returned = identity.clone();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));
        repository
            .expect_update()
            .withf(move |identity| {
                identity.challenge.code_hash.is_some()
                    && identity.challenge.code_hash != old_hash
                    && identity.challenge.wrong_attempts == 0
            })
            .times(1)
            .returning(|identity| Ok(identity));
        // Resend dispatch is fire-and-forget; delivery may land after the
        // response, so no call-count assertion here.
        notifier.expect_send_otp().returning(|_, _, _| Ok(()));

        let service = AuthService::new(
            Arc::new(repository),
            Arc::new(notifier),
            Arc::new(oauth),
            Arc::clone(&tokens),
        );

        let verify = service.resend_otp(&token).await.expect("resend failed");
        assert_eq!(verify.max_age_secs(), 7 * 60);
    }

    #[tokio::test]
    async fn test_otp_expire_time_returns_active_expiry() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let hasher = CredentialHasher::new();
        let identity = local_identity(active_challenge(&hasher, "123456"));
        let expires_at = identity.challenge.expires_at;
        let tokens = token_service();
        let token = resend_token_for(&tokens, &identity);

        let returned = identity.clone();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));

        let service = AuthService::new(
            Arc::new(repository),
            Arc::new(notifier),
            Arc::new(oauth),
            Arc::clone(&tokens),
        );

        let result = service.otp_expire_time(&token).await.unwrap();
        assert_eq!(result, expires_at);
    }

    #[tokio::test]
    async fn test_forgot_password_dispatches_reset_challenge() {
        let mut repository = MockTestIdentityRepository::new();
        let mut notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        repository
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(Some(local_identity(OtpChallenge::empty()))));
        repository
            .expect_update()
            .withf(|identity| identity.challenge.code_hash.is_some())
            .times(1)
            .returning(|identity| Ok(identity));
        notifier
            .expect_send_otp()
            .times(1)
            .returning(|_, _, _| Ok(()));

        let service = service(repository, notifier, oauth);

        let email = EmailAddress::new("a@x.com".to_string()).unwrap();
        let tokens = service.forgot_password(email).await.expect("forgot failed");
        assert!(!tokens.verify.token.is_empty());
    }

    #[tokio::test]
    async fn test_reset_password_replaces_hash_without_session() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let hasher = CredentialHasher::new();
        let identity = local_identity(active_challenge(&hasher, "123456"));
        let old_hash = identity.password_hash.clone();
        let tokens = token_service();
        let token = verify_token_for(&tokens, &identity);

        let returned = identity.clone();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));
        repository
            .expect_update()
            .withf(move |identity| {
                identity.verified
                    && identity.challenge == OtpChallenge::empty()
                    && identity.password_hash.is_some()
                    && identity.password_hash != old_hash
            })
            .times(1)
            .returning(|identity| Ok(identity));

        let service = AuthService::new(
            Arc::new(repository),
            Arc::new(notifier),
            Arc::new(oauth),
            Arc::clone(&tokens),
        );

        service
            .reset_password(&token, "123456", "NewPass1!")
            .await
            .expect("reset failed");
    }

    #[tokio::test]
    async fn test_reset_password_wrong_code_counts_attempt() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let hasher = CredentialHasher::new();
        let identity = local_identity(active_challenge(&hasher, "123456"));
        let tokens = token_service();
        let token = verify_token_for(&tokens, &identity);

        let returned = identity.clone();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));
        repository
            .expect_record_wrong_attempt()
            .times(1)
            .returning(|_, _, _, _| Ok(true));
        repository.expect_update().times(0);

        let service = AuthService::new(
            Arc::new(repository),
            Arc::new(notifier),
            Arc::new(oauth),
            Arc::clone(&tokens),
        );

        let result = service.reset_password(&token, "654321", "NewPass1!").await;
        assert!(matches!(result.unwrap_err(), AuthError::InvalidCode));
    }

    #[tokio::test]
    async fn test_oauth_login_missing_assertion() {
        let repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let service = service(repository, notifier, oauth);

        let result = service.oauth_login("  ").await;
        assert!(matches!(
            result.unwrap_err(),
            AuthError::OauthAssertionMissing
        ));
    }

    #[tokio::test]
    async fn test_oauth_login_conflicts_with_local_identity() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let mut oauth = MockTestOauthVerifier::new();

        oauth.expect_verify_assertion().times(1).returning(|_| {
            Ok(OauthUserInfo {
                name: DisplayName::new("Al".to_string()).unwrap(),
                email: EmailAddress::new("a@x.com".to_string()).unwrap(),
            })
        });
        repository
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(Some(local_identity(OtpChallenge::empty()))));
        repository.expect_create().times(0);

        let service = service(repository, notifier, oauth);

        let result = service.oauth_login("assertion").await;
        assert!(matches!(result.unwrap_err(), AuthError::LinkedToLocal));
    }

    #[tokio::test]
    async fn test_oauth_login_lazily_creates_identity() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let mut oauth = MockTestOauthVerifier::new();

        oauth.expect_verify_assertion().times(1).returning(|_| {
            Ok(OauthUserInfo {
                name: DisplayName::new("Al".to_string()).unwrap(),
                email: EmailAddress::new("new@x.com".to_string()).unwrap(),
            })
        });
        repository
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(None));
        repository
            .expect_create()
            .withf(|identity| {
                identity.provider == AuthProvider::Oauth
                    && identity.verified
                    && identity.password_hash.is_none()
            })
            .times(1)
            .returning(|identity| Ok(identity));

        let service = service(repository, notifier, oauth);

        let session = service.oauth_login("assertion").await.expect("oauth failed");
        assert!(!session.access.token.is_empty());
        assert!(!session.refresh.token.is_empty());
    }

    #[tokio::test]
    async fn test_oauth_login_existing_oauth_identity() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let mut oauth = MockTestOauthVerifier::new();

        oauth.expect_verify_assertion().times(1).returning(|_| {
            Ok(OauthUserInfo {
                name: DisplayName::new("Al".to_string()).unwrap(),
                email: EmailAddress::new("a@x.com".to_string()).unwrap(),
            })
        });
        repository
            .expect_find_by_email()
            .times(1)
            .returning(|_| Ok(Some(oauth_identity())));
        repository.expect_create().times(0);

        let service = service(repository, notifier, oauth);

        let session = service.oauth_login("assertion").await.expect("oauth failed");
        assert!(!session.access.token.is_empty());
    }

    #[tokio::test]
    async fn test_authenticated_identity_strips_fields() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let identity = local_identity(OtpChallenge::empty());
        let id = identity.id;
        let returned = identity.clone();
        repository
            .expect_find_by_id()
            .withf(move |lookup| *lookup == id)
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));

        let service = service(repository, notifier, oauth);

        let authenticated = service
            .authenticated_identity(&id)
            .await
            .expect("lookup failed");
        assert_eq!(authenticated.id, id);
        assert_eq!(authenticated.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_authenticated_identity_not_found() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        repository
            .expect_find_by_id()
            .times(1)
            .returning(|_| Ok(None));

        let service = service(repository, notifier, oauth);

        let result = service.authenticated_identity(&IdentityId::new()).await;
        assert!(matches!(result.unwrap_err(), AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let mut repository = MockTestIdentityRepository::new();
        let notifier = MockTestNotifier::new();
        let oauth = MockTestOauthVerifier::new();

        let identity = local_identity(OtpChallenge::empty());
        let id = identity.id;
        let returned = identity.clone();
        repository
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(returned.clone())));
        repository
            .expect_update()
            .withf(|identity| identity.name.as_str() == "New Name")
            .times(1)
            .returning(|identity| Ok(identity));

        let service = service(repository, notifier, oauth);

        service
            .update_profile(&id, DisplayName::new("New Name".to_string()).unwrap())
            .await
            .expect("update failed");
    }
}
