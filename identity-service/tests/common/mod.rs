use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use auth::TokenConfig;
use auth::TokenService;
use identity_service::domain::identity::service::AuthService;
use identity_service::identity::errors::NotifierError;
use identity_service::identity::errors::OauthError;
use identity_service::identity::models::DisplayName;
use identity_service::identity::models::EmailAddress;
use identity_service::identity::models::OauthUserInfo;
use identity_service::identity::ports::Notifier;
use identity_service::identity::ports::OauthVerifier;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::repositories::InMemoryIdentityRepository;

/// A delivered one-time code captured by the test notifier.
#[derive(Debug, Clone)]
pub struct SentMail {
    pub email: String,
    pub code: String,
}

/// Notifier double that records every dispatched code instead of sending
/// mail, so tests can submit the exact plaintext code.
#[derive(Default)]
pub struct CapturingNotifier {
    sent: Mutex<Vec<SentMail>>,
}

impl CapturingNotifier {
    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|mail| mail.email == email)
            .map(|mail| mail.code.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn send_otp(
        &self,
        to: &EmailAddress,
        _name: &str,
        code: &str,
    ) -> Result<(), NotifierError> {
        self.sent.lock().unwrap().push(SentMail {
            email: to.as_str().to_string(),
            code: code.to_string(),
        });
        Ok(())
    }
}

/// OAuth verifier double: accepts any assertion while a profile is
/// configured, rejects everything otherwise.
#[derive(Default)]
pub struct StubOauthVerifier {
    user: Mutex<Option<(String, String)>>,
}

impl StubOauthVerifier {
    /// Configure the (name, email) profile the next assertions resolve to.
    pub fn present(&self, name: &str, email: &str) {
        *self.user.lock().unwrap() = Some((name.to_string(), email.to_string()));
    }
}

#[async_trait]
impl OauthVerifier for StubOauthVerifier {
    async fn verify_assertion(&self, _assertion: &str) -> Result<OauthUserInfo, OauthError> {
        match self.user.lock().unwrap().clone() {
            Some((name, email)) => Ok(OauthUserInfo {
                name: DisplayName::new(name).unwrap(),
                email: EmailAddress::new(email).unwrap(),
            }),
            None => Err(OauthError::Verification("assertion rejected".to_string())),
        }
    }
}

/// Test application that spawns a real server over the in-memory
/// repository and test doubles.
pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub notifier: Arc<CapturingNotifier>,
    pub oauth: Arc<StubOauthVerifier>,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let repository = Arc::new(InMemoryIdentityRepository::new());
        let notifier = Arc::new(CapturingNotifier::default());
        let oauth = Arc::new(StubOauthVerifier::default());
        let token_service = Arc::new(TokenService::new(&TokenConfig::with_secrets(
            "test-verify-secret-at-least-32-bytes!!",
            "test-resend-secret-at-least-32-bytes!!",
            "test-access-secret-at-least-32-bytes!!",
            "test-refresh-secret-at-least-32-bytes!",
        )));

        let auth_service = Arc::new(AuthService::new(
            repository,
            Arc::clone(&notifier),
            Arc::clone(&oauth),
            Arc::clone(&token_service),
        ));

        // Plain-HTTP test server: secure cookies would be withheld by the
        // client's cookie store.
        let router = create_router(auth_service, token_service, false);

        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            api_client: reqwest::Client::builder()
                .cookie_store(true)
                .build()
                .expect("Failed to create reqwest client"),
            notifier,
            oauth,
        }
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(format!("{}{}", self.address, path))
    }

    /// Helper to make PUT request
    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.put(format!("{}{}", self.address, path))
    }

    /// Register an account and return the OTP dispatched for it.
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> String {
        let response = self
            .post("/signup")
            .json(&serde_json::json!({
                "name": name,
                "email": email,
                "password": password,
                "confirmPassword": password,
            }))
            .send()
            .await
            .expect("Failed to execute signup");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        self.notifier
            .last_code_for(email)
            .expect("signup should dispatch a code")
    }

    /// Register and verify an account, leaving it unauthenticated.
    pub async fn signup_verified(&self, name: &str, email: &str, password: &str) {
        let code = self.signup(name, email, password).await;
        let response = self
            .post("/verify-account")
            .json(&serde_json::json!({ "otp": code, "otpType": "signup" }))
            .send()
            .await
            .expect("Failed to execute verify");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
    }

    /// Complete a full password login including the OTP step.
    pub async fn login_verified(&self, email: &str, password: &str) {
        let response = self
            .post("/login")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute login");
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let code = self
            .notifier
            .last_code_for(email)
            .expect("login should dispatch a code");
        let response = self
            .post("/verify-account")
            .json(&serde_json::json!({ "otp": code, "otpType": "login" }))
            .send()
            .await
            .expect("Failed to execute verify");
        assert_eq!(response.status(), reqwest::StatusCode::OK);
    }
}

/// Extract the value of a named cookie from a response's Set-Cookie
/// headers, if present.
pub fn set_cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .find_map(|value| {
            let raw = value.to_str().ok()?;
            let (pair, _) = raw.split_once(';')?;
            let (key, value) = pair.split_once('=')?;
            (key == name).then(|| value.to_string())
        })
}

/// Whether a response instructs the client to drop the named cookie.
pub fn clears_cookie(response: &reqwest::Response, name: &str) -> bool {
    response
        .headers()
        .get_all(reqwest::header::SET_COOKIE)
        .iter()
        .any(|value| {
            value
                .to_str()
                .map(|raw| raw.starts_with(&format!("{}=;", name)) && raw.contains("Max-Age=0"))
                .unwrap_or(false)
        })
}
