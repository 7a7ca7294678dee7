use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::identity::errors::OauthError;
use crate::identity::models::DisplayName;
use crate::identity::models::EmailAddress;
use crate::identity::models::OauthUserInfo;
use crate::identity::ports::OauthVerifier;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Verifies Google ID-token assertions against the tokeninfo endpoint.
///
/// Google validates the signature and expiry server-side; this adapter
/// checks that the token was minted for our client id and that the
/// asserted email is usable.
pub struct GoogleOauthVerifier {
    http: Client,
    client_id: String,
}

impl GoogleOauthVerifier {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            client_id: client_id.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    email: Option<String>,
    email_verified: Option<String>,
    name: Option<String>,
}

#[async_trait]
impl OauthVerifier for GoogleOauthVerifier {
    async fn verify_assertion(&self, assertion: &str) -> Result<OauthUserInfo, OauthError> {
        let response = self
            .http
            .get(TOKENINFO_URL)
            .query(&[("id_token", assertion)])
            .send()
            .await
            .map_err(|e| OauthError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OauthError::Verification(format!(
                "tokeninfo rejected assertion with status {}",
                response.status()
            )));
        }

        let info: TokenInfo = response
            .json()
            .await
            .map_err(|e| OauthError::Transport(e.to_string()))?;

        if info.aud != self.client_id {
            return Err(OauthError::Verification(
                "assertion audience does not match client id".to_string(),
            ));
        }
        if info.email_verified.as_deref() == Some("false") {
            return Err(OauthError::Verification(
                "asserted email is not verified".to_string(),
            ));
        }

        let email = info
            .email
            .ok_or_else(|| OauthError::Verification("assertion carries no email".to_string()))?;
        let name = info.name.unwrap_or_else(|| email.clone());

        let email = EmailAddress::new(email)
            .map_err(|e| OauthError::Verification(e.to_string()))?;
        let name = DisplayName::new(name)
            .map_err(|e| OauthError::Verification(e.to_string()))?;

        Ok(OauthUserInfo { name, email })
    }
}
