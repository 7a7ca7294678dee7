use std::env;

use auth::TokenConfig;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub tokens: TokenSecretsConfig,
    pub mail: MailConfig,
    pub oauth: OauthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    /// Issue `Secure; SameSite=None` cookies. Disable only for plain-HTTP
    /// development.
    #[serde(default = "default_cookie_secure")]
    pub cookie_secure: bool,
}

fn default_cookie_secure() -> bool {
    true
}

/// One signing secret per token kind; TTLs are fixed by the token service.
#[derive(Debug, Deserialize, Clone)]
pub struct TokenSecretsConfig {
    pub verify_secret: String,
    pub resend_otp_secret: String,
    pub access_secret: String,
    pub refresh_secret: String,
}

impl TokenSecretsConfig {
    pub fn to_token_config(&self) -> TokenConfig {
        TokenConfig::with_secrets(
            &self.verify_secret,
            &self.resend_otp_secret,
            &self.access_secret,
            &self.refresh_secret,
        )
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OauthConfig {
    pub google_client_id: String,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default").required(false))
            // Layer on environment-specific configuration
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Layer on environment variables (with __ as separator)
            // Example: DATABASE__URL=postgres://... overrides database.url
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;

        Ok(config)
    }
}
