use std::sync::Arc;

use auth::TokenService;
use identity_service::config::Config;
use identity_service::domain::identity::service::AuthService;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::notifier::SmtpNotifier;
use identity_service::outbound::oauth::GoogleOauthVerifier;
use identity_service::outbound::repositories::PostgresIdentityRepository;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        cookie_secure = config.server.cookie_secure,
        smtp_host = %config.mail.smtp_host,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = 5,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let token_service = Arc::new(TokenService::new(&config.tokens.to_token_config()));
    let repository = Arc::new(PostgresIdentityRepository::new(pg_pool));
    let notifier = Arc::new(SmtpNotifier::new(&config.mail)?);
    let oauth = Arc::new(GoogleOauthVerifier::new(&config.oauth.google_client_id));

    let auth_service = Arc::new(AuthService::new(
        repository,
        notifier,
        oauth,
        Arc::clone(&token_service),
    ));

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let application = create_router(
        auth_service,
        token_service,
        config.server.cookie_secure,
    );
    axum::serve(http_listener, application).await?;

    Ok(())
}
