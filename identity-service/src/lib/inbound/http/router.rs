use std::sync::Arc;
use std::time::Duration;

use auth::TokenService;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::forgot_password::forgot_password_email_submit;
use super::handlers::google::google_login;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::otp_expire_time::otp_expire_time;
use super::handlers::profile::profile;
use super::handlers::resend_otp::resend_otp;
use super::handlers::reset_password::reset_password;
use super::handlers::signup::signup;
use super::handlers::update_profile::update_profile;
use super::handlers::verify_account::verify_account;
use super::middleware::authenticate as auth_middleware;
use crate::identity::ports::AuthServicePort;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthServicePort>,
    pub token_service: Arc<TokenService>,
    /// Whether issued cookies carry `Secure; SameSite=None`. Off only for
    /// plain-HTTP development setups.
    pub cookie_secure: bool,
}

pub fn create_router(
    auth_service: Arc<dyn AuthServicePort>,
    token_service: Arc<TokenService>,
    cookie_secure: bool,
) -> Router {
    let state = AppState {
        auth_service,
        token_service,
        cookie_secure,
    };

    let public_routes = Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/google", post(google_login))
        .route("/verify-account", post(verify_account))
        .route("/resend-otp", post(resend_otp))
        .route("/otp-expire-time", get(otp_expire_time))
        .route("/forgot-password-email-submit", post(forgot_password_email_submit))
        .route("/reset-password", post(reset_password))
        .route("/logout", post(logout));

    let protected_routes = Router::new()
        .route("/update-profile", put(update_profile))
        .route("/profile", get(profile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(trace_layer)
        // Credentials ride on cross-site cookies, so the CORS layer must
        // mirror the origin rather than wildcard it.
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}
