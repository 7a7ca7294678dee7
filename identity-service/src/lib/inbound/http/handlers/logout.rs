use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde_json::json;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::cookies;
use crate::inbound::http::router::AppState;

/// Purely advisory: instructs the cookie store to drop both session
/// credentials. There is no server-side invalidation; the short token
/// TTLs bound the window.
pub async fn logout(State(state): State<AppState>) -> Result<Response, ApiError> {
    let mut response =
        ApiSuccess::new(StatusCode::OK, "Logged out successfully.", json!({})).into_response();
    cookies::apply(
        &mut response,
        [
            cookies::clear_cookie(cookies::ACCESS_TOKEN_COOKIE, state.cookie_secure)?,
            cookies::clear_cookie(cookies::REFRESH_TOKEN_COOKIE, state.cookie_secure)?,
        ],
    );
    Ok(response)
}
