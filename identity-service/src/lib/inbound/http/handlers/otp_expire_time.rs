use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde_json::json;
use serde_json::Value;

use super::ApiError;
use super::ApiSuccess;
use crate::identity::errors::AuthError;
use crate::inbound::http::cookies;
use crate::inbound::http::router::AppState;

pub async fn otp_expire_time(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    // Authenticated callers have no pending challenge to poll.
    if cookies::cookie_value(&headers, cookies::ACCESS_TOKEN_COOKIE).is_some()
        || cookies::cookie_value(&headers, cookies::REFRESH_TOKEN_COOKIE).is_some()
    {
        return Ok(ApiSuccess::new(StatusCode::OK, "OTP expire time.", Value::Null).into_response());
    }

    let resend_token = cookies::cookie_value(&headers, cookies::RESEND_OTP_TOKEN_COOKIE)
        .ok_or(AuthError::InvalidResendToken)?;

    let expires_at = state
        .auth_service
        .otp_expire_time(&resend_token)
        .await
        .map_err(|e| match e {
            AuthError::TemporarilyBlocked { .. } => {
                ApiError::Forbidden("User blocked for 1 hour.".to_string())
            }
            other => ApiError::from(other),
        })?;

    Ok(ApiSuccess::new(StatusCode::OK, "OTP expire time.", json!(expires_at)).into_response())
}
