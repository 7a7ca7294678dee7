use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use serde_json::json;

use super::ApiError;
use super::ApiSuccess;
use crate::identity::errors::AuthError;
use crate::inbound::http::cookies;
use crate::inbound::http::router::AppState;

pub async fn resend_otp(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let resend_token = cookies::cookie_value(&headers, cookies::RESEND_OTP_TOKEN_COOKIE)
        .ok_or(AuthError::InvalidResendToken)?;

    let verify = state.auth_service.resend_otp(&resend_token).await?;

    // Only the verify token is reissued; the resend-gate cookie keeps its
    // original expiry.
    let mut response = ApiSuccess::new(
        StatusCode::OK,
        "A new OTP has been sent successfully.",
        json!({}),
    )
    .into_response();
    cookies::apply(
        &mut response,
        [cookies::set_cookie(
            cookies::VERIFY_TOKEN_COOKIE,
            &verify,
            state.cookie_secure,
        )?],
    );
    Ok(response)
}
