use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;

use super::ApiError;
use super::ApiSuccess;
use crate::identity::errors::AuthError;
use crate::inbound::http::cookies;
use crate::inbound::http::router::AppState;
use crate::inbound::http::validation::decode_reset_password;
use crate::inbound::http::validation::ResetPasswordForm;

pub async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ResetPasswordForm>,
) -> Result<Response, ApiError> {
    let data = decode_reset_password(body).map_err(|errors| ApiError::Validation {
        tag: "reset_password_zod_validation_error",
        errors,
    })?;

    let verify_token = cookies::cookie_value(&headers, cookies::VERIFY_TOKEN_COOKIE)
        .ok_or(AuthError::InvalidVerifyToken)?;

    state
        .auth_service
        .reset_password(&verify_token, &data.otp, &data.password)
        .await?;

    // The caller still has to log in with the new password; no session
    // tokens are issued here.
    let mut response = ApiSuccess::new(
        StatusCode::OK,
        "Password reset successfully. You can now log in.",
        json!({}),
    )
    .into_response();
    cookies::apply(
        &mut response,
        [
            cookies::clear_cookie(cookies::VERIFY_TOKEN_COOKIE, state.cookie_secure)?,
            cookies::clear_cookie(cookies::RESEND_OTP_TOKEN_COOKIE, state.cookie_secure)?,
        ],
    );
    Ok(response)
}
