use axum::extract::State;
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
use crate::inbound::http::validation::decode_forgot_password;
use crate::inbound::http::validation::ForgotPasswordForm;

pub async fn forgot_password_email_submit(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordForm>,
) -> Result<Response, ApiError> {
    let email = decode_forgot_password(body).map_err(|errors| ApiError::Validation {
        tag: "forgot_email_submit_zod_validation_error",
        errors,
    })?;

    let tokens = state
        .auth_service
        .forgot_password(email)
        .await
        .map_err(|e| match e {
            AuthError::NotFound(_) => ApiError::NotFound("User not registered.".to_string()),
            AuthError::TemporarilyBlocked { .. } => ApiError::Forbidden(
                "Account is temporarily blocked. Try again later.".to_string(),
            ),
            other => ApiError::from(other),
        })?;

    let mut response = ApiSuccess::new(
        StatusCode::OK,
        "OTP sent to your email address.",
        json!({}),
    )
    .into_response();
    cookies::apply(
        &mut response,
        [
            cookies::set_cookie(
                cookies::VERIFY_TOKEN_COOKIE,
                &tokens.verify,
                state.cookie_secure,
            )?,
            cookies::set_cookie(
                cookies::RESEND_OTP_TOKEN_COOKIE,
                &tokens.resend_gate,
                state.cookie_secure,
            )?,
        ],
    );
    Ok(response)
}
