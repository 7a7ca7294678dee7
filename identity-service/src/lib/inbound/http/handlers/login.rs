use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;

use super::blocked_countdown;
use super::ApiError;
use super::ApiSuccess;
use crate::identity::errors::AuthError;
use crate::inbound::http::cookies;
use crate::inbound::http::router::AppState;
use crate::inbound::http::validation::decode_login;
use crate::inbound::http::validation::LoginForm;

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginForm>,
) -> Result<Response, ApiError> {
    let command = decode_login(body).map_err(|errors| ApiError::Validation {
        tag: "login_zod_validation_error",
        errors,
    })?;

    let tokens = state
        .auth_service
        .login(command)
        .await
        .map_err(|e| match e {
            AuthError::NotFound(_) => {
                ApiError::NotFound("User not found. Sign up first.".to_string())
            }
            AuthError::TemporarilyBlocked { remaining } => ApiError::Forbidden(format!(
                "Account is temporarily blocked. Try again after {}.",
                blocked_countdown(remaining)
            )),
            other => ApiError::from(other),
        })?;

    let mut response = ApiSuccess::new(
        StatusCode::OK,
        "OTP sent to your email. Verify to continue.",
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
