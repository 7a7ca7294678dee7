use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde_json::json;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::cookies;
use crate::inbound::http::router::AppState;
use crate::inbound::http::validation::decode_signup;
use crate::inbound::http::validation::SignupForm;

pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupForm>,
) -> Result<Response, ApiError> {
    let command = decode_signup(body).map_err(|errors| ApiError::Validation {
        tag: "signup_zod_validation_error",
        errors,
    })?;

    let tokens = state.auth_service.register(command).await?;

    let mut response = ApiSuccess::new(
        StatusCode::CREATED,
        "Registration successful. Verify your account via OTP.",
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
