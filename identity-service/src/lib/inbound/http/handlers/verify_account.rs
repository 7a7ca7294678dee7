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
use crate::identity::models::OtpPurpose;
use crate::inbound::http::cookies;
use crate::inbound::http::router::AppState;
use crate::inbound::http::validation::decode_verify;
use crate::inbound::http::validation::OtpForm;

pub async fn verify_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<OtpForm>,
) -> Result<Response, ApiError> {
    let data = decode_verify(body).map_err(|errors| ApiError::Validation {
        tag: "verify_zod_validation_error",
        errors,
    })?;

    let purpose = match data.otp_type.as_str() {
        "signup" => OtpPurpose::Signup,
        "login" => OtpPurpose::Login,
        _ => return Err(ApiError::InternalServerError("Something went wrong.".to_string())),
    };

    let verify_token = cookies::cookie_value(&headers, cookies::VERIFY_TOKEN_COOKIE)
        .ok_or(AuthError::InvalidVerifyToken)?;

    let outcome = state
        .auth_service
        .verify_account(&verify_token, &data.otp, purpose)
        .await?;

    let message = match outcome.session {
        Some(_) => "Account verified successfully. You are now logged in.",
        None => "Account verified successfully. Login now.",
    };

    let mut response = ApiSuccess::new(
        StatusCode::OK,
        message,
        json!({ "verifyFrom": purpose.as_str() }),
    )
    .into_response();

    let mut set = vec![
        cookies::clear_cookie(cookies::VERIFY_TOKEN_COOKIE, state.cookie_secure)?,
        cookies::clear_cookie(cookies::RESEND_OTP_TOKEN_COOKIE, state.cookie_secure)?,
    ];
    if let Some(session) = outcome.session {
        set.push(cookies::set_cookie(
            cookies::ACCESS_TOKEN_COOKIE,
            &session.access,
            state.cookie_secure,
        )?);
        set.push(cookies::set_cookie(
            cookies::REFRESH_TOKEN_COOKIE,
            &session.refresh,
            state.cookie_secure,
        )?);
    }
    cookies::apply(&mut response, set);
    Ok(response)
}
