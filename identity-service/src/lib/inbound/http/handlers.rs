use axum::http::header::InvalidHeaderValue;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use chrono::Duration;
use serde::Serialize;
use serde_json::json;
use serde_json::Value;

use crate::identity::errors::AuthError;
use crate::inbound::http::validation::FieldError;

pub mod forgot_password;
pub mod google;
pub mod login;
pub mod logout;
pub mod otp_expire_time;
pub mod profile;
pub mod resend_otp;
pub mod reset_password;
pub mod signup;
pub mod update_profile;
pub mod verify_account;

/// Success envelope: `{success, statusCode, message, data}`.
#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize>(StatusCode, Json<SuccessBody<T>>);

impl<T: Serialize> ApiSuccess<T> {
    pub fn new(status: StatusCode, message: &str, data: T) -> Self {
        ApiSuccess(
            status,
            Json(SuccessBody {
                success: true,
                status_code: status.as_u16(),
                message: message.to_string(),
                data,
            }),
        )
    }
}

impl<T: Serialize> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, Serialize)]
struct SuccessBody<T: Serialize> {
    success: bool,
    #[serde(rename = "statusCode")]
    status_code: u16,
    message: String,
    data: T,
}

/// Error envelope: `{success, statusCode, message, error}`.
///
/// Validation failures carry the fixed per-form tag as `message` and an
/// ordered `[{field, message}]` list as `error`; callers branch on the
/// tag, so both shapes are wire contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    InternalServerError(String),
    Validation {
        tag: &'static str,
        errors: Vec<FieldError>,
    },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation { tag, errors } => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    success: false,
                    status_code: None,
                    message: tag.to_string(),
                    error: json!(errors),
                },
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorBody::plain(400, msg)),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, ErrorBody::plain(401, msg)),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, ErrorBody::plain(403, msg)),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorBody::plain(404, msg)),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, ErrorBody::plain(409, msg)),
            ApiError::InternalServerError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorBody::plain(500, msg))
            }
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Clone, Serialize)]
struct ErrorBody {
    success: bool,
    #[serde(rename = "statusCode", skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    message: String,
    error: Value,
}

impl ErrorBody {
    fn plain(status_code: u16, message: String) -> Self {
        Self {
            success: false,
            status_code: Some(status_code),
            message,
            error: Value::Null,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotFound(_) => {
                ApiError::NotFound("User not found. Sign up to continue.".to_string())
            }
            AuthError::EmailAlreadyRegistered(_) => ApiError::Conflict(
                "Email already registered. Use another email or login.".to_string(),
            ),
            AuthError::LinkedToOauth => ApiError::BadRequest(
                "Email is linked to a Google account. Log in with Google.".to_string(),
            ),
            AuthError::LinkedToLocal => ApiError::BadRequest(
                "Email is linked to an Email account. Log in with Email & Password.".to_string(),
            ),
            AuthError::InvalidCredentials => {
                ApiError::BadRequest("Invalid email or password.".to_string())
            }
            AuthError::TemporarilyBlocked { remaining } => ApiError::Forbidden(format!(
                "Too many invalid OTP attempts. Try again after {}.",
                blocked_countdown(remaining)
            )),
            AuthError::InvalidCode => ApiError::BadRequest("Invalid OTP. Try again.".to_string()),
            AuthError::CodeExpired => ApiError::BadRequest("OTP expired. Resend OTP.".to_string()),
            AuthError::ResendTooSoon { remaining } => ApiError::BadRequest(format!(
                "Please wait {} before requesting a new OTP.",
                resend_countdown(remaining)
            )),
            AuthError::InvalidVerifyToken => ApiError::Unauthorized(
                "Invalid or expired OTP verification token. Resend OTP.".to_string(),
            ),
            AuthError::InvalidResendToken => ApiError::Unauthorized(
                "Invalid or expired OTP verification token. Sign up again.".to_string(),
            ),
            AuthError::SessionRequired => {
                ApiError::Forbidden("Please log in to continue.".to_string())
            }
            AuthError::SessionExpired => {
                ApiError::Unauthorized("Session expired. Log in again.".to_string())
            }
            AuthError::OauthAssertionMissing => ApiError::BadRequest(
                "Google login data is missing. Please try again.".to_string(),
            ),
            AuthError::Oauth(e) => {
                tracing::warn!(error = %e, "OAuth assertion rejected");
                ApiError::Unauthorized(
                    "Google sign-in could not be verified. Please try again.".to_string(),
                )
            }
            // Internals are logged server-side and never exposed beyond a
            // generic message.
            other => {
                tracing::error!(error = %other, "Auth operation failed");
                ApiError::InternalServerError("Internal server error.".to_string())
            }
        }
    }
}

impl From<InvalidHeaderValue> for ApiError {
    fn from(err: InvalidHeaderValue) -> Self {
        tracing::error!(error = %err, "Failed to build cookie header");
        ApiError::InternalServerError("Internal server error.".to_string())
    }
}

/// `HH:MM:SS` countdown with a pluralized trailing unit, for lockout
/// messages.
pub(crate) fn blocked_countdown(remaining: Duration) -> String {
    let total_secs = remaining.num_seconds().max(0);
    let hours = total_secs / 3600;
    let minutes = (total_secs / 60) % 60;
    let seconds = total_secs % 60;

    let unit = if hours > 1 {
        "hours"
    } else if hours == 1 {
        "hour"
    } else if minutes > 1 {
        "minutes"
    } else if minutes == 1 {
        "minute"
    } else if seconds > 1 {
        "seconds"
    } else {
        "second"
    };

    format!("{:02}:{:02}:{:02} {}", hours, minutes, seconds, unit)
}

/// `MM:SS` countdown with a pluralized trailing unit, for resend-wait
/// messages.
pub(crate) fn resend_countdown(remaining: Duration) -> String {
    let total_secs = remaining.num_seconds().max(0);
    let minutes = total_secs / 60;
    let seconds = total_secs % 60;

    let unit = if minutes > 1 {
        "minutes"
    } else if minutes == 1 {
        "minute"
    } else if seconds > 1 {
        "seconds"
    } else if seconds == 1 {
        "second"
    } else {
        "minutes"
    };

    format!("{:02}:{:02} {}", minutes, seconds, unit)
}
