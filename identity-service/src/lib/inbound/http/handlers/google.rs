use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::cookies;
use crate::inbound::http::router::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleLoginRequest {
    pub token: Option<String>,
}

pub async fn google_login(
    State(state): State<AppState>,
    Json(body): Json<GoogleLoginRequest>,
) -> Result<Response, ApiError> {
    let assertion = body.token.unwrap_or_default();

    let session = state.auth_service.oauth_login(&assertion).await?;

    let mut response =
        ApiSuccess::new(StatusCode::OK, "Logged in successfully.", json!({})).into_response();
    cookies::apply(
        &mut response,
        [
            cookies::set_cookie(
                cookies::ACCESS_TOKEN_COOKIE,
                &session.access,
                state.cookie_secure,
            )?,
            cookies::set_cookie(
                cookies::REFRESH_TOKEN_COOKIE,
                &session.refresh,
                state.cookie_secure,
            )?,
        ],
    );
    Ok(response)
}
