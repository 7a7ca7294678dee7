use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Extension;
use axum::Json;
use serde_json::json;

use super::ApiError;
use super::ApiSuccess;
use crate::identity::errors::AuthError;
use crate::identity::models::AuthenticatedIdentity;
use crate::inbound::http::router::AppState;
use crate::inbound::http::validation::decode_update_profile;
use crate::inbound::http::validation::UpdateProfileForm;

pub async fn update_profile(
    State(state): State<AppState>,
    Extension(identity): Extension<AuthenticatedIdentity>,
    Json(body): Json<UpdateProfileForm>,
) -> Result<Response, ApiError> {
    let name = decode_update_profile(body).map_err(|errors| ApiError::Validation {
        tag: "update_zod_validation_error",
        errors,
    })?;

    state
        .auth_service
        .update_profile(&identity.id, name)
        .await
        .map_err(|e| match e {
            AuthError::NotFound(_) => ApiError::NotFound("User not found.".to_string()),
            other => ApiError::from(other),
        })?;

    Ok(ApiSuccess::new(StatusCode::OK, "User profile updated.", json!({})).into_response())
}
