use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Extension;
use serde_json::json;

use super::ApiError;
use super::ApiSuccess;
use crate::identity::models::AuthenticatedIdentity;

pub async fn profile(
    Extension(identity): Extension<AuthenticatedIdentity>,
) -> Result<Response, ApiError> {
    Ok(ApiSuccess::new(
        StatusCode::OK,
        "User profile data.",
        json!({
            "name": identity.name,
            "email": identity.email,
            "role": identity.role.as_str(),
        }),
    )
    .into_response())
}
