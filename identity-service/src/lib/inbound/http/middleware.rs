use auth::IssuedToken;
use auth::TokenKind;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use crate::identity::errors::AuthError;
use crate::identity::models::AuthenticatedIdentity;
use crate::identity::models::IdentityId;
use crate::identity::models::Role;
use crate::inbound::http::cookies;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::router::AppState;

/// Session middleware: maps inbound cookie credentials to an
/// authenticated identity.
///
/// Both the access and refresh cookies must be present to skip renewal.
/// If the access credential is missing or fails verification, a valid
/// refresh credential silently mints a replacement access token (appended
/// to the response as a fresh cookie); without a valid refresh credential
/// the request fails closed. The resolved identity is exposed to handlers
/// with sensitive fields stripped.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let access = cookies::cookie_value(req.headers(), cookies::ACCESS_TOKEN_COOKIE);
    let refresh = cookies::cookie_value(req.headers(), cookies::REFRESH_TOKEN_COOKIE);

    let verified_access = match (&access, &refresh) {
        (Some(token), Some(_)) => state.token_service.verify(TokenKind::Access, token).ok(),
        _ => None,
    };

    let mut minted: Option<IssuedToken> = None;
    let subject = match verified_access {
        Some(claims) => claims.sub,
        None => {
            let refresh_token = refresh.ok_or_else(|| {
                ApiError::from(AuthError::SessionRequired).into_response()
            })?;
            let claims = state
                .token_service
                .verify(TokenKind::Refresh, &refresh_token)
                .map_err(|_| ApiError::from(AuthError::SessionExpired).into_response())?;
            let token = state
                .token_service
                .issue(TokenKind::Access, &claims.sub, None)
                .map_err(|e| {
                    ApiError::from(AuthError::TokenSigning(e.to_string())).into_response()
                })?;
            tracing::debug!(identity_id = %claims.sub, "Access token silently renewed");
            minted = Some(token);
            claims.sub
        }
    };

    let id = IdentityId::from_string(&subject)
        .map_err(|_| ApiError::from(AuthError::SessionExpired).into_response())?;

    let identity = state
        .auth_service
        .authenticated_identity(&id)
        .await
        .map_err(|e| match e {
            AuthError::NotFound(_) => {
                ApiError::NotFound("User not found.".to_string()).into_response()
            }
            other => ApiError::from(other).into_response(),
        })?;

    req.extensions_mut().insert(identity);

    let mut response = next.run(req).await;
    if let Some(token) = minted {
        if let Ok(value) = cookies::set_cookie(
            cookies::ACCESS_TOKEN_COOKIE,
            &token,
            state.cookie_secure,
        ) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    Ok(response)
}

/// Admin gate layered on top of [`authenticate`]: a pure role-equality
/// check, not a separate session concept.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, Response> {
    match req.extensions().get::<AuthenticatedIdentity>() {
        None => Err(ApiError::Unauthorized("Unauthorized. No user found.".to_string())
            .into_response()),
        Some(identity) if identity.role != Role::Admin => Err(ApiError::Forbidden(
            "Sorry, this action is restricted to admin users.".to_string(),
        )
        .into_response()),
        Some(_) => Ok(next.run(req).await),
    }
}
