use auth::IssuedToken;
use axum::http::header;
use axum::http::header::InvalidHeaderValue;
use axum::http::HeaderMap;
use axum::http::HeaderValue;
use axum::response::Response;

/// Gates OTP submission endpoints.
pub const VERIFY_TOKEN_COOKIE: &str = "verifyToken";
/// Gates resend-OTP requests.
pub const RESEND_OTP_TOKEN_COOKIE: &str = "resendOtpToken";
/// Authorizes ordinary API calls.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
/// Used only to mint new access tokens.
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Extract a cookie value by name from the request headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get_all(header::COOKIE).iter().find_map(|value| {
        let raw = value.to_str().ok()?;
        raw.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    })
}

/// Build a `Set-Cookie` header for a freshly issued token.
///
/// Cookies are always `HttpOnly` with `Max-Age` matching the signed
/// expiry. Secure deployments get `SameSite=None; Secure` for cross-site
/// frontends; plain-HTTP development falls back to `SameSite=Lax`.
pub fn set_cookie(
    name: &str,
    token: &IssuedToken,
    secure: bool,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let attributes = if secure {
        "HttpOnly; Secure; SameSite=None"
    } else {
        "HttpOnly; SameSite=Lax"
    };
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; {}; Max-Age={}",
        name,
        token.token,
        attributes,
        token.max_age_secs()
    ))
}

/// Build a `Set-Cookie` header that drops the named cookie.
pub fn clear_cookie(name: &str, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let attributes = if secure {
        "HttpOnly; Secure; SameSite=None"
    } else {
        "HttpOnly; SameSite=Lax"
    };
    HeaderValue::from_str(&format!("{}=; Path=/; {}; Max-Age=0", name, attributes))
}

/// Append cookie headers to an outgoing response.
pub fn apply(response: &mut Response, values: impl IntoIterator<Item = HeaderValue>) {
    for value in values {
        response.headers_mut().append(header::SET_COOKIE, value);
    }
}
