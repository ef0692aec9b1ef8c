use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::app::AppState;
use crate::auth::{JwtError, Principal, UserPrincipal, ACCESS};
use crate::error::ApiError;

/// Resolve the request principal from an optional bearer token.
///
/// No token means `Principal::Anonymous`. A token that is present but
/// invalid, expired, or bound to an inactive or deleted user is a 401 on
/// every endpoint, reads included.
pub async fn resolve_principal(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let principal = match extract_bearer(request.headers())? {
        None => Principal::Anonymous,
        Some(token) => {
            let claims = state.tokens.decode(&token, ACCESS).map_err(|e| {
                tracing::warn!("Rejected bearer token: {}", e);
                match e {
                    JwtError::InvalidSecret => ApiError::internal_server_error("Token verification unavailable"),
                    _ => ApiError::unauthorized("Given token not valid for any token type"),
                }
            })?;

            let user = state
                .store
                .find_user(claims.user_id)
                .await?
                .filter(|u| u.is_active)
                .ok_or_else(|| {
                    tracing::warn!(user_id = claims.user_id, "Token for unknown or inactive user");
                    ApiError::unauthorized("User not found")
                })?;

            Principal::User(UserPrincipal::from(&user))
        }
    };

    tracing::debug!(principal = principal.username().unwrap_or("anonymous"), "resolved principal");
    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Bearer token from the Authorization header. Other schemes are ignored.
fn extract_bearer(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    let Some(auth_header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    let mut parts = auth_str.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(Some(token.to_string())),
        (Some(scheme), _, _) if scheme.eq_ignore_ascii_case("bearer") => Err(ApiError::unauthorized(
            "Authorization header must contain two space-delimited values",
        )),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_bearer_tokens() {
        assert_eq!(extract_bearer(&HeaderMap::new()).unwrap(), None);
        assert_eq!(extract_bearer(&headers("Bearer abc.def")).unwrap().as_deref(), Some("abc.def"));
        assert_eq!(extract_bearer(&headers("Basic dXNlcg==")).unwrap(), None);
        assert!(extract_bearer(&headers("Bearer")).is_err());
        assert!(extract_bearer(&headers("Bearer a b")).is_err());
    }
}
