// handlers/token.rs - POST /token/ and POST /token/refresh/

use axum::{body::Bytes, extract::State, response::Json};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::app::AppState;
use crate::auth::password::verify_password;
use crate::auth::{JwtError, TokenPair, REFRESH};
use crate::error::ApiError;
use crate::serializers::{parse_json_object, FieldErrors, REQUIRED};

/// Exchange username and password for an access/refresh pair
pub async fn obtain(State(state): State<AppState>, body: Bytes) -> Result<Json<TokenPair>, ApiError> {
    let data = parse_json_object(&body)?;
    let mut errors = FieldErrors::new();
    let username = required_string(&data, "username", &mut errors);
    let password = required_string(&data, "password", &mut errors);
    let (username, password) = errors.into_result((username, password))?;
    let (username, password) = (username.unwrap_or_default(), password.unwrap_or_default());

    let user = state
        .store
        .find_user_by_username(&username)
        .await?
        .filter(|u| u.is_active && verify_password(&password, &u.password_hash))
        .ok_or_else(|| {
            warn!(username = %username, "Rejected credentials");
            ApiError::unauthorized("No active account found with the given credentials")
        })?;

    let pair = state.tokens.issue_pair(user.id, &user.username).map_err(token_failure)?;
    info!(user_id = user.id, "Issued token pair");
    Ok(Json(pair))
}

/// Exchange a refresh token for a new access token
pub async fn refresh(State(state): State<AppState>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let data = parse_json_object(&body)?;
    let mut errors = FieldErrors::new();
    let token = required_string(&data, "refresh", &mut errors);
    let token = errors.into_result(token)?.unwrap_or_default();

    let claims = state.tokens.decode(&token, REFRESH).map_err(|e| {
        warn!("Rejected refresh token: {}", e);
        match e {
            JwtError::InvalidSecret => token_failure(e),
            _ => ApiError::unauthorized("Token is invalid or expired"),
        }
    })?;

    let user = state
        .store
        .find_user(claims.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::unauthorized("Token is invalid or expired"))?;

    let access = state.tokens.issue_access(user.id, &user.username).map_err(token_failure)?;
    Ok(Json(json!({ "access": access })))
}

fn required_string(data: &serde_json::Map<String, Value>, field: &str, errors: &mut FieldErrors) -> Option<String> {
    match data.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::String(_)) => {
            errors.add(field, "This field may not be blank.");
            None
        }
        Some(_) => {
            errors.add(field, "Not a valid string.");
            None
        }
        None => {
            errors.add(field, REQUIRED);
            None
        }
    }
}

fn token_failure(err: JwtError) -> ApiError {
    tracing::error!("Token issuance failed: {}", err);
    ApiError::internal_server_error("Could not issue token")
}
