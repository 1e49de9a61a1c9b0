//! Bearer token authentication

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};

use crate::app::AppState;
use crate::players::{Player, Token};

/// Extract the credential from an Authorization header value
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ").map(str::trim)
}

/// Authentication error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header is missing")]
    MissingHeader,

    #[error("Authorization header is not a bearer token")]
    InvalidFormat,

    #[error("Bearer token is malformed: {0}")]
    Malformed(#[from] crate::players::TokenError),

    #[error("Player token has not been found")]
    UnknownToken,
}

impl AuthError {
    fn code(&self) -> &'static str {
        match self {
            AuthError::UnknownToken => "unknownToken",
            _ => "invalidToken",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Caller identity, inserted into request extensions by `require_token`
#[derive(Debug, Clone)]
pub struct AuthenticatedPlayer {
    pub player: Player,
}

/// Middleware to require a known player token
pub async fn require_token(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingHeader)?;

    let raw = extract_bearer_token(auth_header).ok_or(AuthError::InvalidFormat)?;
    let token = Token::parse(raw)?;

    let player = state
        .engine
        .authenticate(&token)
        .map_err(|_| AuthError::UnknownToken)?;

    request
        .extensions_mut()
        .insert(AuthenticatedPlayer { player });

    Ok(next.run(request).await)
}
