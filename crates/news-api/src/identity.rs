use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use news_types::api::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, taken from the `Authorization: Bearer` header.
///
/// Handlers that write take this as an argument and hand `id()` on to the
/// ownership policy and validators; nothing looks the caller up on its own.
#[derive(Debug, Clone)]
pub struct Identity(pub Claims);

impl Identity {
    pub fn id(&self) -> Uuid {
        self.0.sub
    }

    pub fn username(&self) -> &str {
        &self.0.username
    }
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        decode_claims(&parts.headers, &state.jwt_secret).map(Identity)
    }
}

/// Extract and validate JWT from Authorization header.
pub fn decode_claims(headers: &HeaderMap, secret: &str) -> Result<Claims, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthenticated)?;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthenticated)?;

    Ok(token_data.claims)
}
