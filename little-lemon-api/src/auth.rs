use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation};
use little_lemon_service::{Caller, ServiceError, users::load_caller};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::ApiError,
    handlers::{AppState, with_connection},
};

/// Access token claims, as issued by the identity service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize,
    pub iat: usize,
    pub sub: String,
}

/// Verifies an HS256 token and returns the user it was issued to.
pub fn decode_token(token: &str, key: &DecodingKey) -> Result<Uuid, ApiError> {
    let token = jsonwebtoken::decode::<Claims>(token, key, &Validation::default()).map_err(|e| {
        debug!(error = %e, "rejected token");
        ApiError::InvalidToken
    })?;
    Uuid::parse_str(&token.claims.sub).map_err(|_| ApiError::InvalidToken)
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(ApiError::MissingToken)?
        .to_str()
        .map_err(|_| ApiError::InvalidToken)?;
    header
        .strip_prefix("Bearer ")
        .ok_or(ApiError::InvalidToken)
}

/// The caller behind a request carrying a valid bearer token.
pub struct Authenticated(pub Caller);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = decode_token(bearer_token(parts)?, &state.decoding_key)?;
        let caller = with_connection(&state.pool, move |conn| load_caller(conn, user_id))
            .await
            .map_err(|err| match err {
                ApiError::Service(ServiceError::NotFound(_)) => ApiError::InvalidToken,
                err => err,
            })?;
        Ok(Authenticated(caller))
    }
}
