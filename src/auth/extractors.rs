use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::auth::claims::TokenPurpose;
use crate::auth::jwt::JwtKeys;
use crate::auth::repo_types::User;
use crate::error::ApiError;
use crate::state::AppState;

/// Extracts the bearer token, verifies it and resolves the subject to a user
/// record. The sole gate in front of profile routes.
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);

        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized("Missing Authorization header"))?;

        // Expect "Bearer <token>"
        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or(ApiError::Unauthorized("Invalid Authorization header"))?;

        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "bearer token rejected");
            ApiError::invalid_token()
        })?;

        if claims.purpose != TokenPurpose::Access {
            warn!(purpose = ?claims.purpose, "non-access token presented as bearer");
            return Err(ApiError::invalid_token());
        }

        let user = User::find_by_email(&state.db, &claims.sub)
            .await
            .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;

        // A vanished subject must be indistinguishable from a bad token.
        let user = user.ok_or_else(|| {
            warn!(sub = %claims.sub, "token subject no longer exists");
            ApiError::invalid_token()
        })?;

        Ok(AuthUser(user))
    }
}
