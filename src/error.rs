use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Failure taxonomy for the HTTP surface.
///
/// Component-level errors (token codec, ledger, storage) are mapped into
/// these variants by the handlers; the body never carries internal detail.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Generic 401 for bad login credentials. Unknown email and wrong
    /// password must produce byte-identical responses.
    pub fn invalid_credentials() -> Self {
        Self::Unauthorized("Invalid credentials")
    }

    /// Generic 401 for any bearer-token failure. Expired, malformed and
    /// wrong-purpose tokens are indistinguishable to the caller.
    pub fn invalid_token() -> Self {
        Self::Unauthorized("Invalid or expired token")
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(anyhow::Error::new(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, (*msg).to_string()),
            ApiError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "message": message, "success": false }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let cases = [
            (ApiError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (ApiError::invalid_credentials(), StatusCode::UNAUTHORIZED),
            (
                ApiError::Conflict("dup".into()),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (
                ApiError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn login_failures_share_one_message() {
        // Both login failure paths must serialize the same body.
        let a = format!("{}", ApiError::invalid_credentials());
        let b = format!("{}", ApiError::invalid_credentials());
        assert_eq!(a, b);
        assert_eq!(a, "Invalid credentials");
    }
}
