use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::{auth::jwt::TokenError, error::ErrorBody};

/// Why a request could not be tied to a user.
///
/// Every variant except `Forbidden` and `Store` is an expected, recoverable
/// outcome answered with 401. Login failures all collapse into
/// `InvalidCredentials` so the response does not reveal whether the
/// username exists.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Token expired")]
    Expired,
    #[error("Invalid token")]
    InvalidToken,
    #[error("User not found")]
    UserNotFound,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Admin access required")]
    Forbidden,
    #[error("credential store error: {0}")]
    Store(Arc<anyhow::Error>),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::Forbidden => StatusCode::FORBIDDEN,
            AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn store(err: anyhow::Error) -> Self {
        AuthError::Store(Arc::new(err))
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::Expired,
            TokenError::Invalid => AuthError::InvalidToken,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            AuthError::Store(e) => {
                error!(error = %e, "credential store failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let mut res = (status, Json(ErrorBody { detail })).into_response();
        if status == StatusCode::UNAUTHORIZED {
            res.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_failure_kind() {
        assert_eq!(AuthError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Expired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AuthError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::store(anyhow::anyhow!("db down")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn detail_strings_are_stable() {
        assert_eq!(AuthError::Unauthenticated.to_string(), "Not authenticated");
        assert_eq!(AuthError::Expired.to_string(), "Token expired");
        assert_eq!(AuthError::InvalidToken.to_string(), "Invalid token");
        assert_eq!(AuthError::UserNotFound.to_string(), "User not found");
        assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid credentials");
    }

    #[test]
    fn token_errors_map_onto_auth_errors() {
        assert!(matches!(AuthError::from(TokenError::Expired), AuthError::Expired));
        assert!(matches!(AuthError::from(TokenError::Invalid), AuthError::InvalidToken));
    }

    #[test]
    fn unauthorized_responses_advertise_bearer() {
        let res = AuthError::InvalidToken.into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.headers()[axum::http::header::WWW_AUTHENTICATE], "Bearer");

        let res = AuthError::Forbidden.into_response();
        assert!(res.headers().get(axum::http::header::WWW_AUTHENTICATE).is_none());
    }
}
