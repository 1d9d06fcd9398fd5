use askama::Template;
use axum::{
    extract::rejection::FormRejection,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::QueryRejection;
use thiserror::Error;
use tracing::error;

use crate::{auth::error::AuthError, error::ApiError, pages::templates::ErrorTemplate};

/// Errors from HTML page handlers; rendered as an error page, never JSON.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Admin access required")]
    Forbidden,
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type PageResult<T> = Result<T, PageError>;

impl From<ApiError> for PageError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::NotFound(m) => PageError::NotFound(m),
            ApiError::BadRequest(m)
            | ApiError::Conflict(m)
            | ApiError::Unprocessable(m)
            | ApiError::Malformed(_, m) => PageError::BadRequest(m),
            ApiError::Auth(AuthError::Forbidden) => PageError::Forbidden,
            ApiError::Auth(AuthError::Store(e)) => PageError::Internal(anyhow::anyhow!("{e:#}")),
            ApiError::Auth(e) => PageError::BadRequest(e.to_string()),
            ApiError::Internal(e) => PageError::Internal(e),
        }
    }
}

impl From<AuthError> for PageError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err).into()
    }
}

impl From<FormRejection> for PageError {
    fn from(rejection: FormRejection) -> Self {
        PageError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for PageError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::from(rejection).into()
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            PageError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            PageError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            PageError::Forbidden => (StatusCode::FORBIDDEN, self.to_string()),
            PageError::Template(e) => {
                error!(error = %e, "template render failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
            }
            PageError::Internal(e) => {
                error!(error = %e, "page handler failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
            }
        };

        let page = ErrorTemplate {
            status: status.as_u16(),
            message: &message,
        };
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(_) => (status, message).into_response(),
        }
    }
}
