//! Page-side extractors. Failures render the HTML error page.

use axum::{
    async_trait,
    extract::{rejection::FormRejection, FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Form,
};
use axum_extra::extract::{Query, QueryRejection};

use crate::{
    auth::{extractors::MaybeUser, repo_types::User},
    pages::error::PageError,
    state::AppState,
};

/// The signed-in user, if any, for the nav bar and page gating.
pub struct Visitor(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for Visitor {
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let MaybeUser(user) = MaybeUser::from_request_parts(parts, state).await?;
        Ok(Visitor(user))
    }
}

pub struct PageForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for PageForm<T>
where
    Form<T>: FromRequest<S, Rejection = FormRejection>,
    S: Send + Sync,
{
    type Rejection = PageError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state).await?;
        Ok(PageForm(value))
    }
}

pub struct PageQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for PageQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = PageError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(PageQuery(value))
    }
}
