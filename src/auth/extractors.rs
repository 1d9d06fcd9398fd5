use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use time::OffsetDateTime;

use super::{
    error::AuthError,
    repo_types::User,
    resolver::{self, RequestIdentity},
};
use crate::state::AppState;

/// Identity placed by the middleware, or resolved here once and cached on
/// the request when the middleware is not in the stack.
async fn identity(parts: &mut Parts, state: &AppState) -> RequestIdentity {
    if let Some(id) = parts.extensions.get::<RequestIdentity>() {
        return id.clone();
    }
    let id = resolver::resolve(state, &parts.headers, OffsetDateTime::now_utc()).await;
    parts.extensions.insert(id.clone());
    id
}

/// Requires an authenticated user.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        identity(parts, state).await.require().map(CurrentUser)
    }
}

/// The user if one resolved. Bad credentials read as anonymous; only a
/// store failure rejects.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        identity(parts, state).await.into_user().map(MaybeUser)
    }
}

/// Requires an authenticated user with the admin role.
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = identity(parts, state).await.require()?;
        if !user.is_admin() {
            return Err(AuthError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}
