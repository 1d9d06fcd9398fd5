//! Maps request credentials onto a user.
//!
//! [`resolve`] returns a [`RequestIdentity`]; the hard reading
//! ([`RequestIdentity::require`]) and the soft one
//! ([`RequestIdentity::into_user`]) are chosen by the caller.

use axum::http::{header, HeaderMap};
use axum_extra::extract::CookieJar;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::{
    auth::{error::AuthError, repo_types::User},
    state::AppState,
};

/// Cookie carrying the session token. Checked before the Authorization header.
pub const AUTH_COOKIE: &str = "Authorization-Token";

/// Outcome of identity resolution for one request.
#[derive(Debug, Clone)]
pub enum RequestIdentity {
    Identified(User),
    /// No credential was presented.
    Anonymous,
    /// A credential was presented but did not resolve to a user.
    Rejected(AuthError),
}

impl RequestIdentity {
    pub fn user(&self) -> Option<&User> {
        match self {
            RequestIdentity::Identified(u) => Some(u),
            _ => None,
        }
    }

    /// Soft reading: rejected credentials count as anonymous. A store
    /// failure is still an error.
    pub fn into_user(self) -> Result<Option<User>, AuthError> {
        match self {
            RequestIdentity::Identified(u) => Ok(Some(u)),
            RequestIdentity::Anonymous => Ok(None),
            RequestIdentity::Rejected(e @ AuthError::Store(_)) => Err(e),
            RequestIdentity::Rejected(e) => {
                debug!(error = %e, "credential ignored");
                Ok(None)
            }
        }
    }

    pub fn require(self) -> Result<User, AuthError> {
        match self {
            RequestIdentity::Identified(u) => Ok(u),
            RequestIdentity::Anonymous => Err(AuthError::Unauthenticated),
            RequestIdentity::Rejected(e) => Err(e),
        }
    }
}

/// Token from the `Authorization-Token` cookie, else from `Authorization: Bearer`.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(c) = jar.get(AUTH_COOKIE) {
        let value = c.value().trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

pub async fn resolve(state: &AppState, headers: &HeaderMap, now: OffsetDateTime) -> RequestIdentity {
    match extract_token(headers) {
        Some(token) => resolve_token(state, &token, now).await,
        None => RequestIdentity::Anonymous,
    }
}

pub async fn resolve_token(state: &AppState, token: &str, now: OffsetDateTime) -> RequestIdentity {
    let user_id = match state.keys.verify(token, now) {
        Ok(id) => id,
        Err(e) => return RequestIdentity::Rejected(e.into()),
    };

    match state.users.find_by_id(user_id).await {
        Ok(Some(user)) => RequestIdentity::Identified(user),
        Ok(None) => {
            debug!(%user_id, "token subject no longer exists");
            RequestIdentity::Rejected(AuthError::UserNotFound)
        }
        Err(e) => RequestIdentity::Rejected(AuthError::store(e)),
    }
}

/// Password path used by login and registration flows. Unknown usernames and
/// wrong passwords are indistinguishable to the caller.
pub async fn verify_credentials(
    state: &AppState,
    username: &str,
    password: &str,
) -> Result<User, AuthError> {
    let user = state
        .users
        .find_by_username(username)
        .await
        .map_err(AuthError::store)?;

    let Some(user) = user else {
        state.passwords.verify_dummy(password.to_string()).await;
        warn!(%username, "login unknown username");
        return Err(AuthError::InvalidCredentials);
    };

    let ok = state
        .passwords
        .verify(&user.username, password.to_string(), user.password_hash.clone())
        .await;
    if !ok {
        warn!(%username, user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    Ok(user)
}
