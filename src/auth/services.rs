use axum_extra::extract::cookie::{Cookie, SameSite};
use lazy_static::lazy_static;
use regex::Regex;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::RegisterRequest,
        error::AuthError,
        repo_types::{NewUser, User},
        resolver::AUTH_COOKIE,
    },
    error::{ApiError, ApiResult},
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Trims and checks a registration payload in place.
pub fn normalize_registration(req: &mut RegisterRequest) -> ApiResult<()> {
    req.username = req.username.trim().to_string();
    req.email = req.email.trim().to_lowercase();
    req.first_name = req.first_name.trim().to_string();
    req.last_name = non_empty(req.last_name.take());
    req.phone_number = non_empty(req.phone_number.take());

    if req.username.is_empty() {
        return Err(ApiError::BadRequest("Username is required".into()));
    }
    if req.first_name.is_empty() {
        return Err(ApiError::BadRequest("First name is required".into()));
    }
    if !is_valid_email(&req.email) {
        warn!(email = %req.email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    check_password_strength(&req.password)
}

fn check_password_strength(password: &str) -> ApiResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(ApiError::BadRequest("Password too short".into()));
    }
    Ok(())
}

/// Validates, hashes and stores a new customer account.
pub async fn register_user(state: &AppState, mut req: RegisterRequest) -> ApiResult<User> {
    normalize_registration(&mut req)?;

    let password_hash = state.passwords.hash(req.password).await?;
    let user = state
        .users
        .create(NewUser {
            username: req.username,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            password_hash,
            phone_number: req.phone_number,
        })
        .await?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

pub fn issue_token(state: &AppState, user: &User) -> ApiResult<String> {
    Ok(state.keys.issue(user.id, OffsetDateTime::now_utc())?)
}

/// HttpOnly cookie holding the session token for browser clients.
pub fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(state.keys.ttl())
        .secure(state.config.cookie_secure)
        .build()
}

/// Overwrites the session cookie with an empty one that expires at once.
pub fn expired_session_cookie() -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, ""))
        .http_only(true)
        .path("/")
        .max_age(time::Duration::ZERO)
        .build()
}

pub async fn change_password(
    state: &AppState,
    user: &User,
    current: String,
    new: String,
) -> ApiResult<()> {
    let ok = state
        .passwords
        .verify(&user.username, current, user.password_hash.clone())
        .await;
    if !ok {
        warn!(user_id = %user.id, "password change with wrong current password");
        return Err(AuthError::InvalidCredentials.into());
    }
    check_password_strength(&new)?;

    let hash = state.passwords.hash(new).await?;
    if !state.users.update_password_hash(user.id, &hash).await? {
        return Err(AuthError::UserNotFound.into());
    }
    info!(user_id = %user.id, "password changed");
    Ok(())
}
