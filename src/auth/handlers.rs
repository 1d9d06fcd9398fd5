use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{ChangePasswordRequest, LoginRequest, PublicUser, RegisterRequest, TokenForm, TokenResponse},
        extractors::CurrentUser,
        resolver::verify_credentials,
        services::{change_password as change_user_password, expired_session_cookie, issue_token, register_user, session_cookie},
    },
    error::{ApiResult, Message, Success},
    extract::{ApiForm, ApiJson},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/token", post(token))
        .route("/auth/logout", post(logout))
        .route("/auth/password", put(change_password))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/whoami", get(whoami))
        .route("/auth/me", get(get_me))
}

#[instrument(skip(state, jar, payload), fields(username = %payload.username))]
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, CookieJar, Json<Success<TokenResponse>>)> {
    let user = register_user(&state, payload).await?;
    let token = issue_token(&state, &user)?;
    let jar = jar.add(session_cookie(&state, token.clone()));
    Ok((StatusCode::CREATED, jar, Success::new(TokenResponse::bearer(token))))
}

#[instrument(skip(state, jar, payload), fields(username = %payload.username))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> ApiResult<(CookieJar, Json<Success<TokenResponse>>)> {
    let user = verify_credentials(&state, &payload.username, &payload.password).await?;
    let token = issue_token(&state, &user)?;
    info!(user_id = %user.id, "user logged in");
    let jar = jar.add(session_cookie(&state, token.clone()));
    Ok((jar, Success::new(TokenResponse::bearer(token))))
}

/// OAuth2 password grant for API clients; answers with a bare token body.
#[instrument(skip(state, form), fields(username = %form.username))]
pub async fn token(
    State(state): State<AppState>,
    ApiForm(form): ApiForm<TokenForm>,
) -> ApiResult<Json<TokenResponse>> {
    let user = verify_credentials(&state, &form.username, &form.password).await?;
    let token = issue_token(&state, &user)?;
    info!(user_id = %user.id, "token issued");
    Ok(Json(TokenResponse::bearer(token)))
}

pub async fn logout(jar: CookieJar) -> (CookieJar, Json<Message>) {
    (jar.add(expired_session_cookie()), Message::new("Logged out"))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn whoami(CurrentUser(user): CurrentUser) -> Json<Success<String>> {
    Success::new(format!("Hello, {}", user.username))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<Success<PublicUser>> {
    Success::new(PublicUser::from(user))
}

#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<Message>> {
    change_user_password(&state, &user, payload.current_password, payload.new_password).await?;
    Ok(Message::new("Password changed"))
}
