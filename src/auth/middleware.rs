use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use time::OffsetDateTime;

use crate::{auth::resolver, state::AppState};

/// Resolves the caller once and stores the [`resolver::RequestIdentity`] in
/// the request extensions. Never rejects: handlers that need a user ask for
/// one through the extractors.
pub async fn identity_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let identity = resolver::resolve(&state, req.headers(), OffsetDateTime::now_utc()).await;
    if let Some(user) = identity.user() {
        tracing::Span::current().record("user_id", tracing::field::display(user.id));
    }
    req.extensions_mut().insert(identity);
    next.run(req).await
}
