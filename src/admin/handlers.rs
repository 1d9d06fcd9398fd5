use axum::{
    extract::{Path, State},
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    admin::repo::{self, OrderStats},
    auth::extractors::AdminUser,
    error::{ApiError, ApiResult, Message, Success},
    shop::services::parse_id,
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/stats", get(stats))
        .route("/admin/product/:id", delete(delete_product))
}

#[instrument(skip(state, admin), fields(user_id = %admin.id))]
pub async fn stats(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> ApiResult<Json<Success<OrderStats>>> {
    Ok(Success::new(repo::order_stats(&state.db).await?))
}

#[instrument(skip(state, admin), fields(user_id = %admin.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Message>> {
    let id = parse_id(&id, "Product")?;
    if !repo::delete_product(&state.db, id).await? {
        return Err(ApiError::NotFound("Product not found".into()));
    }
    info!(product_id = %id, "product deleted");
    Ok(Message::new("Product deleted"))
}
