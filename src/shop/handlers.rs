use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::extractors::CurrentUser,
    error::{ApiResult, Message, Success},
    extract::{ApiJson, ApiQuery},
    shop::{
        dto::{CartLineUpdated, CartQuery, CartView, ProductDetails, ProductQuery, ReviewCreated, ReviewRequest},
        repo,
        repo_types::{Category, Product},
        services::{self, parse_id},
    },
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/shop/product_categories", get(list_categories))
        .route("/shop/product_brands", get(list_brands))
        .route("/shop/products", get(list_products))
        .route("/shop/product/:id", get(get_product))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/shop/product/:id/review", post(add_review))
        .route("/shop/product/:id/:review_id/review", patch(edit_review))
        .route("/shop/cart", get(get_cart))
        .route(
            "/shop/cart/:product_id",
            put(add_to_cart).patch(update_cart).delete(remove_from_cart),
        )
}

#[instrument(skip(state))]
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Json<Success<Vec<Category>>>> {
    Ok(Success::new(repo::list_categories(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn list_brands(State(state): State<AppState>) -> ApiResult<Json<Success<Vec<String>>>> {
    Ok(Success::new(repo::list_brands(&state.db).await?))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<ProductQuery>,
) -> ApiResult<Json<Success<Vec<Product>>>> {
    let filter = services::product_filter(q)?;
    Ok(Success::new(repo::list_products(&state.db, &filter).await?))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Success<ProductDetails>>> {
    let id = parse_id(&id, "Product")?;
    Ok(Success::new(services::product_details(&state, id).await?))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn add_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ReviewRequest>,
) -> ApiResult<(StatusCode, Json<ReviewCreated>)> {
    let product_id = parse_id(&id, "Product")?;
    let review_id = services::add_review(&state, user.id, product_id, body).await?;
    Ok((
        StatusCode::CREATED,
        Json(ReviewCreated {
            status: "success",
            message: "Review added",
            review_id,
        }),
    ))
}

#[instrument(skip(state, user, body), fields(user_id = %user.id))]
pub async fn edit_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((id, review_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<ReviewRequest>,
) -> ApiResult<Json<Message>> {
    let product_id = parse_id(&id, "Product")?;
    let review_id = parse_id(&review_id, "Review")?;
    services::edit_review(&state, user.id, product_id, review_id, body).await?;
    Ok(Message::new("Review updated"))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Success<CartView>>> {
    Ok(Success::new(services::cart(&state, user.id).await?))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add_to_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<String>,
    ApiQuery(q): ApiQuery<CartQuery>,
) -> ApiResult<Json<Success<CartLineUpdated>>> {
    let product_id = parse_id(&product_id, "Product")?;
    let line = services::add_to_cart(&state, user.id, product_id, q.size, q.quantity).await?;
    Ok(Success::new(line))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<String>,
    ApiQuery(q): ApiQuery<CartQuery>,
) -> ApiResult<Json<Success<CartLineUpdated>>> {
    let product_id = parse_id(&product_id, "Product")?;
    let line = services::update_cart(&state, user.id, product_id, q.size, q.quantity).await?;
    Ok(Success::new(line))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(product_id): Path<String>,
    ApiQuery(q): ApiQuery<CartQuery>,
) -> ApiResult<Json<Message>> {
    let product_id = parse_id(&product_id, "Product")?;
    services::remove_from_cart(&state, user.id, product_id, &q.size).await?;
    Ok(Message::new("Removed from cart"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{middleware::identity_layer, repo_types::NewUser};
    use axum::{
        body::Body,
        http::{header, Request},
        middleware::from_fn_with_state,
        response::Response,
    };
    use time::OffsetDateTime;
    use tower::ServiceExt;

    fn app(state: AppState) -> Router {
        Router::new()
            .merge(read_routes())
            .merge(write_routes())
            .layer(from_fn_with_state(state.clone(), identity_layer))
            .with_state(state)
    }

    async fn bearer_for_bob(state: &AppState) -> String {
        let user = state
            .users
            .create(NewUser {
                username: "bob".into(),
                email: "bob@example.com".into(),
                first_name: "Bob".into(),
                last_name: None,
                password_hash: "unused".into(),
                phone_number: None,
            })
            .await
            .unwrap();
        let token = state.keys.issue(user.id, OffsetDateTime::now_utc()).unwrap();
        format!("Bearer {token}")
    }

    async fn detail(res: Response) -> String {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let v: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        v["detail"].as_str().unwrap_or_default().to_string()
    }

    fn request(method: &str, uri: &str, auth: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
        let mut b = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            b = b.header(header::AUTHORIZATION, auth);
        }
        match body {
            Some(json) => b
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => b.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    async fn inverted_price_range_is_a_bad_request() {
        let app = app(AppState::fake());
        let res = app
            .oneshot(request(
                "GET",
                "/shop/products?category_filter=shoes&category_filter=hats&min_price=50&max_price=10",
                None,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(detail(res).await, "Invalid price range");
    }

    #[tokio::test]
    async fn malformed_product_id_is_not_found() {
        let app = app(AppState::fake());
        let res = app
            .oneshot(request("GET", "/shop/product/not-a-uuid", None, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(detail(res).await, "Product not found");
    }

    #[tokio::test]
    async fn cart_requires_authentication() {
        let app = app(AppState::fake());
        let res = app.oneshot(request("GET", "/shop/cart", None, None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(detail(res).await, "Not authenticated");
    }

    #[tokio::test]
    async fn out_of_range_rating_is_unprocessable() {
        let state = AppState::fake();
        let auth = bearer_for_bob(&state).await;
        let uri = format!("/shop/product/{}/review", uuid::Uuid::new_v4());
        let res = app(state)
            .oneshot(request(
                "POST",
                &uri,
                Some(&auth),
                Some(serde_json::json!({"rating": 6, "comment": "great"})),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn zero_quantity_cannot_be_added() {
        let state = AppState::fake();
        let auth = bearer_for_bob(&state).await;
        let uri = format!("/shop/cart/{}?size=M&quantity=0", uuid::Uuid::new_v4());
        let res = app(state)
            .oneshot(request("PUT", &uri, Some(&auth), None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(detail(res).await, "Quantity must be at least 1");
    }

    #[tokio::test]
    async fn negative_quantity_cannot_be_set() {
        let state = AppState::fake();
        let auth = bearer_for_bob(&state).await;
        let uri = format!("/shop/cart/{}?size=M&quantity=-2", uuid::Uuid::new_v4());
        let res = app(state)
            .oneshot(request("PATCH", &uri, Some(&auth), None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn oversized_quantity_is_unprocessable() {
        let state = AppState::fake();
        let auth = bearer_for_bob(&state).await;
        let app = app(state);
        let cases = [
            ("PUT", "1000", StatusCode::UNPROCESSABLE_ENTITY),
            ("PATCH", "2147483647", StatusCode::UNPROCESSABLE_ENTITY),
            ("PUT", "99999999999", StatusCode::BAD_REQUEST),
        ];
        for (method, quantity, expected) in cases {
            let uri = format!("/shop/cart/{}?size=M&quantity={quantity}", uuid::Uuid::new_v4());
            let res = app
                .clone()
                .oneshot(request(method, &uri, Some(&auth), None))
                .await
                .unwrap();
            assert_eq!(res.status(), expected, "{method} {quantity}");
            assert!(!detail(res).await.is_empty(), "{method} {quantity}");
        }
    }

    #[tokio::test]
    async fn unparseable_query_gets_json_detail() {
        let res = app(AppState::fake())
            .oneshot(request("GET", "/shop/products?min_price=abc", None, None))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let content_type = res.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("application/json"));
        assert!(detail(res).await.starts_with("Failed to deserialize query string"));
    }

    #[tokio::test]
    async fn review_body_must_be_well_formed() {
        let state = AppState::fake();
        let auth = bearer_for_bob(&state).await;
        let uri = format!("/shop/product/{}/review", uuid::Uuid::new_v4());
        let res = app(state)
            .oneshot(request("POST", &uri, Some(&auth), Some(serde_json::json!({"rating": "five"}))))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(!detail(res).await.is_empty());
    }
}
