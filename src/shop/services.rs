use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    shop::{
        dto::{CartLineUpdated, CartView, ProductDetails, ProductQuery, ReviewRequest},
        repo::{self, ProductFilter},
        repo_types::{CartLine, Review},
    },
    state::AppState,
};

pub const MIN_RATING: i16 = 1;
pub const MAX_RATING: i16 = 5;
/// Largest quantity a single cart line may hold.
pub const MAX_LINE_QUANTITY: i32 = 999;

/// Path ids that are not UUIDs cannot name a row, so they read as missing.
pub fn parse_id(raw: &str, what: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("{what} not found")))
}

pub fn product_filter(q: ProductQuery) -> ApiResult<ProductFilter> {
    if let (Some(min), Some(max)) = (q.min_price, q.max_price) {
        if min > max {
            return Err(ApiError::BadRequest("Invalid price range".into()));
        }
    }
    let categories = q
        .category_filter
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    Ok(ProductFilter {
        categories,
        min_price: q.min_price,
        max_price: q.max_price,
    })
}

pub fn check_rating(rating: i16) -> ApiResult<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ApiError::Unprocessable(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    Ok(())
}

/// Quantity for adding to the cart; absent means one.
pub fn add_quantity(quantity: Option<i32>) -> ApiResult<i32> {
    match quantity.unwrap_or(1) {
        q if q > MAX_LINE_QUANTITY => Err(too_many()),
        q if q >= 1 => Ok(q),
        _ => Err(ApiError::Unprocessable("Quantity must be at least 1".into())),
    }
}

/// Quantity for setting a cart line; zero means remove.
pub fn set_quantity(quantity: Option<i32>) -> ApiResult<i32> {
    match quantity {
        Some(q) if q > MAX_LINE_QUANTITY => Err(too_many()),
        Some(q) if q >= 0 => Ok(q),
        Some(_) => Err(ApiError::Unprocessable("Quantity must not be negative".into())),
        None => Err(ApiError::Unprocessable("Quantity is required".into())),
    }
}

fn too_many() -> ApiError {
    ApiError::Unprocessable(format!("Quantity must be at most {MAX_LINE_QUANTITY}"))
}

pub fn average_rating(reviews: &[Review]) -> Option<f64> {
    if reviews.is_empty() {
        return None;
    }
    let sum: i64 = reviews.iter().map(|r| i64::from(r.rating)).sum();
    Some(sum as f64 / reviews.len() as f64)
}

pub fn cart_total(lines: &[CartLine]) -> f64 {
    lines.iter().map(CartLine::line_total).sum()
}

pub async fn product_details(state: &AppState, id: Uuid) -> ApiResult<ProductDetails> {
    let product = repo::get_product(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;
    let reviews = repo::list_reviews(&state.db, id).await?;
    Ok(ProductDetails {
        average_rating: average_rating(&reviews),
        product,
        reviews,
    })
}

pub async fn add_review(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
    req: ReviewRequest,
) -> ApiResult<Uuid> {
    check_rating(req.rating)?;
    if !repo::product_exists(&state.db, product_id).await? {
        return Err(ApiError::NotFound("Product not found".into()));
    }
    let id = repo::insert_review(&state.db, user_id, product_id, req.rating, req.comment.trim()).await?;
    info!(%user_id, %product_id, review_id = %id, "review added");
    Ok(id)
}

pub async fn edit_review(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
    review_id: Uuid,
    req: ReviewRequest,
) -> ApiResult<()> {
    check_rating(req.rating)?;
    let updated = repo::update_review(
        &state.db,
        review_id,
        product_id,
        user_id,
        req.rating,
        req.comment.trim(),
    )
    .await?;
    if !updated {
        return Err(ApiError::NotFound("Review not found".into()));
    }
    info!(%user_id, %review_id, "review updated");
    Ok(())
}

pub async fn cart(state: &AppState, user_id: Uuid) -> ApiResult<CartView> {
    let items = repo::cart_lines(&state.db, user_id).await?;
    Ok(CartView {
        total: cart_total(&items),
        items,
    })
}

pub async fn add_to_cart(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
    size: String,
    quantity: Option<i32>,
) -> ApiResult<CartLineUpdated> {
    let quantity = add_quantity(quantity)?;
    if !repo::product_exists(&state.db, product_id).await? {
        return Err(ApiError::NotFound("Product not found".into()));
    }
    let total = repo::add_to_cart(&state.db, user_id, product_id, &size, quantity).await?;
    debug!(%user_id, %product_id, size = %size, quantity = total, "cart line merged");
    Ok(CartLineUpdated {
        product_id,
        size,
        quantity: total,
    })
}

pub async fn update_cart(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
    size: String,
    quantity: Option<i32>,
) -> ApiResult<CartLineUpdated> {
    let quantity = set_quantity(quantity)?;
    if !repo::set_cart_quantity(&state.db, user_id, product_id, &size, quantity).await? {
        return Err(ApiError::NotFound("Product not found in cart".into()));
    }
    Ok(CartLineUpdated {
        product_id,
        size,
        quantity,
    })
}

pub async fn remove_from_cart(
    state: &AppState,
    user_id: Uuid,
    product_id: Uuid,
    size: &str,
) -> ApiResult<()> {
    if !repo::remove_from_cart(&state.db, user_id, product_id, size).await? {
        return Err(ApiError::NotFound("Product not found in cart".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn review(rating: i16) -> Review {
        Review {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            username: "alice".into(),
            product_id: Uuid::new_v4(),
            rating,
            comment: String::new(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    fn line(price: f64, quantity: i32) -> CartLine {
        CartLine {
            product_id: Uuid::new_v4(),
            name: "Tee".into(),
            price,
            size: "M".into(),
            quantity,
            added_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn inverted_price_range_is_rejected() {
        let q = ProductQuery {
            category_filter: vec![],
            min_price: Some(50.0),
            max_price: Some(10.0),
        };
        let err = product_filter(q).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(ref m) if m == "Invalid price range"));
    }

    #[test]
    fn equal_bounds_and_blank_categories() {
        let q = ProductQuery {
            category_filter: vec![" shoes ".into(), "".into()],
            min_price: Some(10.0),
            max_price: Some(10.0),
        };
        let f = product_filter(q).unwrap();
        assert_eq!(f.categories, vec!["shoes".to_string()]);
    }

    #[test]
    fn rating_bounds() {
        assert!(check_rating(1).is_ok());
        assert!(check_rating(5).is_ok());
        assert!(matches!(check_rating(0), Err(ApiError::Unprocessable(_))));
        assert!(matches!(check_rating(6), Err(ApiError::Unprocessable(_))));
    }

    #[test]
    fn cart_quantity_rules() {
        assert_eq!(add_quantity(None).unwrap(), 1);
        assert_eq!(add_quantity(Some(3)).unwrap(), 3);
        assert!(add_quantity(Some(0)).is_err());
        assert_eq!(set_quantity(Some(0)).unwrap(), 0);
        assert!(set_quantity(Some(-1)).is_err());
        assert!(set_quantity(None).is_err());
    }

    #[test]
    fn cart_quantity_is_capped() {
        assert_eq!(add_quantity(Some(MAX_LINE_QUANTITY)).unwrap(), MAX_LINE_QUANTITY);
        assert_eq!(set_quantity(Some(MAX_LINE_QUANTITY)).unwrap(), MAX_LINE_QUANTITY);
        for q in [MAX_LINE_QUANTITY + 1, i32::MAX] {
            assert!(matches!(add_quantity(Some(q)), Err(ApiError::Unprocessable(_))));
            assert!(matches!(set_quantity(Some(q)), Err(ApiError::Unprocessable(_))));
        }
    }

    #[test]
    fn non_uuid_ids_read_as_missing() {
        let err = parse_id("42", "Product").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Product not found"));
        assert!(parse_id(&Uuid::new_v4().to_string(), "Product").is_ok());
    }

    #[test]
    fn averages_and_totals() {
        assert_eq!(average_rating(&[]), None);
        assert_eq!(average_rating(&[review(4), review(5)]), Some(4.5));

        let total = cart_total(&[line(12.5, 2), line(5.25, 1)]);
        assert_eq!(total, 30.25);
        assert_eq!(cart_total(&[]), 0.0);
    }
}
