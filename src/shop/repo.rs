use anyhow::Context;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::shop::{
    repo_types::{CartLine, Category, Product, Review},
    services::MAX_LINE_QUANTITY,
};

const PRODUCT_SELECT: &str = r#"
    SELECT p.id, p.category_id, c.name AS category_name, p.name, p.description, p.brand,
           p.price, p.sku, p.stock, p.images, p.created_at
      FROM products p
      JOIN product_categories c ON c.id = p.category_id
"#;

/// Catalog filter; every field is optional and they combine with AND.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub categories: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

pub async fn list_categories(db: &PgPool) -> anyhow::Result<Vec<Category>> {
    let rows = sqlx::query_as::<_, Category>(
        "SELECT id, name, parent_id FROM product_categories ORDER BY name",
    )
    .fetch_all(db)
    .await
    .context("list categories")?;
    Ok(rows)
}

pub async fn list_brands(db: &PgPool) -> anyhow::Result<Vec<String>> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT DISTINCT brand FROM products WHERE brand IS NOT NULL ORDER BY brand",
    )
    .fetch_all(db)
    .await
    .context("list brands")?;
    Ok(rows.into_iter().map(|(b,)| b).collect())
}

pub async fn list_products(db: &PgPool, filter: &ProductFilter) -> anyhow::Result<Vec<Product>> {
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(PRODUCT_SELECT);
    qb.push(" WHERE TRUE");
    if !filter.categories.is_empty() {
        qb.push(" AND c.name = ANY(")
            .push_bind(filter.categories.clone())
            .push(")");
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND p.price <= ").push_bind(max);
    }
    qb.push(" ORDER BY p.created_at DESC");

    let rows = qb
        .build_query_as::<Product>()
        .fetch_all(db)
        .await
        .context("list products")?;
    Ok(rows)
}

pub async fn get_product(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
    let row = sqlx::query_as::<_, Product>(&format!("{PRODUCT_SELECT} WHERE p.id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("get product")?;
    Ok(row)
}

pub async fn product_exists(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
        .bind(id)
        .fetch_one(db)
        .await
        .context("product exists")?;
    Ok(exists)
}

pub async fn list_reviews(db: &PgPool, product_id: Uuid) -> anyhow::Result<Vec<Review>> {
    let rows = sqlx::query_as::<_, Review>(
        r#"
        SELECT r.id, r.user_id, u.username, r.product_id, r.rating, r.comment, r.created_at
          FROM reviews r
          JOIN users u ON u.id = r.user_id
         WHERE r.product_id = $1
         ORDER BY r.created_at DESC
        "#,
    )
    .bind(product_id)
    .fetch_all(db)
    .await
    .context("list reviews")?;
    Ok(rows)
}

pub async fn insert_review(
    db: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
    rating: i16,
    comment: &str,
) -> anyhow::Result<Uuid> {
    let (id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO reviews (user_id, product_id, rating, comment)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(rating)
    .bind(comment)
    .fetch_one(db)
    .await
    .context("insert review")?;
    Ok(id)
}

/// Updates a review only if it belongs to `user_id` and `product_id`.
pub async fn update_review(
    db: &PgPool,
    review_id: Uuid,
    product_id: Uuid,
    user_id: Uuid,
    rating: i16,
    comment: &str,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE reviews
           SET rating = $4, comment = $5
         WHERE id = $1 AND product_id = $2 AND user_id = $3
        "#,
    )
    .bind(review_id)
    .bind(product_id)
    .bind(user_id)
    .bind(rating)
    .bind(comment)
    .execute(db)
    .await
    .context("update review")?;
    Ok(res.rows_affected() == 1)
}

pub async fn cart_lines(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<CartLine>> {
    let rows = sqlx::query_as::<_, CartLine>(
        r#"
        SELECT ci.product_id, p.name, p.price, ci.size, ci.quantity, ci.added_at
          FROM cart_items ci
          JOIN products p ON p.id = ci.product_id
         WHERE ci.user_id = $1
         ORDER BY ci.added_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list cart")?;
    Ok(rows)
}

/// Adds `quantity` to the (product, size) line, creating it if needed.
/// The merged quantity saturates at `MAX_LINE_QUANTITY`. Returns the resulting quantity.
pub async fn add_to_cart(
    db: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
    size: &str,
    quantity: i32,
) -> anyhow::Result<i32> {
    let (total,): (i32,) = sqlx::query_as(
        r#"
        INSERT INTO cart_items (user_id, product_id, size, quantity)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, product_id, size)
        DO UPDATE SET quantity = LEAST(cart_items.quantity::BIGINT + EXCLUDED.quantity, $5)::INTEGER
        RETURNING quantity
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(size)
    .bind(quantity)
    .bind(i64::from(MAX_LINE_QUANTITY))
    .fetch_one(db)
    .await
    .context("add to cart")?;
    Ok(total)
}

/// Sets the line's quantity; zero deletes it. False when no line matched.
pub async fn set_cart_quantity(
    db: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
    size: &str,
    quantity: i32,
) -> anyhow::Result<bool> {
    if quantity == 0 {
        return remove_from_cart(db, user_id, product_id, size).await;
    }
    let res = sqlx::query(
        r#"
        UPDATE cart_items
           SET quantity = $4
         WHERE user_id = $1 AND product_id = $2 AND size = $3
        "#,
    )
    .bind(user_id)
    .bind(product_id)
    .bind(size)
    .bind(quantity)
    .execute(db)
    .await
    .context("set cart quantity")?;
    Ok(res.rows_affected() == 1)
}

pub async fn remove_from_cart(
    db: &PgPool,
    user_id: Uuid,
    product_id: Uuid,
    size: &str,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        "DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2 AND size = $3",
    )
    .bind(user_id)
    .bind(product_id)
    .bind(size)
    .execute(db)
    .await
    .context("remove from cart")?;
    Ok(res.rows_affected() == 1)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) async fn seed_user(db: &PgPool, username: &str) -> Uuid {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO users (username, email, first_name, password_hash)
            VALUES ($1, $1 || '@example.com', $1, 'x')
            RETURNING id
            "#,
        )
        .bind(username)
        .fetch_one(db)
        .await
        .unwrap();
        id
    }

    pub(crate) async fn seed_product(db: &PgPool, name: &str, price: f64) -> Uuid {
        let (category,): (Uuid,) =
            sqlx::query_as("INSERT INTO product_categories (name) VALUES ('shoes') RETURNING id")
                .fetch_one(db)
                .await
                .unwrap();
        let (id,): (Uuid,) = sqlx::query_as(
            "INSERT INTO products (category_id, name, price) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(category)
        .bind(name)
        .bind(price)
        .fetch_one(db)
        .await
        .unwrap();
        id
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn adding_same_line_twice_merges_quantities(db: PgPool) {
        let user = seed_user(&db, "bob").await;
        let product = seed_product(&db, "Runner", 40.0).await;

        assert_eq!(add_to_cart(&db, user, product, "42", 2).await.unwrap(), 2);
        assert_eq!(add_to_cart(&db, user, product, "42", 3).await.unwrap(), 5);
        assert_eq!(add_to_cart(&db, user, product, "43", 1).await.unwrap(), 1);

        let lines = cart_lines(&db, user).await.unwrap();
        assert_eq!(lines.len(), 2);
        let merged = lines.iter().find(|l| l.size == "42").unwrap();
        assert_eq!(merged.quantity, 5);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn merged_quantity_saturates_at_cap(db: PgPool) {
        let user = seed_user(&db, "bob").await;
        let product = seed_product(&db, "Runner", 40.0).await;

        add_to_cart(&db, user, product, "", MAX_LINE_QUANTITY).await.unwrap();
        let total = add_to_cart(&db, user, product, "", MAX_LINE_QUANTITY).await.unwrap();
        assert_eq!(total, MAX_LINE_QUANTITY);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn setting_quantity_to_zero_removes_line(db: PgPool) {
        let user = seed_user(&db, "bob").await;
        let product = seed_product(&db, "Runner", 40.0).await;
        add_to_cart(&db, user, product, "42", 2).await.unwrap();

        assert!(set_cart_quantity(&db, user, product, "42", 7).await.unwrap());
        assert_eq!(cart_lines(&db, user).await.unwrap()[0].quantity, 7);

        assert!(set_cart_quantity(&db, user, product, "42", 0).await.unwrap());
        assert!(cart_lines(&db, user).await.unwrap().is_empty());
        assert!(!set_cart_quantity(&db, user, product, "42", 0).await.unwrap());
        assert!(!set_cart_quantity(&db, user, product, "42", 3).await.unwrap());
    }
}
