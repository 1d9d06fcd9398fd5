use anyhow::Context;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OrderStats {
    pub total_orders: i64,
    pub total_revenue: f64,
}

pub async fn order_stats(db: &PgPool) -> anyhow::Result<OrderStats> {
    let stats = sqlx::query_as::<_, OrderStats>(
        r#"
        SELECT COUNT(*)::BIGINT AS total_orders,
               COALESCE(SUM(total_amount), 0)::DOUBLE PRECISION AS total_revenue
          FROM orders
        "#,
    )
    .fetch_one(db)
    .await
    .context("order stats")?;
    Ok(stats)
}

/// Reviews and cart lines go with the product through ON DELETE CASCADE.
pub async fn delete_product(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(db)
        .await
        .context("delete product")?;
    Ok(res.rows_affected() == 1)
}
