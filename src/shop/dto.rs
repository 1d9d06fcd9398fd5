use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shop::repo_types::{CartLine, Product, Review};

/// `?category_filter=a&category_filter=b&min_price=..&max_price=..`
#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    #[serde(default)]
    pub category_filter: Vec<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: i16,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewCreated {
    pub status: &'static str,
    pub message: &'static str,
    pub review_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub product: Product,
    pub average_rating: Option<f64>,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CartQuery {
    #[serde(default)]
    pub size: String,
    pub quantity: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total: f64,
}

#[derive(Debug, Serialize)]
pub struct CartLineUpdated {
    pub product_id: Uuid,
    pub size: String,
    pub quantity: i32,
}
