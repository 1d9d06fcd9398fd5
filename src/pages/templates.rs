//! Askama page templates. Every page carries the soft identity for the nav bar.

use askama::Template;

use crate::{
    admin::repo::OrderStats,
    auth::repo_types::User,
    shop::repo_types::{CartLine, Category, Product, Review},
};

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub user: Option<User>,
}

#[derive(Template, Default)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub user: Option<User>,
    pub error: Option<String>,
    pub username: String,
}

#[derive(Template, Default)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub user: Option<User>,
    pub error: Option<String>,
    pub username: String,
    pub email: String,
    pub first_name: String,
}

#[derive(Template)]
#[template(path = "shop.html")]
pub struct ShopTemplate {
    pub user: Option<User>,
    pub products: Vec<Product>,
    pub categories: Vec<Category>,
    pub current_category: String,
    pub min_price: String,
    pub max_price: String,
}

#[derive(Template)]
#[template(path = "product.html")]
pub struct ProductTemplate {
    pub user: Option<User>,
    pub product: Product,
    pub reviews: Vec<Review>,
    pub average_rating: Option<f64>,
}

#[derive(Template)]
#[template(path = "cart.html")]
pub struct CartTemplate {
    pub user: Option<User>,
    pub lines: Vec<CartLine>,
    pub total: f64,
}

#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub user: Option<User>,
    pub stats: OrderStats,
    pub products: Vec<Product>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate<'a> {
    pub status: u16,
    pub message: &'a str,
}
