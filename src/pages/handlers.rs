use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::{
    admin::repo as admin_repo,
    auth::{
        dto::{LoginRequest, RegisterRequest},
        resolver::verify_credentials,
        services::{expired_session_cookie, issue_token, register_user, session_cookie},
    },
    error::ApiError,
    pages::{
        error::{PageError, PageResult},
        extract::{PageForm, PageQuery, Visitor},
        templates::{
            AdminTemplate, CartTemplate, IndexTemplate, LoginTemplate, ProductTemplate,
            RegisterTemplate, ShopTemplate,
        },
    },
    shop::{
        dto::ProductQuery,
        repo::{self as shop_repo, ProductFilter},
        services::{self as shop_services, parse_id},
    },
    state::AppState,
};

pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login_page).post(login_submit))
        .route("/register", get(register_page).post(register_submit))
        .route("/logout", get(logout))
        .route("/shop", get(shop))
        .route("/product/:id", get(product))
        .route("/cart", get(cart))
        .route("/admin", get(admin))
}

fn render<T: Template>(status: StatusCode, page: T) -> PageResult<Response> {
    Ok((status, Html(page.render()?)).into_response())
}

/// `/shop` filter as typed into the form; blank fields mean no bound.
#[derive(Debug, Default, Deserialize)]
pub struct ShopQuery {
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

fn parse_price(raw: Option<&str>) -> PageResult<Option<f64>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => match s.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(PageError::BadRequest(format!("Invalid price {s:?}"))),
        },
    }
}

pub async fn index(Visitor(user): Visitor) -> PageResult<Response> {
    render(StatusCode::OK, IndexTemplate { user })
}

pub async fn login_page(Visitor(user): Visitor) -> PageResult<Response> {
    render(StatusCode::OK, LoginTemplate { user, ..Default::default() })
}

#[instrument(skip(state, jar, form), fields(username = %form.username))]
pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    PageForm(form): PageForm<LoginRequest>,
) -> PageResult<Response> {
    let user = match verify_credentials(&state, &form.username, &form.password).await {
        Ok(user) => user,
        Err(e) => {
            let err = ApiError::from(e);
            if err.status().is_server_error() {
                return Err(err.into());
            }
            let page = LoginTemplate {
                user: None,
                error: Some(err.to_string()),
                username: form.username,
            };
            return render(err.status(), page);
        }
    };
    let token = issue_token(&state, &user)?;
    info!(user_id = %user.id, "user logged in");
    Ok((jar.add(session_cookie(&state, token)), Redirect::to("/")).into_response())
}

pub async fn register_page(Visitor(user): Visitor) -> PageResult<Response> {
    render(StatusCode::OK, RegisterTemplate { user, ..Default::default() })
}

#[instrument(skip(state, jar, form), fields(username = %form.username))]
pub async fn register_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    PageForm(form): PageForm<RegisterRequest>,
) -> PageResult<Response> {
    let mut page = RegisterTemplate {
        user: None,
        error: None,
        username: form.username.clone(),
        email: form.email.clone(),
        first_name: form.first_name.clone(),
    };
    let user = match register_user(&state, form).await {
        Ok(user) => user,
        Err(err) if err.status().is_server_error() => return Err(err.into()),
        Err(err) => {
            let status = err.status();
            page.error = Some(err.to_string());
            return render(status, page);
        }
    };
    let token = issue_token(&state, &user)?;
    Ok((jar.add(session_cookie(&state, token)), Redirect::to("/")).into_response())
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.add(expired_session_cookie()), Redirect::to("/"))
}

#[instrument(skip(state, user))]
pub async fn shop(
    State(state): State<AppState>,
    Visitor(user): Visitor,
    PageQuery(q): PageQuery<ShopQuery>,
) -> PageResult<Response> {
    let min_price = parse_price(q.min_price.as_deref())?;
    let max_price = parse_price(q.max_price.as_deref())?;
    let current_category = q.category.unwrap_or_default();
    let filter = shop_services::product_filter(ProductQuery {
        category_filter: vec![current_category.clone()],
        min_price,
        max_price,
    })?;

    let products = shop_repo::list_products(&state.db, &filter).await?;
    let categories = shop_repo::list_categories(&state.db).await?;
    let page = ShopTemplate {
        user,
        products,
        categories,
        current_category,
        min_price: q.min_price.unwrap_or_default(),
        max_price: q.max_price.unwrap_or_default(),
    };
    render(StatusCode::OK, page)
}

#[instrument(skip(state, user))]
pub async fn product(
    State(state): State<AppState>,
    Visitor(user): Visitor,
    Path(id): Path<String>,
) -> PageResult<Response> {
    let id = parse_id(&id, "Product")?;
    let details = shop_services::product_details(&state, id).await?;
    let page = ProductTemplate {
        user,
        product: details.product,
        reviews: details.reviews,
        average_rating: details.average_rating,
    };
    render(StatusCode::OK, page)
}

#[instrument(skip(state, user))]
pub async fn cart(State(state): State<AppState>, Visitor(user): Visitor) -> PageResult<Response> {
    let Some(user) = user else {
        return Ok(Redirect::to("/login").into_response());
    };
    let view = shop_services::cart(&state, user.id).await?;
    let page = CartTemplate {
        user: Some(user),
        lines: view.items,
        total: view.total,
    };
    render(StatusCode::OK, page)
}

#[instrument(skip(state, user))]
pub async fn admin(State(state): State<AppState>, Visitor(user): Visitor) -> PageResult<Response> {
    let Some(user) = user else {
        return Ok(Redirect::to("/login").into_response());
    };
    if !user.is_admin() {
        return Err(PageError::Forbidden);
    }
    let stats = admin_repo::order_stats(&state.db).await?;
    let products = shop_repo::list_products(&state.db, &ProductFilter::default()).await?;
    render(
        StatusCode::OK,
        AdminTemplate {
            user: Some(user),
            stats,
            products,
        },
    )
}
