//! Body and query extractors for the JSON API. They wrap axum's own
//! extractors and answer failures with the `{"detail": ...}` envelope.

use axum::{
    async_trait,
    extract::{
        rejection::{FormRejection, JsonRejection},
        FromRequest, FromRequestParts, Request,
    },
    http::request::Parts,
    Form, Json,
};
use axum_extra::extract::{Query, QueryRejection};

use crate::error::ApiError;

pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

pub struct ApiForm<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiForm<T>
where
    Form<T>: FromRequest<S, Rejection = FormRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Form(value) = Form::<T>::from_request(req, state).await?;
        Ok(ApiForm(value))
    }
}

/// Query string with repeated keys collected into sequences.
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(ApiQuery(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{self, header, StatusCode},
    };
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Login {
        username: String,
        #[allow(dead_code)]
        password: String,
    }

    #[derive(Debug, Deserialize)]
    struct Range {
        min_price: Option<f64>,
    }

    fn json(body: &'static str) -> Request {
        http::Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn syntax_and_shape_errors_keep_their_status() {
        let err = ApiJson::<Login>::from_request(json("{bad"), &()).await.err().unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = ApiJson::<Login>::from_request(json(r#"{"username":"bob"}"#), &())
            .await
            .err()
            .unwrap();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains("password"));

        let ApiJson(login) = ApiJson::<Login>::from_request(
            json(r#"{"username":"bob","password":"x"}"#),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(login.username, "bob");
    }

    #[tokio::test]
    async fn missing_content_type_is_unsupported_media() {
        let req = http::Request::builder()
            .method("POST")
            .uri("/")
            .body(Body::from("{}"))
            .unwrap();
        let err = ApiJson::<Login>::from_request(req, &()).await.err().unwrap();
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn bad_query_value_is_bad_request() {
        let req = http::Request::builder().uri("/?min_price=abc").body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        let err = ApiQuery::<Range>::from_request_parts(&mut parts, &()).await.err().unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let req = http::Request::builder().uri("/?min_price=2.5").body(()).unwrap();
        let (mut parts, _) = req.into_parts();
        let ApiQuery(range) = ApiQuery::<Range>::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(range.min_price, Some(2.5));
    }
}
