use axum::{
    body::Body,
    http::{Response, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::{borrow::Cow, fmt::Debug};

pub const HTML_404: &[u8] = include_bytes!("html/404.html");
pub const HTML_500: &[u8] = include_bytes!("html/500.html");

pub fn http_404() -> Response<Body> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Body::from(HTML_404))
        .unwrap()
}

pub fn err_into_500<T: Debug>(e: T) -> Response<Body> {
    tracing::error!("{e:?}");
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .body(Body::from(HTML_500))
        .unwrap()
}

/// Error taxonomy of the JSON API. Every variant renders as
/// `{"error": message}` with the matching status code.
#[derive(Debug)]
pub enum ApiError {
    NotFound(&'static str),
    Validation(Cow<'static, str>),
    // Wrong verbs report as 400, not 405.
    MethodNotAllowed(&'static str),
    Unauthenticated,
    Internal(String),
}

impl ApiError {
    pub fn internal<T: Debug>(e: T) -> Self {
        ApiError::Internal(format!("{e:?}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, Cow::Borrowed(msg)),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::MethodNotAllowed(msg) => (StatusCode::BAD_REQUEST, Cow::Borrowed(msg)),
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Cow::Borrowed("Authentication required."),
            ),
            ApiError::Internal(e) => {
                tracing::error!("{e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Cow::Borrowed("Internal server error."),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}
