use axum::extract::{FromRequest, FromRequestParts};

use crate::utils::error::AppError;

/// `axum::Json` whose rejections render as a 400 `detail` body instead of
/// axum's plain-text 415/422 responses.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// `axum::extract::Query` with the same error body as [`JsonBody`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct QueryParams<T>(pub T);
