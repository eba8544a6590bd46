//! Extractors - Body and query extractors whose rejections are `AppError`s
//!
//! axum's own `Json`/`Query` reject malformed input with a plain-text 4xx.
//! These wrappers route the rejection through the error taxonomy instead, so a
//! missing or mistyped field is `INVALID_INPUT` like any other bad input.

use crate::core::AppError;
use axum_macros::{FromRequest, FromRequestParts};

/// JSON request body
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
