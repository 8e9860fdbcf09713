//! Body and path extractors whose rejections render as [`AppError`].
//!
//! axum's own `Json` and `Path` reject with plain-text 400/415/422
//! responses; these wrappers route the same failures through the API's
//! JSON error body.

use axum::extract::{FromRequest, FromRequestParts};

use super::error::AppError;

/// `axum::Json` with an [`AppError`] rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `axum::extract::Path` with an [`AppError`] rejection.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
