//! `Json` and `Path` wrappers whose rejections use the `AppError` body.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// Malformed or incomplete bodies become `validation_error`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Path segments that do not parse become `not_found`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
