//! Request extractors that report malformed input in the standard error envelope

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON body; a missing field or bad syntax is a 400 `VALIDATION_ERROR`
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string, rejected the same way as [`AppJson`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);
