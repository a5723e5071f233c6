//! Request body extractor shared by the JSON handlers.
//!
//! Wraps [`axum::Json`] so a body that is not valid JSON, or does not match
//! the handler's request type, is rejected through [`AppError`] as a 400
//! with the usual `{error, code}` body.

use axum::extract::FromRequest;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
