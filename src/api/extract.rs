//! Request extractors whose rejections render through [`ApiError`].
//!
//! axum's own `Json`, `Query` and `Path` reject with plain-text bodies (422 for a body that
//! parses but does not deserialize). Handlers use these wrappers instead so malformed input
//! comes back as a 400 inside the error envelope.

use axum::extract::{FromRequest, FromRequestParts};

use crate::api::errors::ApiError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub(crate) struct AppJson<T>(pub(crate) T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub(crate) struct AppQuery<T>(pub(crate) T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub(crate) struct AppPath<T>(pub(crate) T);
