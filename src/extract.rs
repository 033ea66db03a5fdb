//! Request extractors that reject with [`LmsError`].
//!
//! Thin wrappers over axum's `Json`, `Path` and `Query`. A body, path segment or query
//! string that fails to decode becomes `LmsError::Invalid` and is rendered as the usual
//! `{error, code}` body with status 400.

use axum::{
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::LmsError;

/// JSON request body, also usable as a JSON response.
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(LmsError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

/// Typed path parameters, e.g. the `{id}` of `/courses/{id}`.
#[derive(Debug, Clone, Copy, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(LmsError))]
pub struct Path<T>(pub T);

/// Typed query string, e.g. `?page=2&page_size=20`.
#[derive(Debug, Clone, Copy, Default, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(LmsError))]
pub struct Query<T>(pub T);
