pub mod admin;
pub mod analyze;
pub mod auth;
pub mod catalog;
pub mod profile;

use axum::Json;
use serde_json::{Value, json};

use crate::error::ApiError;

/// A `{"message": ...}` success body.
pub(crate) fn message(text: &str) -> Json<Value> { Json(json!({ "message": text })) }

/// Treat empty and whitespace-only strings as absent.
pub(crate) fn present(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

/// Fallback for paths no route matches.
pub(crate) async fn unknown_route() -> ApiError { ApiError::not_found("Not found") }

/// Fallback for a known path requested with an unsupported method.
pub(crate) async fn wrong_method() -> ApiError { ApiError::MethodNotAllowed }
