//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure renders as `{"message": "..."}`. Store failures are logged
//! and reported with a generic message.

use allergen_core::{
  access::Denial,
  store::{StoreError, StoreErrorKind},
};
use axum::{
  Json,
  extract::rejection::{JsonRejection, PathRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("Unauthorized")]
  Unauthorized,

  /// Unknown username and wrong password are deliberately indistinguishable.
  #[error("Invalid credentials")]
  InvalidCredentials,

  #[error("Forbidden: Admin access required")]
  Forbidden,

  #[error("not found: {0}")]
  NotFound(String),

  #[error("Method not allowed")]
  MethodNotAllowed,

  #[error("logout failed: {0}")]
  Logout(#[source] BoxError),

  #[error("{operation} failed: {source}")]
  Store {
    operation: &'static str,
    #[source]
    source:    BoxError,
  },
}

impl ApiError {
  pub fn bad_request(message: impl Into<String>) -> Self { Self::BadRequest(message.into()) }

  pub fn not_found(message: impl Into<String>) -> Self { Self::NotFound(message.into()) }

  /// Wrap a store failure as an internal error tagged with `operation`.
  ///
  /// Usable directly in `map_err`: `.map_err(ApiError::store("get allergens"))`.
  pub fn store<E: StoreError>(operation: &'static str) -> impl FnOnce(E) -> Self {
    move |e| Self::Store { operation, source: Box::new(e) }
  }

  /// Like [`ApiError::store`], but duplicates become 400 with `duplicate` and
  /// missing references become 404 with `missing`.
  pub fn classified<E: StoreError>(
    operation: &'static str,
    duplicate: &'static str,
    missing: &'static str,
  ) -> impl FnOnce(E) -> Self {
    move |e| match e.kind() {
      StoreErrorKind::Duplicate => Self::BadRequest(duplicate.to_owned()),
      StoreErrorKind::NotFound => Self::NotFound(missing.to_owned()),
      StoreErrorKind::Other => Self::Store { operation, source: Box::new(e) },
    }
  }
}

impl From<Denial> for ApiError {
  fn from(denial: Denial) -> Self {
    match denial {
      Denial::Unauthenticated => Self::Unauthorized,
      Denial::Forbidden => Self::Forbidden,
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
      ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_owned()),
      ApiError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "Invalid credentials".to_owned()),
      ApiError::Forbidden => {
        (StatusCode::FORBIDDEN, "Forbidden: Admin access required".to_owned())
      }
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
      ApiError::MethodNotAllowed => {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_owned())
      }
      ApiError::Logout(e) => {
        tracing::error!(error = %e, "failed to destroy session");
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to logout".to_owned())
      }
      ApiError::Store { operation, source } => {
        tracing::error!(operation, error = %source, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_owned())
      }
    };
    (status, Json(json!({ "message": message }))).into_response()
  }
}

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  async fn render(err: ApiError) -> (StatusCode, serde_json::Value) {
    let resp = err.into_response();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
  }

  #[tokio::test]
  async fn denials_map_to_fixed_messages() {
    let (status, body) = render(Denial::Unauthenticated.into()).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "message": "Unauthorized" }));

    let (status, body) = render(Denial::Forbidden.into()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, json!({ "message": "Forbidden: Admin access required" }));
  }

  #[tokio::test]
  async fn store_errors_hide_details() {
    let source: BoxError = "disk on fire".into();
    let (status, body) = render(ApiError::Store { operation: "test", source }).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "message": "Server error" }));
  }

  #[tokio::test]
  async fn invalid_credentials_is_401() {
    let (status, body) = render(ApiError::InvalidCredentials).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");
  }
}
