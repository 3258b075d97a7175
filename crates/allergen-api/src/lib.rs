//! JSON HTTP API for the allergen lookup service.
//!
//! Exposes an axum [`Router`] backed by any [`AllergenStore`]. Every route
//! declares an [`Access`] requirement; [`session::enforce`] evaluates it
//! against the caller's session cookie before the handler runs.
//!
//! Every route lives under `/api`, and every error body is
//! `{"message": "..."}`, including unknown paths and unsupported methods.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod session;

pub use config::ServerConfig;
pub use error::ApiError;

use std::sync::Arc;

use allergen_core::{access::Access, store::AllergenStore};
use axum::{
  Router, middleware,
  routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use handlers::{admin, analyze, auth, catalog, profile};
use session::{Gate, enforce};

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: AllergenStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

impl<S: AllergenStore> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> Self {
    Self { store: Arc::new(store), config: Arc::new(config) }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full application router, all routes nested under `/api`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: AllergenStore + Clone + 'static,
{
  let public = Router::new()
    .route("/register", post(auth::register::<S>))
    .route("/login", post(auth::login::<S>))
    .route("/allergens", get(catalog::allergens::<S>))
    .route("/products/registration/{number}", get(catalog::by_registration::<S>))
    .route("/products/search", get(catalog::search::<S>))
    .route("/products/{id}/allergens", get(catalog::product_allergens::<S>))
    .method_not_allowed_fallback(handlers::wrong_method)
    .route_layer(middleware::from_fn_with_state(
      Gate::new(state.clone(), Access::Public),
      enforce::<S>,
    ));

  let member = Router::new()
    .route("/logout", post(auth::logout::<S>))
    .route("/user", get(profile::current).patch(profile::update::<S>))
    .route(
      "/user/allergens",
      get(profile::allergens::<S>).post(profile::add_allergens::<S>),
    )
    .route("/user/allergens/{id}", delete(profile::remove_allergen::<S>))
    .route(
      "/user/history",
      get(profile::history::<S>).post(profile::record_history::<S>),
    )
    .route("/products/{id}/alternatives", get(catalog::alternatives::<S>))
    .route("/analyze/{id}", get(analyze::handler::<S>))
    .method_not_allowed_fallback(handlers::wrong_method)
    .route_layer(middleware::from_fn_with_state(
      Gate::new(state.clone(), Access::User),
      enforce::<S>,
    ));

  let admin = Router::new()
    .route("/products", get(admin::products::<S>))
    .route("/admin/users", get(admin::users::<S>))
    .route("/admin/allergens", post(admin::create_allergen::<S>))
    .route("/admin/products", post(admin::create_product::<S>))
    .route("/admin/products/{id}/allergens", post(admin::add_product_allergens::<S>))
    .route("/admin/products/{id}/alternatives", post(admin::add_alternatives::<S>))
    .method_not_allowed_fallback(handlers::wrong_method)
    .route_layer(middleware::from_fn_with_state(
      Gate::new(state.clone(), Access::Admin),
      enforce::<S>,
    ));

  Router::new()
    .nest("/api", public.merge(member).merge(admin))
    .fallback(handlers::unknown_route)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
