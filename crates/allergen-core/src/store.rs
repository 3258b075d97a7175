//! The `AllergenStore` trait: the sole gateway to persisted state.
//!
//! The trait is implemented by storage backends (e.g.
//! `allergen-store-sqlite`). The API and seeding code depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use chrono::Duration;
use uuid::Uuid;

use crate::{
  catalog::{Allergen, NewAllergen, NewProduct, Product},
  history::{SearchHistoryEntry, SearchHistoryItem},
  session::Session,
  user::{NewUser, User, UserUpdate},
};

// ─── Error classification ────────────────────────────────────────────────────

/// Backend-independent classification of a store failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
  /// A uniqueness constraint rejected the write.
  Duplicate,
  /// A referenced row does not exist.
  NotFound,
  /// Anything else; callers treat it as an internal failure.
  Other,
}

/// Implemented by every backend error so callers can map failures without
/// knowing the backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn kind(&self) -> StoreErrorKind;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an allergen store backend.
///
/// Bulk association writes (`add_*` taking a `Vec`) are all-or-nothing:
/// either every row is written or none is. Re-adding an existing association
/// is a no-op.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait AllergenStore: Send + Sync {
  type Error: StoreError;

  // ── Users ─────────────────────────────────────────────────────────────

  fn get_user(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  fn get_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Hash the plaintext password and persist the account.
  ///
  /// Fails with a [`StoreErrorKind::Duplicate`] error when the username or
  /// email is taken.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Apply the supplied fields, stamp `updated_at`, and return the refreshed
  /// record.
  fn update_user(
    &self,
    id: i64,
    update: UserUpdate,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn list_users(&self) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  // ── Allergen catalog ──────────────────────────────────────────────────

  fn list_allergens(
    &self,
  ) -> impl Future<Output = Result<Vec<Allergen>, Self::Error>> + Send + '_;

  fn get_allergen(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Allergen>, Self::Error>> + Send + '_;

  fn create_allergen(
    &self,
    input: NewAllergen,
  ) -> impl Future<Output = Result<Allergen, Self::Error>> + Send + '_;

  // ── User allergens ────────────────────────────────────────────────────

  fn get_user_allergens(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<Vec<Allergen>, Self::Error>> + Send + '_;

  /// Attach every allergen in `allergen_ids` to the user in one write.
  /// Unknown allergen ids fail the whole batch with
  /// [`StoreErrorKind::NotFound`].
  fn add_user_allergens(
    &self,
    user_id: i64,
    allergen_ids: Vec<i64>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn add_user_allergen(
    &self,
    user_id: i64,
    allergen_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_ {
    self.add_user_allergens(user_id, vec![allergen_id])
  }

  /// Detach an allergen from the user. Removing an absent pair succeeds.
  fn remove_user_allergen(
    &self,
    user_id: i64,
    allergen_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Product catalog ───────────────────────────────────────────────────

  fn get_product(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Product>, Self::Error>> + Send + '_;

  fn get_product_by_registration_number<'a>(
    &'a self,
    number: &'a str,
  ) -> impl Future<Output = Result<Option<Product>, Self::Error>> + Send + 'a;

  /// Case-insensitive substring match on the product name.
  fn search_products_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Vec<Product>, Self::Error>> + Send + 'a;

  fn create_product(
    &self,
    input: NewProduct,
  ) -> impl Future<Output = Result<Product, Self::Error>> + Send + '_;

  fn list_products(
    &self,
  ) -> impl Future<Output = Result<Vec<Product>, Self::Error>> + Send + '_;

  // ── Product allergens ─────────────────────────────────────────────────

  fn get_product_allergens(
    &self,
    product_id: i64,
  ) -> impl Future<Output = Result<Vec<Allergen>, Self::Error>> + Send + '_;

  /// Attach every allergen in `allergen_ids` to the product in one write.
  fn add_product_allergens(
    &self,
    product_id: i64,
    allergen_ids: Vec<i64>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn add_product_allergen(
    &self,
    product_id: i64,
    allergen_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_ {
    self.add_product_allergens(product_id, vec![allergen_id])
  }

  // ── Alternatives ──────────────────────────────────────────────────────

  /// Products linked as alternatives to `product_id` that contain none of
  /// the allergens in `excluded_allergen_ids`. The result is a filter, not a
  /// ranking.
  fn get_alternative_products(
    &self,
    product_id: i64,
    excluded_allergen_ids: Vec<i64>,
  ) -> impl Future<Output = Result<Vec<Product>, Self::Error>> + Send + '_;

  /// Link each of `alternative_ids` as a substitute for `product_id`.
  fn add_alternative_products(
    &self,
    product_id: i64,
    alternative_ids: Vec<i64>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Search history ────────────────────────────────────────────────────

  /// Always appends a new row; lookups are never deduplicated.
  fn add_to_search_history(
    &self,
    user_id: i64,
    product_id: i64,
  ) -> impl Future<Output = Result<SearchHistoryItem, Self::Error>> + Send + '_;

  /// Most recent first, at most `limit` entries.
  fn get_user_search_history(
    &self,
    user_id: i64,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SearchHistoryEntry>, Self::Error>> + Send + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Persist a new session for `user_id` expiring `ttl` after creation.
  fn create_session(
    &self,
    user_id: i64,
    ttl: Duration,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Look up a live session. Expired sessions are reported as absent.
  fn get_session(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  fn destroy_session(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete every expired session, returning how many were removed.
  fn prune_sessions(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
