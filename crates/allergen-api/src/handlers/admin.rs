//! Administrator handlers. Every route here is gated with `Access::Admin`.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/products` | full product listing |
//! | `GET`  | `/admin/users` | |
//! | `POST` | `/admin/allergens` | Body: `{"name","icon","description"}` |
//! | `POST` | `/admin/products` | Body: `{"name","manufacturer","registrationNumber","ingredients"}` |
//! | `POST` | `/admin/products/{id}/allergens` | Body: `{"allergenIds":[..]}` |
//! | `POST` | `/admin/products/{id}/alternatives` | Body: `{"alternativeIds":[..]}` |

use allergen_core::{
  catalog::{Allergen, NewAllergen, NewProduct, Product},
  store::AllergenStore,
  user::User,
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;

use super::{message, present};
use crate::{
  AppState,
  error::{ApiError, Result},
  extract::{JsonBody, PathParam},
};

// ─── Listings ────────────────────────────────────────────────────────────────

/// `GET /products`
pub async fn products<S>(State(state): State<AppState<S>>) -> Result<Json<Vec<Product>>>
where
  S: AllergenStore + Clone + 'static,
{
  let products = state
    .store
    .list_products()
    .await
    .map_err(ApiError::store("list products"))?;
  Ok(Json(products))
}

/// `GET /admin/users`
pub async fn users<S>(State(state): State<AppState<S>>) -> Result<Json<Vec<User>>>
where
  S: AllergenStore + Clone + 'static,
{
  let users = state
    .store
    .list_users()
    .await
    .map_err(ApiError::store("list users"))?;
  Ok(Json(users))
}

// ─── Catalog writes ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AllergenBody {
  #[serde(default)]
  pub name:        Option<String>,
  #[serde(default)]
  pub icon:        Option<String>,
  #[serde(default)]
  pub description: Option<String>,
}

/// `POST /admin/allergens`
pub async fn create_allergen<S>(
  State(state): State<AppState<S>>,
  JsonBody(body): JsonBody<AllergenBody>,
) -> Result<impl IntoResponse>
where
  S: AllergenStore + Clone + 'static,
{
  let (Some(name), Some(icon), Some(description)) =
    (present(body.name), present(body.icon), present(body.description))
  else {
    return Err(ApiError::bad_request("All fields are required"));
  };

  let allergen: Allergen = state
    .store
    .create_allergen(NewAllergen { name, description: Some(description), icon: Some(icon) })
    .await
    .map_err(ApiError::classified(
      "create allergen",
      "Allergen already exists",
      "Allergen not found",
    ))?;

  tracing::info!(allergen_id = allergen.id, name = %allergen.name, "created allergen");
  Ok((StatusCode::CREATED, Json(allergen)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductBody {
  #[serde(default)]
  pub name:                Option<String>,
  #[serde(default)]
  pub manufacturer:        Option<String>,
  #[serde(default)]
  pub registration_number: Option<String>,
  #[serde(default)]
  pub ingredients:         Option<String>,
}

impl ProductBody {
  fn into_new_product(self) -> Option<NewProduct> {
    Some(NewProduct {
      name:                present(self.name)?,
      manufacturer:        present(self.manufacturer)?,
      registration_number: present(self.registration_number)?,
      ingredients:         present(self.ingredients)?,
    })
  }
}

/// `POST /admin/products`
pub async fn create_product<S>(
  State(state): State<AppState<S>>,
  JsonBody(body): JsonBody<ProductBody>,
) -> Result<impl IntoResponse>
where
  S: AllergenStore + Clone + 'static,
{
  let input = body
    .into_new_product()
    .ok_or_else(|| ApiError::bad_request("All fields are required"))?;

  let product = state
    .store
    .create_product(input)
    .await
    .map_err(ApiError::classified(
      "create product",
      "Registration number already in use",
      "Product not found",
    ))?;

  tracing::info!(product_id = product.id, "created product");
  Ok((StatusCode::CREATED, Json(product)))
}

// ─── Associations ────────────────────────────────────────────────────────────

async fn require_product<S: AllergenStore>(state: &AppState<S>, product_id: i64) -> Result<()> {
  state
    .store
    .get_product(product_id)
    .await
    .map_err(ApiError::store("get product"))?
    .map(drop)
    .ok_or_else(|| ApiError::not_found("Product not found"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAllergensBody {
  pub allergen_ids: Vec<i64>,
}

/// `POST /admin/products/{id}/allergens`: one transaction for the batch.
pub async fn add_product_allergens<S>(
  State(state): State<AppState<S>>,
  PathParam(product_id): PathParam<i64>,
  JsonBody(body): JsonBody<ProductAllergensBody>,
) -> Result<impl IntoResponse>
where
  S: AllergenStore + Clone + 'static,
{
  require_product(&state, product_id).await?;
  state
    .store
    .add_product_allergens(product_id, body.allergen_ids)
    .await
    .map_err(ApiError::classified(
      "add product allergens",
      "Allergen already linked",
      "Allergen not found",
    ))?;
  Ok(message("Product allergens updated successfully"))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternativesBody {
  pub alternative_ids: Vec<i64>,
}

/// `POST /admin/products/{id}/alternatives`
pub async fn add_alternatives<S>(
  State(state): State<AppState<S>>,
  PathParam(product_id): PathParam<i64>,
  JsonBody(body): JsonBody<AlternativesBody>,
) -> Result<impl IntoResponse>
where
  S: AllergenStore + Clone + 'static,
{
  require_product(&state, product_id).await?;
  if body.alternative_ids.contains(&product_id) {
    return Err(ApiError::bad_request("A product cannot be its own alternative"));
  }
  state
    .store
    .add_alternative_products(product_id, body.alternative_ids)
    .await
    .map_err(ApiError::classified(
      "add alternative products",
      "Alternative already linked",
      "Alternative product not found",
    ))?;
  Ok(message("Product alternatives updated successfully"))
}
