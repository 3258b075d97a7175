//! Read-only catalog handlers.
//!
//! | Method | Path | Access |
//! |--------|------|--------|
//! | `GET`  | `/allergens` | public |
//! | `GET`  | `/products/registration/{number}` | public, 404 if absent |
//! | `GET`  | `/products/search?name=` | public |
//! | `GET`  | `/products/{id}/allergens` | public |
//! | `GET`  | `/products/{id}/alternatives` | user |

use allergen_core::{
  catalog::{Allergen, Product},
  store::AllergenStore,
};
use axum::{Json, extract::State};
use serde::Deserialize;

use super::present;
use crate::{
  AppState,
  error::{ApiError, Result},
  extract::{PathParam, QueryParams},
  session::SessionContext,
};

/// `GET /allergens`
pub async fn allergens<S>(State(state): State<AppState<S>>) -> Result<Json<Vec<Allergen>>>
where
  S: AllergenStore + Clone + 'static,
{
  let allergens = state
    .store
    .list_allergens()
    .await
    .map_err(ApiError::store("get allergens"))?;
  Ok(Json(allergens))
}

/// `GET /products/registration/{number}`
pub async fn by_registration<S>(
  State(state): State<AppState<S>>,
  PathParam(number): PathParam<String>,
) -> Result<Json<Product>>
where
  S: AllergenStore + Clone + 'static,
{
  state
    .store
    .get_product_by_registration_number(&number)
    .await
    .map_err(ApiError::store("get product by registration number"))?
    .map(Json)
    .ok_or_else(|| ApiError::not_found("Product not found"))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
  pub name: Option<String>,
}

/// `GET /products/search?name=`
pub async fn search<S>(
  State(state): State<AppState<S>>,
  QueryParams(params): QueryParams<SearchParams>,
) -> Result<Json<Vec<Product>>>
where
  S: AllergenStore + Clone + 'static,
{
  let name = present(params.name).ok_or_else(|| ApiError::bad_request("Name parameter is required"))?;
  let products = state
    .store
    .search_products_by_name(&name)
    .await
    .map_err(ApiError::store("search products"))?;
  Ok(Json(products))
}

/// `GET /products/{id}/allergens`: an unknown product simply has none.
pub async fn product_allergens<S>(
  State(state): State<AppState<S>>,
  PathParam(product_id): PathParam<i64>,
) -> Result<Json<Vec<Allergen>>>
where
  S: AllergenStore + Clone + 'static,
{
  let allergens = state
    .store
    .get_product_allergens(product_id)
    .await
    .map_err(ApiError::store("get product allergens"))?;
  Ok(Json(allergens))
}

/// `GET /products/{id}/alternatives`: alternatives safe for the caller.
pub async fn alternatives<S>(
  State(state): State<AppState<S>>,
  ctx: SessionContext,
  PathParam(product_id): PathParam<i64>,
) -> Result<Json<Vec<Product>>>
where
  S: AllergenStore + Clone + 'static,
{
  let excluded = state
    .store
    .get_user_allergens(ctx.user_id())
    .await
    .map_err(ApiError::store("get alternatives: user allergens"))?
    .into_iter()
    .map(|a| a.id)
    .collect();

  let products = state
    .store
    .get_alternative_products(product_id, excluded)
    .await
    .map_err(ApiError::store("get alternatives"))?;
  Ok(Json(products))
}
