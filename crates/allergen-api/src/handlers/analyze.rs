//! `GET /analyze/{id}`: the allergen-match verdict for the caller.

use allergen_core::{
  analysis::{self, Analysis},
  store::AllergenStore,
};
use axum::{Json, extract::State};

use crate::{
  AppState,
  error::{ApiError, Result},
  extract::PathParam,
  session::SessionContext,
};

/// Records the lookup in the caller's search history whatever the verdict.
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  ctx: SessionContext,
  PathParam(product_id): PathParam<i64>,
) -> Result<Json<Analysis>>
where
  S: AllergenStore + Clone + 'static,
{
  analysis::analyze(state.store.as_ref(), ctx.user_id(), product_id)
    .await
    .map_err(ApiError::store("analyze product"))?
    .map(Json)
    .ok_or_else(|| ApiError::not_found("Product not found"))
}
