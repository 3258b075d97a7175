//! Handlers for the caller's own account: profile, allergen profile and
//! search history. Every route here requires a session.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/user` | |
//! | `PATCH`  | `/user` | Body: `{"fullName"?, "email"?}` |
//! | `GET`    | `/user/allergens` | |
//! | `POST`   | `/user/allergens` | Body: `{"allergenIds":[..]}` |
//! | `DELETE` | `/user/allergens/{id}` | Absent pair still succeeds |
//! | `GET`    | `/user/history` | Optional `?limit=N`, default 5 |
//! | `POST`   | `/user/history` | Body: `{"productId":N}` |

use allergen_core::{
  catalog::Allergen,
  history::{DEFAULT_HISTORY_LIMIT, SearchHistoryEntry},
  store::AllergenStore,
  user::{User, UserUpdate},
};
use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;

use super::{message, present};
use crate::{
  AppState,
  error::{ApiError, Result},
  extract::{JsonBody, PathParam, QueryParams},
  session::SessionContext,
};

// ─── Profile ─────────────────────────────────────────────────────────────────

/// `GET /user`
pub async fn current(ctx: SessionContext) -> Json<User> { Json(ctx.user) }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBody {
  #[serde(default)]
  pub full_name: Option<String>,
  #[serde(default)]
  pub email:     Option<String>,
}

/// `PATCH /user`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  ctx: SessionContext,
  JsonBody(body): JsonBody<UpdateBody>,
) -> Result<Json<User>>
where
  S: AllergenStore + Clone + 'static,
{
  let update = UserUpdate { full_name: present(body.full_name), email: present(body.email) };
  if update.is_empty() {
    return Err(ApiError::bad_request("No fields to update"));
  }

  if let Some(email) = &update.email {
    let holder = state
      .store
      .get_user_by_email(email)
      .await
      .map_err(ApiError::store("update user: email check"))?;
    if holder.is_some_and(|other| other.id != ctx.user_id()) {
      return Err(ApiError::bad_request("Email already in use"));
    }
  }

  let user = state
    .store
    .update_user(ctx.user_id(), update)
    .await
    .map_err(ApiError::classified("update user", "Email already in use", "User not found"))?;
  Ok(Json(user))
}

// ─── Allergen profile ────────────────────────────────────────────────────────

/// `GET /user/allergens`
pub async fn allergens<S>(
  State(state): State<AppState<S>>,
  ctx: SessionContext,
) -> Result<Json<Vec<Allergen>>>
where
  S: AllergenStore + Clone + 'static,
{
  let allergens = state
    .store
    .get_user_allergens(ctx.user_id())
    .await
    .map_err(ApiError::store("get user allergens"))?;
  Ok(Json(allergens))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllergenIdsBody {
  pub allergen_ids: Vec<i64>,
}

/// `POST /user/allergens`: all-or-nothing; re-adding is a no-op.
pub async fn add_allergens<S>(
  State(state): State<AppState<S>>,
  ctx: SessionContext,
  JsonBody(body): JsonBody<AllergenIdsBody>,
) -> Result<impl IntoResponse>
where
  S: AllergenStore + Clone + 'static,
{
  state
    .store
    .add_user_allergens(ctx.user_id(), body.allergen_ids)
    .await
    .map_err(ApiError::classified(
      "add user allergens",
      "Allergen already added",
      "Allergen not found",
    ))?;
  Ok(message("Allergens added successfully"))
}

/// `DELETE /user/allergens/{id}`
pub async fn remove_allergen<S>(
  State(state): State<AppState<S>>,
  ctx: SessionContext,
  PathParam(allergen_id): PathParam<i64>,
) -> Result<impl IntoResponse>
where
  S: AllergenStore + Clone + 'static,
{
  state
    .store
    .remove_user_allergen(ctx.user_id(), allergen_id)
    .await
    .map_err(ApiError::store("remove user allergen"))?;
  Ok(message("Allergen removed successfully"))
}

// ─── Search history ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  pub limit: Option<usize>,
}

/// `GET /user/history[?limit=N]`
pub async fn history<S>(
  State(state): State<AppState<S>>,
  ctx: SessionContext,
  QueryParams(params): QueryParams<HistoryParams>,
) -> Result<Json<Vec<SearchHistoryEntry>>>
where
  S: AllergenStore + Clone + 'static,
{
  let limit = match params.limit {
    None => DEFAULT_HISTORY_LIMIT,
    Some(0) => return Err(ApiError::bad_request("limit must be a positive integer")),
    Some(n) => n,
  };

  let entries = state
    .store
    .get_user_search_history(ctx.user_id(), limit)
    .await
    .map_err(ApiError::store("get search history"))?;
  Ok(Json(entries))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryBody {
  pub product_id: i64,
}

/// `POST /user/history`
pub async fn record_history<S>(
  State(state): State<AppState<S>>,
  ctx: SessionContext,
  JsonBody(body): JsonBody<HistoryBody>,
) -> Result<impl IntoResponse>
where
  S: AllergenStore + Clone + 'static,
{
  state
    .store
    .add_to_search_history(ctx.user_id(), body.product_id)
    .await
    .map_err(ApiError::classified(
      "add to search history",
      "Duplicate history entry",
      "Product not found",
    ))?;
  Ok(message("Added to search history"))
}
