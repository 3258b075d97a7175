//! Handlers for account creation and the session lifecycle.
//!
//! | Method | Path | Access |
//! |--------|------|--------|
//! | `POST` | `/register` | public |
//! | `POST` | `/login` | public |
//! | `POST` | `/logout` | user |

use allergen_core::{
  password,
  store::AllergenStore,
  user::{NewUser, User},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::{message, present};
use crate::{
  AppState,
  error::{ApiError, Result},
  extract::JsonBody,
  session::{self, SessionContext},
};

// ─── Register ────────────────────────────────────────────────────────────────

/// Every field is optional at the JSON level so a missing one is reported
/// with the same message as an empty one. Any `isAdmin` in the body is
/// ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterBody {
  #[serde(default)]
  pub username:  Option<String>,
  #[serde(default)]
  pub password:  Option<String>,
  #[serde(default)]
  pub email:     Option<String>,
  #[serde(default)]
  pub full_name: Option<String>,
}

impl RegisterBody {
  fn into_new_user(self) -> Option<NewUser> {
    Some(NewUser {
      username:  present(self.username)?,
      password:  present(self.password)?,
      email:     present(self.email)?,
      full_name: present(self.full_name)?,
      is_admin:  false,
    })
  }
}

/// `POST /register`: create the account and start a session.
pub async fn register<S>(
  State(state): State<AppState<S>>,
  jar: CookieJar,
  JsonBody(body): JsonBody<RegisterBody>,
) -> Result<impl IntoResponse>
where
  S: AllergenStore + Clone + 'static,
{
  let input = body
    .into_new_user()
    .ok_or_else(|| ApiError::bad_request("Invalid data provided"))?;

  if state
    .store
    .get_user_by_email(&input.email)
    .await
    .map_err(ApiError::store("register: email check"))?
    .is_some()
  {
    return Err(ApiError::bad_request("Email already in use"));
  }
  if state
    .store
    .get_user_by_username(&input.username)
    .await
    .map_err(ApiError::store("register: username check"))?
    .is_some()
  {
    return Err(ApiError::bad_request("Username already taken"));
  }

  // A concurrent registration can still win the race to the unique index.
  let user = state
    .store
    .create_user(input)
    .await
    .map_err(ApiError::classified(
      "register",
      "Username or email already in use",
      "User not found",
    ))?;

  let jar = session::start(&state, jar, user.id).await?;
  tracing::info!(user_id = user.id, "registered user");
  Ok((StatusCode::CREATED, jar, Json(user)))
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  #[serde(default)]
  pub username: String,
  #[serde(default)]
  pub password: String,
}

/// `POST /login`: verify credentials and start a session.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  jar: CookieJar,
  JsonBody(body): JsonBody<LoginBody>,
) -> Result<(CookieJar, Json<User>)>
where
  S: AllergenStore + Clone + 'static,
{
  let found = state
    .store
    .get_user_by_username(&body.username)
    .await
    .map_err(ApiError::store("login"))?;

  // Unknown usernames still run one argon2 check so both failures cost the same.
  let user = match found {
    Some(user) if password::verify_password(&body.password, &user.password_hash) => user,
    Some(_) => return Err(reject_login(&body.username)),
    None => {
      password::verify_without_account(&body.password);
      return Err(reject_login(&body.username));
    }
  };

  let jar = session::start(&state, jar, user.id).await?;
  tracing::info!(user_id = user.id, "user logged in");
  Ok((jar, Json(user)))
}

fn reject_login(username: &str) -> ApiError {
  tracing::debug!(%username, "login rejected");
  ApiError::InvalidCredentials
}

// ─── Logout ──────────────────────────────────────────────────────────────────

/// `POST /logout`: destroy the session and expire the cookie.
pub async fn logout<S>(
  State(state): State<AppState<S>>,
  ctx: SessionContext,
  jar: CookieJar,
) -> Result<impl IntoResponse>
where
  S: AllergenStore + Clone + 'static,
{
  let jar = session::end(&state, jar, ctx.session_id).await?;
  tracing::info!(user_id = ctx.user_id(), "user logged out");
  Ok((jar, message("Logged out successfully")))
}
