//! Cookie-backed sessions and the per-route access gate.
//!
//! A session id lives in the `allergen_session` cookie; the session itself is
//! a row in the store. Every non-public route runs [`enforce`], which resolves
//! the cookie into a [`SessionContext`], evaluates the route's [`Access`]
//! requirement, and hands the context to the handler through the request
//! extensions.

use allergen_core::{
  access::{Access, Principal, authorize},
  store::AllergenStore,
  user::User,
};
use axum::{
  extract::{FromRequestParts, Request, State},
  http::request::Parts,
  middleware::Next,
  response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use crate::{AppState, error::ApiError};

pub const SESSION_COOKIE: &str = "allergen_session";

// ─── Session context ─────────────────────────────────────────────────────────

/// The authenticated caller of the current request.
#[derive(Debug, Clone)]
pub struct SessionContext {
  pub session_id: Uuid,
  pub user:       User,
}

impl SessionContext {
  pub fn principal(&self) -> Principal {
    Principal::Member { user_id: self.user.id, is_admin: self.user.is_admin }
  }

  pub fn user_id(&self) -> i64 { self.user.id }
}

/// Only available on routes behind [`enforce`]; anywhere else the handler is
/// rejected as unauthenticated.
impl<S: Send + Sync> FromRequestParts<S> for SessionContext {
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<SessionContext>()
      .cloned()
      .ok_or(ApiError::Unauthorized)
  }
}

/// Resolve the session cookie into a live session and its user.
///
/// A missing, malformed, expired or orphaned session is `None`.
pub async fn resolve<S: AllergenStore>(
  state: &AppState<S>,
  jar: &CookieJar,
) -> Result<Option<SessionContext>, ApiError> {
  let Some(session_id) = jar
    .get(SESSION_COOKIE)
    .and_then(|c| Uuid::parse_str(c.value()).ok())
  else {
    return Ok(None);
  };

  let Some(session) = state
    .store
    .get_session(session_id)
    .await
    .map_err(ApiError::store("load session"))?
  else {
    return Ok(None);
  };

  let user = state
    .store
    .get_user(session.user_id)
    .await
    .map_err(ApiError::store("load session user"))?;

  Ok(user.map(|user| SessionContext { session_id, user }))
}

// ─── Cookie lifecycle ────────────────────────────────────────────────────────

/// Create a session for `user_id` and add its cookie to `jar`.
///
/// Any session the jar already carried is destroyed first, so a login never
/// reuses an id issued before authentication.
pub async fn start<S: AllergenStore>(
  state: &AppState<S>,
  jar: CookieJar,
  user_id: i64,
) -> Result<CookieJar, ApiError> {
  if let Some(previous) = jar
    .get(SESSION_COOKIE)
    .and_then(|c| Uuid::parse_str(c.value()).ok())
  {
    state
      .store
      .destroy_session(previous)
      .await
      .map_err(ApiError::store("destroy previous session"))?;
  }

  let session = state
    .store
    .create_session(user_id, state.config.session_ttl())
    .await
    .map_err(ApiError::store("create session"))?;

  let cookie = Cookie::build((SESSION_COOKIE, session.id.to_string()))
    .path("/")
    .http_only(true)
    .same_site(SameSite::Lax)
    .secure(state.config.secure_cookies)
    .max_age(time::Duration::hours(state.config.session_ttl_hours));

  Ok(jar.add(cookie))
}

/// Destroy the session server-side and expire the cookie.
pub async fn end<S: AllergenStore>(
  state: &AppState<S>,
  jar: CookieJar,
  session_id: Uuid,
) -> Result<CookieJar, ApiError> {
  state
    .store
    .destroy_session(session_id)
    .await
    .map_err(|e| ApiError::Logout(Box::new(e)))?;
  Ok(jar.remove(Cookie::build(SESSION_COOKIE).path("/")))
}

// ─── Gate ────────────────────────────────────────────────────────────────────

/// Middleware state: the shared app state plus the requirement of the routes
/// the gate is layered on.
#[derive(Clone)]
pub struct Gate<S: AllergenStore> {
  pub state:  AppState<S>,
  pub access: Access,
}

impl<S: AllergenStore> Gate<S> {
  pub fn new(state: AppState<S>, access: Access) -> Self { Self { state, access } }
}

/// Evaluate the gate's requirement against the caller's session.
pub async fn enforce<S>(
  State(gate): State<Gate<S>>,
  jar: CookieJar,
  mut req: Request,
  next: Next,
) -> Result<Response, ApiError>
where
  S: AllergenStore + Clone + 'static,
{
  let context = match gate.access {
    Access::Public => None,
    Access::User | Access::Admin => resolve(&gate.state, &jar).await?,
  };

  let principal = context
    .as_ref()
    .map_or(Principal::Anonymous, SessionContext::principal);

  if let Err(denial) = authorize(gate.access, &principal) {
    tracing::debug!(
      path = %req.uri().path(),
      access = %gate.access,
      user_id = ?principal.user_id(),
      "request denied: {denial}"
    );
    return Err(denial.into());
  }

  if let Some(context) = context {
    req.extensions_mut().insert(context);
  }
  Ok(next.run(req).await)
}
