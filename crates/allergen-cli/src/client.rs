//! Async HTTP client wrapping the allergen JSON API.
//!
//! The server identifies callers by the `allergen_session` cookie. The client
//! keeps that cookie itself so it can be persisted between invocations.

use std::{
  sync::{Mutex, PoisonError},
  time::Duration,
};

use allergen_core::{
  analysis::Analysis,
  catalog::{Allergen, Product},
  history::SearchHistoryEntry,
  user::User,
};
use reqwest::{Client, Method, RequestBuilder, StatusCode, header};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use thiserror::Error;

const SESSION_COOKIE: &str = "allergen_session";

// ─── Errors ──────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ClientError {
  /// The server answered with a non-success status and a `{"message"}` body.
  #[error("{message} ({status})")]
  Api { status: StatusCode, message: String },

  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("unexpected response body: {0}")]
  Decode(#[from] serde_json::Error),
}

impl ClientError {
  pub fn status(&self) -> Option<StatusCode> {
    match self {
      Self::Api { status, .. } => Some(*status),
      Self::Transport(e) => e.status(),
      Self::Decode(_) => None,
    }
  }

  pub fn is_unauthorized(&self) -> bool { self.status() == Some(StatusCode::UNAUTHORIZED) }

  /// Transport failures and 5xx answers may succeed on a second attempt;
  /// client errors never will.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Api { status, .. } => status.is_server_error(),
      Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
      Self::Decode(_) => false,
    }
  }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(Deserialize)]
struct MessageBody {
  message: String,
}

// ─── Request bodies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
  pub username:  String,
  pub password:  String,
  pub email:     String,
  pub full_name: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub full_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email:     Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllergenDraft {
  pub name:        String,
  pub icon:        String,
  pub description: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
  pub name:                String,
  pub manufacturer:        String,
  pub registration_number: String,
  pub ingredients:         String,
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Async HTTP client for the allergen JSON API.
pub struct ApiClient {
  client:   Client,
  base_url: String,
  /// `name=value` pair of the current session cookie.
  session:  Mutex<Option<String>>,
}

impl ApiClient {
  pub fn new(base_url: impl Into<String>, session: Option<String>) -> Result<Self> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self { client, base_url: base_url.into(), session: Mutex::new(session) })
  }

  /// The session cookie to persist, if logged in.
  pub fn session(&self) -> Option<String> {
    self.session.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.base_url.trim_end_matches('/'), path)
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    let req = self.client.request(method, self.url(path));
    match self.session() {
      Some(cookie) => req.header(header::COOKIE, cookie),
      None => req,
    }
  }

  /// Track `Set-Cookie` for the session cookie. An empty value is the
  /// server expiring it.
  fn absorb_cookies(&self, headers: &header::HeaderMap) {
    for value in headers.get_all(header::SET_COOKIE) {
      let Ok(raw) = value.to_str() else { continue };
      let pair = raw.split(';').next().unwrap_or_default().trim();
      let Some(token) = pair.strip_prefix(SESSION_COOKIE).and_then(|r| r.strip_prefix('='))
      else {
        continue;
      };
      let mut session = self.session.lock().unwrap_or_else(PoisonError::into_inner);
      *session = (!token.is_empty()).then(|| pair.to_owned());
    }
  }

  async fn execute<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
    let resp = req.send().await?;
    self.absorb_cookies(resp.headers());

    let status = resp.status();
    let bytes = resp.bytes().await?;
    if !status.is_success() {
      let message = serde_json::from_slice::<MessageBody>(&bytes)
        .map(|b| b.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
      tracing::debug!(%status, %message, "api error");
      return Err(ClientError::Api { status, message });
    }
    Ok(serde_json::from_slice(&bytes)?)
  }

  async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
    self.execute(self.request(Method::GET, path)).await
  }

  async fn send<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
  where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
  {
    self.execute(self.request(method, path).json(body)).await
  }

  /// For endpoints answering `{"message"}` on success.
  async fn send_for_message<B>(&self, method: Method, path: &str, body: &B) -> Result<String>
  where
    B: Serialize + ?Sized,
  {
    let reply: MessageBody = self.send(method, path, body).await?;
    Ok(reply.message)
  }

  // ── Session ───────────────────────────────────────────────────────────────

  /// `GET /api/user`
  pub async fn current_user(&self) -> Result<User> { self.get("/user").await }

  /// `POST /api/register`
  pub async fn register(&self, registration: &Registration) -> Result<User> {
    self.send(Method::POST, "/register", registration).await
  }

  /// `POST /api/login`
  pub async fn login(&self, username: &str, password: &str) -> Result<User> {
    let body = json!({ "username": username, "password": password });
    self.send(Method::POST, "/login", &body).await
  }

  /// `POST /api/logout`
  pub async fn logout(&self) -> Result<String> {
    let reply: MessageBody = self.execute(self.request(Method::POST, "/logout")).await?;
    Ok(reply.message)
  }

  // ── Profile ───────────────────────────────────────────────────────────────

  /// `PATCH /api/user`
  pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
    self.send(Method::PATCH, "/user", update).await
  }

  /// `GET /api/user/allergens`
  pub async fn user_allergens(&self) -> Result<Vec<Allergen>> { self.get("/user/allergens").await }

  /// `POST /api/user/allergens`
  pub async fn add_user_allergens(&self, allergen_ids: &[i64]) -> Result<String> {
    let body = json!({ "allergenIds": allergen_ids });
    self.send_for_message(Method::POST, "/user/allergens", &body).await
  }

  /// `DELETE /api/user/allergens/{id}`
  pub async fn remove_user_allergen(&self, allergen_id: i64) -> Result<String> {
    let path = format!("/user/allergens/{allergen_id}");
    let reply: MessageBody = self.execute(self.request(Method::DELETE, &path)).await?;
    Ok(reply.message)
  }

  /// `GET /api/user/history[?limit=N]`
  pub async fn history(&self, limit: Option<usize>) -> Result<Vec<SearchHistoryEntry>> {
    match limit {
      Some(n) => self.get(&format!("/user/history?limit={n}")).await,
      None => self.get("/user/history").await,
    }
  }

  // ── Catalog ───────────────────────────────────────────────────────────────

  /// `GET /api/allergens`
  pub async fn allergens(&self) -> Result<Vec<Allergen>> { self.get("/allergens").await }

  /// `GET /api/products/registration/{number}`
  pub async fn product_by_registration(&self, number: &str) -> Result<Product> {
    self.get(&format!("/products/registration/{number}")).await
  }

  /// `GET /api/products/search?name=`
  pub async fn search_products(&self, name: &str) -> Result<Vec<Product>> {
    let req = self.request(Method::GET, "/products/search").query(&[("name", name)]);
    self.execute(req).await
  }

  /// `GET /api/analyze/{id}`: also appends to the caller's history.
  pub async fn analyze(&self, product_id: i64) -> Result<Analysis> {
    self.get(&format!("/analyze/{product_id}")).await
  }

  // ── Admin ─────────────────────────────────────────────────────────────────

  /// `GET /api/admin/users`
  pub async fn users(&self) -> Result<Vec<User>> { self.get("/admin/users").await }

  /// `GET /api/products`
  pub async fn products(&self) -> Result<Vec<Product>> { self.get("/products").await }

  /// `POST /api/admin/allergens`
  pub async fn create_allergen(&self, draft: &AllergenDraft) -> Result<Allergen> {
    self.send(Method::POST, "/admin/allergens", draft).await
  }

  /// `POST /api/admin/products`
  pub async fn create_product(&self, draft: &ProductDraft) -> Result<Product> {
    self.send(Method::POST, "/admin/products", draft).await
  }

  /// `POST /api/admin/products/{id}/allergens`
  pub async fn link_product_allergens(&self, product_id: i64, allergen_ids: &[i64]) -> Result<String> {
    let body = json!({ "allergenIds": allergen_ids });
    let path = format!("/admin/products/{product_id}/allergens");
    self.send_for_message(Method::POST, &path, &body).await
  }

  /// `POST /api/admin/products/{id}/alternatives`
  pub async fn link_alternatives(&self, product_id: i64, alternative_ids: &[i64]) -> Result<String> {
    let body = json!({ "alternativeIds": alternative_ids });
    let path = format!("/admin/products/{product_id}/alternatives");
    self.send_for_message(Method::POST, &path, &body).await
  }
}
