//! Router-level tests: requests are driven through the full middleware stack
//! against an in-memory store.

use allergen_core::{seed, store::AllergenStore, user::NewUser};
use allergen_store_sqlite::SqliteStore;
use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, ServerConfig, router, session::SESSION_COOKIE};

const ADMIN_PASSWORD: &str = "admin-password";

async fn seeded_state() -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  seed::seed_catalog(&store, ADMIN_PASSWORD).await.unwrap();
  AppState::new(store, ServerConfig::default())
}

async fn empty_state() -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  AppState::new(store, ServerConfig::default())
}

struct Reply {
  status: StatusCode,
  cookie: Option<String>,
  body:   Value,
}

async fn send(
  state: &AppState<SqliteStore>,
  method: &str,
  uri: &str,
  cookie: Option<&str>,
  body: Option<Value>,
) -> Reply {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(cookie) = cookie {
    builder = builder.header(header::COOKIE, cookie);
  }
  let req = match body {
    Some(json) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(json.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let resp = router(state.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let cookie = resp
    .headers()
    .get(header::SET_COOKIE)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.split(';').next())
    .map(str::to_owned);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  Reply { status, cookie, body }
}

async fn register(state: &AppState<SqliteStore>, username: &str) -> String {
  let reply = send(
    state,
    "POST",
    "/api/register",
    None,
    Some(json!({
      "username": username,
      "password": "correct horse",
      "email": format!("{username}@example.com"),
      "fullName": "Test User",
    })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::CREATED, "{:?}", reply.body);
  reply.cookie.expect("session cookie")
}

async fn login(state: &AppState<SqliteStore>, username: &str, password: &str) -> Reply {
  send(
    state,
    "POST",
    "/api/login",
    None,
    Some(json!({ "username": username, "password": password })),
  )
  .await
}

async fn admin_cookie(state: &AppState<SqliteStore>) -> String {
  let reply = login(state, seed::ADMIN_USERNAME, ADMIN_PASSWORD).await;
  assert_eq!(reply.status, StatusCode::OK);
  reply.cookie.expect("session cookie")
}

async fn product_id(state: &AppState<SqliteStore>, number: &str) -> i64 {
  state
    .store
    .get_product_by_registration_number(number)
    .await
    .unwrap()
    .unwrap()
    .id
}

async fn allergen_id(state: &AppState<SqliteStore>, name: &str) -> i64 {
  state
    .store
    .list_allergens()
    .await
    .unwrap()
    .into_iter()
    .find(|a| a.name == name)
    .unwrap()
    .id
}

// ─── Guards ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn anonymous_user_routes_are_unauthorized() {
  let state = seeded_state().await;
  let reply = send(&state, "GET", "/api/user/allergens", None, None).await;
  assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
  assert_eq!(reply.body, json!({ "message": "Unauthorized" }));
}

#[tokio::test]
async fn garbage_session_cookie_is_anonymous() {
  let state = seeded_state().await;
  let cookie = format!("{SESSION_COOKIE}=not-a-uuid");
  let reply = send(&state, "GET", "/api/user", Some(&cookie), None).await;
  assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_distinguish_anonymous_and_member() {
  let state = seeded_state().await;

  let anonymous = send(&state, "GET", "/api/admin/users", None, None).await;
  assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

  let cookie = register(&state, "ada").await;
  for uri in ["/api/admin/users", "/api/products"] {
    let reply = send(&state, "GET", uri, Some(&cookie), None).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN, "{uri}");
    assert_eq!(reply.body, json!({ "message": "Forbidden: Admin access required" }));
  }

  let admin = admin_cookie(&state).await;
  let users = send(&state, "GET", "/api/admin/users", Some(&admin), None).await;
  assert_eq!(users.status, StatusCode::OK);
  assert_eq!(users.body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_paths_and_methods_answer_with_a_message() {
  let state = seeded_state().await;

  let missing = send(&state, "GET", "/api/nowhere", None, None).await;
  assert_eq!(missing.status, StatusCode::NOT_FOUND);
  assert_eq!(missing.body, json!({ "message": "Not found" }));

  let outside = send(&state, "GET", "/elsewhere", None, None).await;
  assert_eq!(outside.status, StatusCode::NOT_FOUND);
  assert_eq!(outside.body, json!({ "message": "Not found" }));

  let wrong = send(&state, "DELETE", "/api/allergens", None, None).await;
  assert_eq!(wrong.status, StatusCode::METHOD_NOT_ALLOWED);
  assert_eq!(wrong.body, json!({ "message": "Method not allowed" }));
}

// ─── Registration & login ────────────────────────────────────────────────────

#[tokio::test]
async fn register_starts_a_session_and_hides_password() {
  let state = seeded_state().await;
  let reply = send(
    &state,
    "POST",
    "/api/register",
    None,
    Some(json!({
      "username": "ada",
      "password": "correct horse",
      "email": "ada@example.com",
      "fullName": "Ada Obi",
      "isAdmin": true,
    })),
  )
  .await;

  assert_eq!(reply.status, StatusCode::CREATED);
  assert_eq!(reply.body["username"], "ada");
  assert_eq!(reply.body["isAdmin"], false);
  assert!(reply.body.get("password").is_none());
  assert!(reply.body.get("passwordHash").is_none());

  let cookie = reply.cookie.unwrap();
  assert!(cookie.starts_with(SESSION_COOKIE));
  let me = send(&state, "GET", "/api/user", Some(&cookie), None).await;
  assert_eq!(me.status, StatusCode::OK);
  assert_eq!(me.body["email"], "ada@example.com");
}

#[tokio::test]
async fn register_rejects_taken_email_then_username() {
  let state = seeded_state().await;
  register(&state, "ada").await;

  let same_email = send(
    &state,
    "POST",
    "/api/register",
    None,
    Some(json!({
      "username": "other",
      "password": "pw",
      "email": "ada@example.com",
      "fullName": "Other",
    })),
  )
  .await;
  assert_eq!(same_email.status, StatusCode::BAD_REQUEST);
  assert_eq!(same_email.body["message"], "Email already in use");

  let same_username = send(
    &state,
    "POST",
    "/api/register",
    None,
    Some(json!({
      "username": "ada",
      "password": "pw",
      "email": "fresh@example.com",
      "fullName": "Other",
    })),
  )
  .await;
  assert_eq!(same_username.status, StatusCode::BAD_REQUEST);
  assert_eq!(same_username.body["message"], "Username already taken");
}

#[tokio::test]
async fn register_requires_every_field() {
  let state = seeded_state().await;
  let reply = send(
    &state,
    "POST",
    "/api/register",
    None,
    Some(json!({ "username": "ada", "password": "pw", "email": "" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["message"], "Invalid data provided");
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
  let state = seeded_state().await;
  register(&state, "ada").await;

  let wrong_password = login(&state, "ada", "nope").await;
  let unknown_user = login(&state, "nobody", "correct horse").await;

  assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
  assert_eq!(unknown_user.status, StatusCode::UNAUTHORIZED);
  assert_eq!(wrong_password.body, unknown_user.body);
  assert_eq!(wrong_password.body["message"], "Invalid credentials");
  assert!(wrong_password.cookie.is_none());
}

#[tokio::test]
async fn login_reports_admin_flag() {
  let state = seeded_state().await;
  let reply = login(&state, seed::ADMIN_USERNAME, ADMIN_PASSWORD).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["isAdmin"], true);
}

#[tokio::test]
async fn logout_destroys_the_session() {
  let state = seeded_state().await;
  let cookie = register(&state, "ada").await;

  let reply = send(&state, "POST", "/api/logout", Some(&cookie), None).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["message"], "Logged out successfully");

  let after = send(&state, "GET", "/api/user", Some(&cookie), None).await;
  assert_eq!(after.status, StatusCode::UNAUTHORIZED);
}

// ─── Profile ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn patch_user_validates_fields() {
  let state = seeded_state().await;
  register(&state, "bola").await;
  let cookie = register(&state, "ada").await;

  let empty = send(&state, "PATCH", "/api/user", Some(&cookie), Some(json!({}))).await;
  assert_eq!(empty.status, StatusCode::BAD_REQUEST);
  assert_eq!(empty.body["message"], "No fields to update");

  let taken = send(
    &state,
    "PATCH",
    "/api/user",
    Some(&cookie),
    Some(json!({ "email": "bola@example.com" })),
  )
  .await;
  assert_eq!(taken.status, StatusCode::BAD_REQUEST);
  assert_eq!(taken.body["message"], "Email already in use");

  let renamed = send(
    &state,
    "PATCH",
    "/api/user",
    Some(&cookie),
    Some(json!({ "fullName": "Ada N. Obi" })),
  )
  .await;
  assert_eq!(renamed.status, StatusCode::OK);
  assert_eq!(renamed.body["fullName"], "Ada N. Obi");
  assert_eq!(renamed.body["email"], "ada@example.com");
}

#[tokio::test]
async fn allergen_profile_add_and_remove() {
  let state = seeded_state().await;
  let cookie = register(&state, "ada").await;
  let milk = allergen_id(&state, "Milk").await;
  let soy = allergen_id(&state, "Soy").await;

  let added = send(
    &state,
    "POST",
    "/api/user/allergens",
    Some(&cookie),
    Some(json!({ "allergenIds": [milk, soy, milk] })),
  )
  .await;
  assert_eq!(added.status, StatusCode::OK);
  assert_eq!(added.body["message"], "Allergens added successfully");

  let listed = send(&state, "GET", "/api/user/allergens", Some(&cookie), None).await;
  assert_eq!(listed.body.as_array().unwrap().len(), 2);

  for _ in 0..2 {
    let removed = send(
      &state,
      "DELETE",
      &format!("/api/user/allergens/{milk}"),
      Some(&cookie),
      None,
    )
    .await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.body["message"], "Allergen removed successfully");
  }

  let listed = send(&state, "GET", "/api/user/allergens", Some(&cookie), None).await;
  assert_eq!(listed.body[0]["name"], "Soy");
}

#[tokio::test]
async fn unknown_allergen_is_404_and_writes_nothing() {
  let state = seeded_state().await;
  let cookie = register(&state, "ada").await;
  let milk = allergen_id(&state, "Milk").await;

  let reply = send(
    &state,
    "POST",
    "/api/user/allergens",
    Some(&cookie),
    Some(json!({ "allergenIds": [milk, 9999] })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::NOT_FOUND);

  let listed = send(&state, "GET", "/api/user/allergens", Some(&cookie), None).await;
  assert_eq!(listed.body, json!([]));
}

#[tokio::test]
async fn malformed_bodies_and_ids_are_bad_requests() {
  let state = seeded_state().await;
  let cookie = register(&state, "ada").await;

  let not_array = send(
    &state,
    "POST",
    "/api/user/allergens",
    Some(&cookie),
    Some(json!({ "allergenIds": "milk" })),
  )
  .await;
  assert_eq!(not_array.status, StatusCode::BAD_REQUEST);
  assert!(not_array.body["message"].is_string());

  let bad_id = send(&state, "GET", "/api/analyze/abc", Some(&cookie), None).await;
  assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn registration_lookup() {
  let state = seeded_state().await;

  let found = send(&state, "GET", "/api/products/registration/A1-0456", None, None).await;
  assert_eq!(found.status, StatusCode::OK);
  assert_eq!(found.body["name"], "Cowbell Milk Powder");
  assert_eq!(found.body["registrationNumber"], "A1-0456");

  let missing = send(&state, "GET", "/api/products/registration/Z9-9999", None, None).await;
  assert_eq!(missing.status, StatusCode::NOT_FOUND);
  assert_eq!(missing.body, json!({ "message": "Product not found" }));
}

#[tokio::test]
async fn name_search() {
  let state = seeded_state().await;

  let hits = send(&state, "GET", "/api/products/search?name=noodles", None, None).await;
  assert_eq!(hits.status, StatusCode::OK);
  assert_eq!(hits.body[0]["registrationNumber"], "A1-1011");

  let missing = send(&state, "GET", "/api/products/search", None, None).await;
  assert_eq!(missing.status, StatusCode::BAD_REQUEST);
  assert_eq!(missing.body["message"], "Name parameter is required");
}

#[tokio::test]
async fn product_allergens_are_public() {
  let state = seeded_state().await;
  let spaghetti = product_id(&state, "A1-0789").await;
  let reply = send(
    &state,
    "GET",
    &format!("/api/products/{spaghetti}/allergens"),
    None,
    None,
  )
  .await;
  assert_eq!(reply.status, StatusCode::OK);
  let names: Vec<_> = reply
    .body
    .as_array()
    .unwrap()
    .iter()
    .map(|a| a["name"].as_str().unwrap())
    .collect();
  assert_eq!(names, ["Wheat", "Gluten"]);
}

// ─── Analysis & history ──────────────────────────────────────────────────────

#[tokio::test]
async fn milk_allergic_user_analyzes_cowbell() {
  let state = seeded_state().await;
  let cookie = register(&state, "ada").await;
  let milk = allergen_id(&state, "Milk").await;
  send(
    &state,
    "POST",
    "/api/user/allergens",
    Some(&cookie),
    Some(json!({ "allergenIds": [milk] })),
  )
  .await;

  let product = send(&state, "GET", "/api/products/registration/A1-0456", None, None).await;
  let id = product.body["id"].as_i64().unwrap();

  let reply = send(&state, "GET", &format!("/api/analyze/{id}"), Some(&cookie), None).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["product"], product.body);
  let matches = reply.body["matchingAllergens"].as_array().unwrap();
  assert_eq!(matches.len(), 1);
  assert_eq!(matches[0]["id"], milk);
  assert_eq!(matches[0]["name"], "Milk");

  let history = send(&state, "GET", "/api/user/history", Some(&cookie), None).await;
  assert_eq!(history.body.as_array().unwrap().len(), 1);
  assert_eq!(history.body[0]["product"]["id"], id);
  assert!(history.body[0]["createdAt"].is_string());
}

#[tokio::test]
async fn analyze_unknown_product_is_404() {
  let state = seeded_state().await;
  let cookie = register(&state, "ada").await;
  let reply = send(&state, "GET", "/api/analyze/4242", Some(&cookie), None).await;
  assert_eq!(reply.status, StatusCode::NOT_FOUND);
  assert_eq!(reply.body["message"], "Product not found");
}

#[tokio::test]
async fn alternatives_are_filtered_for_the_caller() {
  let state = seeded_state().await;
  let admin = admin_cookie(&state).await;
  let cookie = register(&state, "ada").await;
  let milk = allergen_id(&state, "Milk").await;

  let cowbell = product_id(&state, "A1-0456").await;
  let hollandia = product_id(&state, "A1-1213").await;
  let spaghetti = product_id(&state, "A1-0789").await;

  let linked = send(
    &state,
    "POST",
    &format!("/api/admin/products/{cowbell}/alternatives"),
    Some(&admin),
    Some(json!({ "alternativeIds": [hollandia, spaghetti] })),
  )
  .await;
  assert_eq!(linked.status, StatusCode::OK);

  send(
    &state,
    "POST",
    "/api/user/allergens",
    Some(&cookie),
    Some(json!({ "allergenIds": [milk] })),
  )
  .await;

  let reply = send(
    &state,
    "GET",
    &format!("/api/products/{cowbell}/alternatives"),
    Some(&cookie),
    None,
  )
  .await;
  assert_eq!(reply.status, StatusCode::OK);
  let ids: Vec<_> = reply
    .body
    .as_array()
    .unwrap()
    .iter()
    .map(|p| p["id"].as_i64().unwrap())
    .collect();
  assert_eq!(ids, [spaghetti]);
}

#[tokio::test]
async fn history_limit_and_manual_append() {
  let state = seeded_state().await;
  let cookie = register(&state, "ada").await;

  for number in ["A1-0123", "A1-0456", "A1-0789"] {
    let id = product_id(&state, number).await;
    let reply = send(
      &state,
      "POST",
      "/api/user/history",
      Some(&cookie),
      Some(json!({ "productId": id })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["message"], "Added to search history");
  }

  let two = send(&state, "GET", "/api/user/history?limit=2", Some(&cookie), None).await;
  let numbers: Vec<_> = two
    .body
    .as_array()
    .unwrap()
    .iter()
    .map(|e| e["product"]["registrationNumber"].as_str().unwrap())
    .collect();
  assert_eq!(numbers, ["A1-0789", "A1-0456"]);

  for bad in ["0", "-1", "abc"] {
    let reply = send(
      &state,
      "GET",
      &format!("/api/user/history?limit={bad}"),
      Some(&cookie),
      None,
    )
    .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST, "limit={bad}");
  }

  let unknown = send(
    &state,
    "POST",
    "/api/user/history",
    Some(&cookie),
    Some(json!({ "productId": 31337 })),
  )
  .await;
  assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

// ─── Admin writes ────────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_creates_allergen_once() {
  let state = empty_state().await;
  state
    .store
    .create_user(NewUser {
      username:  "root".into(),
      password:  "root-password".into(),
      email:     "root@example.com".into(),
      full_name: "Root".into(),
      is_admin:  true,
    })
    .await
    .unwrap();
  let admin = login(&state, "root", "root-password").await.cookie.unwrap();

  let body = json!({
    "name": "Sesame",
    "icon": "sesame",
    "description": "Seeds and oils that can trigger reactions",
  });
  let created = send(&state, "POST", "/api/admin/allergens", Some(&admin), Some(body.clone())).await;
  assert_eq!(created.status, StatusCode::CREATED);
  assert_eq!(created.body["name"], "Sesame");

  let again = send(&state, "POST", "/api/admin/allergens", Some(&admin), Some(body)).await;
  assert_eq!(again.status, StatusCode::BAD_REQUEST);

  let catalog = send(&state, "GET", "/api/allergens", None, None).await;
  let sesame = catalog
    .body
    .as_array()
    .unwrap()
    .iter()
    .filter(|a| a["name"] == "Sesame")
    .count();
  assert_eq!(sesame, 1);
}

#[tokio::test]
async fn admin_allergen_requires_all_fields() {
  let state = seeded_state().await;
  let admin = admin_cookie(&state).await;
  let reply = send(
    &state,
    "POST",
    "/api/admin/allergens",
    Some(&admin),
    Some(json!({ "name": "Lupin" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["message"], "All fields are required");
}

#[tokio::test]
async fn admin_creates_product_and_links_allergens() {
  let state = seeded_state().await;
  let admin = admin_cookie(&state).await;
  let sesame = allergen_id(&state, "Sesame").await;

  let created = send(
    &state,
    "POST",
    "/api/admin/products",
    Some(&admin),
    Some(json!({
      "name": "Sesame Crackers",
      "manufacturer": "Crunchy Ltd",
      "registrationNumber": "B2-0001",
      "ingredients": "Wheat flour, sesame seeds, salt",
    })),
  )
  .await;
  assert_eq!(created.status, StatusCode::CREATED);
  let id = created.body["id"].as_i64().unwrap();

  let linked = send(
    &state,
    "POST",
    &format!("/api/admin/products/{id}/allergens"),
    Some(&admin),
    Some(json!({ "allergenIds": [sesame] })),
  )
  .await;
  assert_eq!(linked.status, StatusCode::OK);
  assert_eq!(linked.body["message"], "Product allergens updated successfully");

  let missing = send(
    &state,
    "POST",
    "/api/admin/products/9999/allergens",
    Some(&admin),
    Some(json!({ "allergenIds": [sesame] })),
  )
  .await;
  assert_eq!(missing.status, StatusCode::NOT_FOUND);
  assert_eq!(missing.body["message"], "Product not found");

  let listing = send(&state, "GET", "/api/products", Some(&admin), None).await;
  assert_eq!(listing.body.as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn duplicate_registration_number_is_bad_request() {
  let state = seeded_state().await;
  let admin = admin_cookie(&state).await;
  let reply = send(
    &state,
    "POST",
    "/api/admin/products",
    Some(&admin),
    Some(json!({
      "name": "Copycat",
      "manufacturer": "Someone",
      "registrationNumber": "A1-0123",
      "ingredients": "water",
    })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["message"], "Registration number already in use");
}
