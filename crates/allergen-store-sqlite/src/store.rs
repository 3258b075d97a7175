//! [`SqliteStore`]: the SQLite implementation of [`AllergenStore`].

use std::path::Path;

use allergen_core::{
  catalog::{Allergen, NewAllergen, NewProduct, Product},
  history::{SearchHistoryEntry, SearchHistoryItem},
  password,
  session::Session,
  store::AllergenStore,
  user::{NewUser, User, UserUpdate},
};
use chrono::Duration;
use rusqlite::{OptionalExtension as _, functions::FunctionFlags, types::Value};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    ALLERGEN_COLUMNS, PRODUCT_COLUMNS, RawAllergen, RawHistoryEntry, RawProduct, RawSession,
    RawUser, USER_COLUMNS, encode_dt, encode_uuid, now,
  },
  error::classify,
  schema::SCHEMA,
};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn row_exists(conn: &rusqlite::Connection, table: &str, id: i64) -> rusqlite::Result<bool> {
  conn
    .query_row(&format!("SELECT 1 FROM {table} WHERE id = ?1"), [id], |_| Ok(()))
    .optional()
    .map(|found| found.is_some())
}

/// Escape LIKE wildcards so user input only ever matches literally.
fn like_pattern(needle: &str) -> String {
  let mut escaped = String::with_capacity(needle.len() + 2);
  escaped.push('%');
  for c in needle.chars() {
    if matches!(c, '%' | '_' | '\\') {
      escaped.push('\\');
    }
    escaped.push(c);
  }
  escaped.push('%');
  escaped
}

/// Register `fold(text)`, a Unicode lowercase fold. SQLite's own `lower()`
/// and `LIKE` only fold ASCII.
fn register_fold(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
  conn.create_scalar_function(
    "fold",
    1,
    FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
    |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| text.to_lowercase())),
  )
}

/// Which referenced row a batch write found missing.
enum Missing {
  Owner,
  Referenced(i64),
}

/// Shape of a batch association write: `INSERT INTO {table} ({owner_column},
/// {target_column})`, where owners live in `owner_table` and targets in
/// `target_table`.
struct Link {
  table:         &'static str,
  owner_table:   &'static str,
  owner_column:  &'static str,
  target_table:  &'static str,
  target_column: &'static str,
  /// `INSERT OR IGNORE` for keyed association tables, plain `INSERT` for
  /// edge lists that allow repeats.
  ignore_dupes:  bool,
}

const USER_ALLERGENS: Link = Link {
  table:         "user_allergens",
  owner_table:   "users",
  owner_column:  "user_id",
  target_table:  "allergens",
  target_column: "allergen_id",
  ignore_dupes:  true,
};

const PRODUCT_ALLERGENS: Link = Link {
  table:         "product_allergens",
  owner_table:   "products",
  owner_column:  "product_id",
  target_table:  "allergens",
  target_column: "allergen_id",
  ignore_dupes:  true,
};

const ALTERNATIVES: Link = Link {
  table:         "alternative_products",
  owner_table:   "products",
  owner_column:  "product_id",
  target_table:  "products",
  target_column: "alternative_id",
  ignore_dupes:  false,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An allergen store backed by a single SQLite file.
///
/// Clones share the inner reference-counted connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        register_fold(conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_user(&self, column: &'static str, value: Value) -> Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users u WHERE u.{column} = ?1");
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [value], RawUser::from_row).optional()?))
      .await?;
    raw.map(RawUser::into_user).transpose()
  }

  async fn find_product(&self, column: &'static str, value: Value) -> Result<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.{column} = ?1");
    let raw: Option<RawProduct> = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [value], RawProduct::from_row).optional()?))
      .await?;
    raw.map(RawProduct::into_product).transpose()
  }

  /// Run `sql` (bound to `params`) and decode every row as an allergen.
  async fn query_allergens(&self, sql: String, params: Vec<Value>) -> Result<Vec<Allergen>> {
    let raws: Vec<RawAllergen> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawAllergen::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawAllergen::into_allergen).collect()
  }

  /// Run `sql` (bound to `params`) and decode every row as a product.
  async fn query_products(&self, sql: String, params: Vec<Value>) -> Result<Vec<Product>> {
    let raws: Vec<RawProduct> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawProduct::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawProduct::into_product).collect()
  }

  /// Write every `(owner_id, target)` row of `link` in one transaction.
  ///
  /// All referenced rows are checked first; if any is missing nothing is
  /// written.
  async fn link(&self, link: &'static Link, owner_id: i64, targets: Vec<i64>) -> Result<()> {
    let missing: Option<Missing> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if !row_exists(&tx, link.owner_table, owner_id)? {
          return Ok(Some(Missing::Owner));
        }
        for target in &targets {
          if !row_exists(&tx, link.target_table, *target)? {
            return Ok(Some(Missing::Referenced(*target)));
          }
        }
        {
          let verb = if link.ignore_dupes { "INSERT OR IGNORE" } else { "INSERT" };
          let mut stmt = tx.prepare(&format!(
            "{verb} INTO {} ({}, {}) VALUES (?1, ?2)",
            link.table, link.owner_column, link.target_column
          ))?;
          for target in &targets {
            stmt.execute(rusqlite::params![owner_id, target])?;
          }
        }
        tx.commit()?;
        Ok(None)
      })
      .await?;

    match missing {
      None => Ok(()),
      Some(Missing::Owner) if link.owner_table == "users" => Err(Error::UserNotFound(owner_id)),
      Some(Missing::Owner) => Err(Error::UnknownProduct(owner_id)),
      Some(Missing::Referenced(id)) if link.target_table == "allergens" => {
        Err(Error::UnknownAllergen(id))
      }
      Some(Missing::Referenced(id)) => Err(Error::UnknownProduct(id)),
    }
  }
}

// ─── AllergenStore impl ──────────────────────────────────────────────────────

impl AllergenStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn get_user(&self, id: i64) -> Result<Option<User>> {
    self.find_user("id", Value::Integer(id)).await
  }

  async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
    self.find_user("username", Value::Text(username.to_owned())).await
  }

  async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
    self.find_user("email", Value::Text(email.to_owned())).await
  }

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let password_hash = password::hash_password(&input.password)?;
    let at = now();

    let mut user = User {
      id: 0,
      username: input.username,
      password_hash,
      email: input.email,
      full_name: input.full_name,
      is_admin: input.is_admin,
      created_at: at,
      updated_at: at,
    };

    let row = (
      user.username.clone(),
      user.password_hash.clone(),
      user.email.clone(),
      user.full_name.clone(),
      user.is_admin,
      encode_dt(at),
    );

    user.id = self
      .conn
      .call(move |conn| {
        let (username, password_hash, email, full_name, is_admin, at_str) = row;
        conn.execute(
          "INSERT INTO users (
             username, password_hash, email, full_name, is_admin, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
          rusqlite::params![username, password_hash, email, full_name, is_admin, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(|e| classify(e, "username or email"))?;

    tracing::debug!(user_id = user.id, username = %user.username, "created user");
    Ok(user)
  }

  async fn update_user(&self, id: i64, update: UserUpdate) -> Result<User> {
    let at_str = encode_dt(now());

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users
              SET full_name  = COALESCE(?1, full_name),
                  email      = COALESCE(?2, email),
                  updated_at = ?3
            WHERE id = ?4",
          rusqlite::params![update.full_name, update.email, at_str, id],
        )?)
      })
      .await
      .map_err(|e| classify(e, "email"))?;

    if changed == 0 {
      return Err(Error::UserNotFound(id));
    }
    self.get_user(id).await?.ok_or(Error::UserNotFound(id))
  }

  async fn list_users(&self) -> Result<Vec<User>> {
    let raws: Vec<RawUser> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users u ORDER BY u.id"))?;
        let rows = stmt
          .query_map([], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawUser::into_user).collect()
  }

  // ── Allergen catalog ──────────────────────────────────────────────────────

  async fn list_allergens(&self) -> Result<Vec<Allergen>> {
    self
      .query_allergens(format!("SELECT {ALLERGEN_COLUMNS} FROM allergens a ORDER BY a.id"), vec![])
      .await
  }

  async fn get_allergen(&self, id: i64) -> Result<Option<Allergen>> {
    let mut found = self
      .query_allergens(
        format!("SELECT {ALLERGEN_COLUMNS} FROM allergens a WHERE a.id = ?1"),
        vec![Value::Integer(id)],
      )
      .await?;
    Ok(found.pop())
  }

  async fn create_allergen(&self, input: NewAllergen) -> Result<Allergen> {
    let at = now();
    let mut allergen = Allergen {
      id:          0,
      name:        input.name,
      description: input.description,
      icon:        input.icon,
      created_at:  at,
      updated_at:  at,
    };

    let row = (
      allergen.name.clone(),
      allergen.description.clone(),
      allergen.icon.clone(),
      encode_dt(at),
    );

    allergen.id = self
      .conn
      .call(move |conn| {
        let (name, description, icon, at_str) = row;
        conn.execute(
          "INSERT INTO allergens (name, description, icon, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?4)",
          rusqlite::params![name, description, icon, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(|e| classify(e, "allergen name"))?;

    Ok(allergen)
  }

  // ── User allergens ────────────────────────────────────────────────────────

  async fn get_user_allergens(&self, user_id: i64) -> Result<Vec<Allergen>> {
    self
      .query_allergens(
        format!(
          "SELECT {ALLERGEN_COLUMNS}
             FROM user_allergens ua
             JOIN allergens a ON a.id = ua.allergen_id
            WHERE ua.user_id = ?1
            ORDER BY a.id"
        ),
        vec![Value::Integer(user_id)],
      )
      .await
  }

  async fn add_user_allergens(&self, user_id: i64, allergen_ids: Vec<i64>) -> Result<()> {
    self.link(&USER_ALLERGENS, user_id, allergen_ids).await
  }

  async fn remove_user_allergen(&self, user_id: i64, allergen_id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM user_allergens WHERE user_id = ?1 AND allergen_id = ?2",
          rusqlite::params![user_id, allergen_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Product catalog ───────────────────────────────────────────────────────

  async fn get_product(&self, id: i64) -> Result<Option<Product>> {
    self.find_product("id", Value::Integer(id)).await
  }

  async fn get_product_by_registration_number(&self, number: &str) -> Result<Option<Product>> {
    self
      .find_product("registration_number", Value::Text(number.to_owned()))
      .await
  }

  async fn search_products_by_name(&self, name: &str) -> Result<Vec<Product>> {
    self
      .query_products(
        format!(
          "SELECT {PRODUCT_COLUMNS} FROM products p
            WHERE fold(p.name) LIKE ?1 ESCAPE '\\'
            ORDER BY p.id"
        ),
        vec![Value::Text(like_pattern(&name.to_lowercase()))],
      )
      .await
  }

  async fn create_product(&self, input: NewProduct) -> Result<Product> {
    let at = now();
    let mut product = Product {
      id:                  0,
      name:                input.name,
      manufacturer:        input.manufacturer,
      registration_number: input.registration_number,
      ingredients:         input.ingredients,
      created_at:          at,
      updated_at:          at,
    };

    let row = (
      product.name.clone(),
      product.manufacturer.clone(),
      product.registration_number.clone(),
      product.ingredients.clone(),
      encode_dt(at),
    );

    product.id = self
      .conn
      .call(move |conn| {
        let (name, manufacturer, registration_number, ingredients, at_str) = row;
        conn.execute(
          "INSERT INTO products (
             name, manufacturer, registration_number, ingredients, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![name, manufacturer, registration_number, ingredients, at_str],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await
      .map_err(|e| classify(e, "registration number"))?;

    Ok(product)
  }

  async fn list_products(&self) -> Result<Vec<Product>> {
    self
      .query_products(format!("SELECT {PRODUCT_COLUMNS} FROM products p ORDER BY p.id"), vec![])
      .await
  }

  // ── Product allergens ─────────────────────────────────────────────────────

  async fn get_product_allergens(&self, product_id: i64) -> Result<Vec<Allergen>> {
    self
      .query_allergens(
        format!(
          "SELECT {ALLERGEN_COLUMNS}
             FROM product_allergens pa
             JOIN allergens a ON a.id = pa.allergen_id
            WHERE pa.product_id = ?1
            ORDER BY a.id"
        ),
        vec![Value::Integer(product_id)],
      )
      .await
  }

  async fn add_product_allergens(&self, product_id: i64, allergen_ids: Vec<i64>) -> Result<()> {
    self.link(&PRODUCT_ALLERGENS, product_id, allergen_ids).await
  }

  // ── Alternatives ──────────────────────────────────────────────────────────

  async fn get_alternative_products(
    &self,
    product_id:            i64,
    excluded_allergen_ids: Vec<i64>,
  ) -> Result<Vec<Product>> {
    // The left join only finds rows for excluded allergens; keeping the rows
    // where it found nothing drops every alternative containing one.
    let excluded_json = serde_json::to_string(&excluded_allergen_ids)?;
    self
      .query_products(
        format!(
          "SELECT {PRODUCT_COLUMNS}
             FROM alternative_products ap
             JOIN products p ON p.id = ap.alternative_id
             LEFT JOIN product_allergens pa
               ON pa.product_id = ap.alternative_id
              AND pa.allergen_id IN (SELECT value FROM json_each(?2))
            WHERE ap.product_id = ?1
              AND pa.allergen_id IS NULL
            ORDER BY ap.id"
        ),
        vec![Value::Integer(product_id), Value::Text(excluded_json)],
      )
      .await
  }

  async fn add_alternative_products(&self, product_id: i64, alternative_ids: Vec<i64>) -> Result<()> {
    self.link(&ALTERNATIVES, product_id, alternative_ids).await
  }

  // ── Search history ────────────────────────────────────────────────────────

  async fn add_to_search_history(&self, user_id: i64, product_id: i64) -> Result<SearchHistoryItem> {
    let created_at = now();
    let at_str = encode_dt(created_at);

    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        if !row_exists(conn, "products", product_id)? {
          return Ok(None);
        }
        conn.execute(
          "INSERT INTO search_history (user_id, product_id, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![user_id, product_id, at_str],
        )?;
        Ok(Some(conn.last_insert_rowid()))
      })
      .await?;

    let id = id.ok_or(Error::UnknownProduct(product_id))?;
    Ok(SearchHistoryItem { id, user_id, product_id, created_at })
  }

  async fn get_user_search_history(
    &self,
    user_id: i64,
    limit:   usize,
  ) -> Result<Vec<SearchHistoryEntry>> {
    let limit_val = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawHistoryEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT sh.created_at, {PRODUCT_COLUMNS}
             FROM search_history sh
             JOIN products p ON p.id = sh.product_id
            WHERE sh.user_id = ?1
            ORDER BY sh.created_at DESC, sh.id DESC
            LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id, limit_val], RawHistoryEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHistoryEntry::into_entry).collect()
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(&self, user_id: i64, ttl: Duration) -> Result<Session> {
    let session = Session::new(user_id, now(), ttl);

    let id_str      = encode_uuid(session.id);
    let created_str = encode_dt(session.created_at);
    let expires_str = encode_dt(session.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (session_id, user_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, user_id, created_str, expires_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(session)
  }

  async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
    let id_str  = encode_uuid(id);
    let now_str = encode_dt(now());

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT session_id, user_id, created_at, expires_at
               FROM sessions
              WHERE session_id = ?1 AND expires_at > ?2",
            rusqlite::params![id_str, now_str],
            RawSession::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn destroy_session(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM sessions WHERE session_id = ?1", [id_str])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn prune_sessions(&self) -> Result<usize> {
    let now_str = encode_dt(now());
    let removed: usize = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [now_str])?))
      .await?;
    Ok(removed)
  }
}
