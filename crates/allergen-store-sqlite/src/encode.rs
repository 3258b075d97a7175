//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that lexical order equals chronological order.
//! Session ids are stored as hyphenated lowercase UUIDs.

use allergen_core::{
  catalog::{Allergen, Product},
  history::SearchHistoryEntry,
  session::Session,
  user::User,
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Current time truncated to the stored precision, so values handed back to
/// callers equal what a later read returns.
pub fn now() -> DateTime<Utc> {
  let now = Utc::now();
  decode_dt(&encode_dt(now)).unwrap_or(now)
}

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

// ─── Column lists ────────────────────────────────────────────────────────────
//
// Queries alias `users` as `u`, `allergens` as `a` and `products` as `p` so
// these lists can be spliced into joins.

pub const USER_COLUMNS: &str =
  "u.id, u.username, u.password_hash, u.email, u.full_name, u.is_admin, u.created_at, u.updated_at";

pub const ALLERGEN_COLUMNS: &str =
  "a.id, a.name, a.description, a.icon, a.created_at, a.updated_at";

pub const PRODUCT_COLUMNS: &str = "p.id, p.name, p.manufacturer, p.registration_number, \
                                   p.ingredients, p.created_at, p.updated_at";

// ─── Raw row types ───────────────────────────────────────────────────────────

pub struct RawUser {
  pub id:            i64,
  pub username:      String,
  pub password_hash: String,
  pub email:         String,
  pub full_name:     String,
  pub is_admin:      bool,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      username:      row.get(1)?,
      password_hash: row.get(2)?,
      email:         row.get(3)?,
      full_name:     row.get(4)?,
      is_admin:      row.get(5)?,
      created_at:    row.get(6)?,
      updated_at:    row.get(7)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      id:            self.id,
      username:      self.username,
      password_hash: self.password_hash,
      email:         self.email,
      full_name:     self.full_name,
      is_admin:      self.is_admin,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawAllergen {
  pub id:          i64,
  pub name:        String,
  pub description: Option<String>,
  pub icon:        Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawAllergen {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      name:        row.get(1)?,
      description: row.get(2)?,
      icon:        row.get(3)?,
      created_at:  row.get(4)?,
      updated_at:  row.get(5)?,
    })
  }

  pub fn into_allergen(self) -> Result<Allergen> {
    Ok(Allergen {
      id:          self.id,
      name:        self.name,
      description: self.description,
      icon:        self.icon,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub struct RawProduct {
  pub id:                  i64,
  pub name:                String,
  pub manufacturer:        String,
  pub registration_number: String,
  pub ingredients:         String,
  pub created_at:          String,
  pub updated_at:          String,
}

impl RawProduct {
  /// Read the product columns starting at `offset`.
  pub fn from_row_at(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                  row.get(offset)?,
      name:                row.get(offset + 1)?,
      manufacturer:        row.get(offset + 2)?,
      registration_number: row.get(offset + 3)?,
      ingredients:         row.get(offset + 4)?,
      created_at:          row.get(offset + 5)?,
      updated_at:          row.get(offset + 6)?,
    })
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> { Self::from_row_at(row, 0) }

  pub fn into_product(self) -> Result<Product> {
    Ok(Product {
      id:                  self.id,
      name:                self.name,
      manufacturer:        self.manufacturer,
      registration_number: self.registration_number,
      ingredients:         self.ingredients,
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }
}

/// A search-history row joined with its product: `created_at` first, then
/// [`PRODUCT_COLUMNS`].
pub struct RawHistoryEntry {
  pub created_at: String,
  pub product:    RawProduct,
}

impl RawHistoryEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { created_at: row.get(0)?, product: RawProduct::from_row_at(row, 1)? })
  }

  pub fn into_entry(self) -> Result<SearchHistoryEntry> {
    Ok(SearchHistoryEntry {
      product:    self.product.into_product()?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawSession {
  pub session_id: String,
  pub user_id:    i64,
  pub created_at: String,
  pub expires_at: String,
}

impl RawSession {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id: row.get(0)?,
      user_id:    row.get(1)?,
      created_at: row.get(2)?,
      expires_at: row.get(3)?,
    })
  }

  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      id:         Uuid::parse_str(&self.session_id)?,
      user_id:    self.user_id,
      created_at: decode_dt(&self.created_at)?,
      expires_at: decode_dt(&self.expires_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let early = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
    let late = early + chrono::Duration::microseconds(1);
    let (a, b) = (encode_dt(early), encode_dt(late));
    assert_eq!(a.len(), b.len());
    assert!(a < b);
    assert_eq!(decode_dt(&a).unwrap(), early);
  }
}
