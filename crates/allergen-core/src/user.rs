//! User accounts.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered account.
///
/// The password hash is carried for credential checks but is never
/// serialised, so a `User` can be returned from any handler as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id:            i64,
  pub username:      String,
  #[serde(skip_serializing, default)]
  pub password_hash: String,
  pub email:         String,
  pub full_name:     String,
  pub is_admin:      bool,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

/// Input for [`AllergenStore::create_user`](crate::store::AllergenStore::create_user).
///
/// `password` is plaintext; the store hashes it before insertion.
#[derive(Clone)]
pub struct NewUser {
  pub username:  String,
  pub password:  String,
  pub email:     String,
  pub full_name: String,
  pub is_admin:  bool,
}

impl fmt::Debug for NewUser {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("NewUser")
      .field("username", &self.username)
      .field("password", &"<redacted>")
      .field("email", &self.email)
      .field("full_name", &self.full_name)
      .field("is_admin", &self.is_admin)
      .finish()
  }
}

/// Partial profile update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
  pub full_name: Option<String>,
  pub email:     Option<String>,
}

impl UserUpdate {
  pub fn is_empty(&self) -> bool { self.full_name.is_none() && self.email.is_none() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn password_hash_is_never_serialised() {
    let now = Utc::now();
    let user = User {
      id:            1,
      username:      "ada".into(),
      password_hash: "$argon2id$secret".into(),
      email:         "ada@example.com".into(),
      full_name:     "Ada Obi".into(),
      is_admin:      false,
      created_at:    now,
      updated_at:    now,
    };
    let json = serde_json::to_value(&user).unwrap();
    assert!(json.get("passwordHash").is_none());
    assert!(json.get("password").is_none());
    assert_eq!(json["fullName"], "Ada Obi");
    assert_eq!(json["isAdmin"], false);
  }

  #[test]
  fn new_user_debug_redacts_password() {
    let input = NewUser {
      username:  "ada".into(),
      password:  "hunter2".into(),
      email:     "ada@example.com".into(),
      full_name: "Ada Obi".into(),
      is_admin:  false,
    };
    assert!(!format!("{input:?}").contains("hunter2"));
  }
}
