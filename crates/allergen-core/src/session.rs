//! Server-side login sessions.
//!
//! A session binds an opaque id (carried in a cookie) to a user id. Expiry is
//! absolute: it is fixed at creation and never renewed.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifetime of a session, in hours, when the server is not configured otherwise.
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  pub id:         Uuid,
  pub user_id:    i64,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  /// Mint a fresh session for `user_id` created at `created_at` that expires
  /// `ttl` later.
  pub fn new(user_id: i64, created_at: DateTime<Utc>, ttl: Duration) -> Self {
    Self { id: Uuid::new_v4(), user_id, created_at, expires_at: created_at + ttl }
  }

  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool { now >= self.expires_at }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn expiry_is_absolute_from_creation() {
    let session = Session::new(7, Utc::now(), Duration::hours(DEFAULT_SESSION_TTL_HOURS));
    assert_eq!(session.expires_at - session.created_at, Duration::hours(24));
    assert!(!session.is_expired_at(session.created_at + Duration::hours(23)));
    assert!(session.is_expired_at(session.created_at + Duration::hours(24)));
  }
}
