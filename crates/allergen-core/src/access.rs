//! Declarative route capabilities and the single policy that evaluates them.

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

/// What a route requires of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Access {
  Public,
  User,
  Admin,
}

/// Who is making the request, as resolved from the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Principal {
  Anonymous,
  Member { user_id: i64, is_admin: bool },
}

impl Principal {
  pub fn user_id(&self) -> Option<i64> {
    match self {
      Self::Anonymous => None,
      Self::Member { user_id, .. } => Some(*user_id),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denial {
  #[error("Unauthorized")]
  Unauthenticated,
  #[error("Forbidden: Admin access required")]
  Forbidden,
}

/// Decide whether `principal` may use a route declared with `required`.
pub fn authorize(required: Access, principal: &Principal) -> Result<(), Denial> {
  match (required, principal) {
    (Access::Public, _) => Ok(()),
    (_, Principal::Anonymous) => Err(Denial::Unauthenticated),
    (Access::User, Principal::Member { .. }) => Ok(()),
    (Access::Admin, Principal::Member { is_admin: true, .. }) => Ok(()),
    (Access::Admin, Principal::Member { is_admin: false, .. }) => Err(Denial::Forbidden),
  }
}
