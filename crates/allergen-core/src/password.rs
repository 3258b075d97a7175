//! One-way salted password hashing (argon2id, PHC string format).

use std::sync::LazyLock;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use rand_core::OsRng;

use crate::{Error, Result};

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::PasswordHash(e.to_string()))
}

/// Check `password` against a stored PHC string. A malformed stored hash
/// never verifies.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else {
    return false;
  };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

/// Hashed once with the same parameters as stored hashes, so verifying
/// against it costs what a real check costs.
static DUMMY_HASH: LazyLock<Option<String>> =
  LazyLock::new(|| hash_password("no account has this password").ok());

/// Pay for one verification when there is no stored hash to check, so an
/// unknown username takes as long to reject as a wrong password. Always
/// `false`.
pub fn verify_without_account(password: &str) -> bool {
  if let Some(phc) = DUMMY_HASH.as_deref() {
    let _ = verify_password(password, phc);
  }
  false
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_verifies_only_the_original_password() {
    let hash = hash_password("admin123").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("admin123", &hash));
    assert!(!verify_password("admin124", &hash));
  }

  #[test]
  fn same_password_hashes_differently() {
    let a = hash_password("secret").unwrap();
    let b = hash_password("secret").unwrap();
    assert_ne!(a, b);
  }

  #[test]
  fn garbage_hash_does_not_verify() {
    assert!(!verify_password("secret", "not-a-phc-string"));
    assert!(!verify_password("secret", ""));
  }

  #[test]
  fn missing_account_pays_for_a_real_verification() {
    let dummy = PasswordHash::new(DUMMY_HASH.as_deref().unwrap()).unwrap();
    let stored = hash_password("admin123").unwrap();
    let stored = PasswordHash::new(&stored).unwrap();
    assert_eq!(dummy.algorithm, stored.algorithm);
    assert_eq!(dummy.params.to_string(), stored.params.to_string());

    assert!(!verify_without_account("admin123"));
    assert!(!verify_without_account("no account has this password"));
  }
}
