//! Runtime server configuration, deserialised from `config.toml` layered with
//! `ALLERGEN_*` environment variables.

use std::path::PathBuf;

use allergen_core::session::DEFAULT_SESSION_TTL_HOURS;
use serde::Deserialize;
use thiserror::Error;

/// Longest accepted session lifetime: one year.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
  #[error("session_ttl_hours must be between 1 and {MAX_SESSION_TTL_HOURS}, got {0}")]
  SessionTtl(i64),
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                        String,
  #[serde(default = "default_port")]
  pub port:                        u16,
  #[serde(default = "default_database_path")]
  pub database_path:               PathBuf,
  /// Absolute session lifetime, counted from login.
  #[serde(default = "default_session_ttl_hours")]
  pub session_ttl_hours:           i64,
  #[serde(default = "default_prune_interval")]
  pub session_prune_interval_secs: u64,
  /// Mark the session cookie `Secure`. Enable behind TLS.
  #[serde(default)]
  pub secure_cookies:              bool,
  /// Write the starter catalog on startup.
  #[serde(default)]
  pub seed:                        bool,
  /// Password given to the seeded `admin` account.
  #[serde(default = "default_admin_password")]
  pub admin_password:              String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                        default_host(),
      port:                        default_port(),
      database_path:               default_database_path(),
      session_ttl_hours:           default_session_ttl_hours(),
      session_prune_interval_secs: default_prune_interval(),
      secure_cookies:              false,
      seed:                        false,
      admin_password:              default_admin_password(),
    }
  }
}

impl ServerConfig {
  /// Reject values that would mint already-expired sessions or overflow
  /// expiry arithmetic.
  pub fn validate(&self) -> Result<(), ConfigError> {
    if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.session_ttl_hours) {
      return Err(ConfigError::SessionTtl(self.session_ttl_hours));
    }
    Ok(())
  }

  pub fn session_ttl(&self) -> chrono::Duration { chrono::Duration::hours(self.session_ttl_hours) }
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 5000 }

fn default_database_path() -> PathBuf { PathBuf::from("allergen.db") }

fn default_session_ttl_hours() -> i64 { DEFAULT_SESSION_TTL_HOURS }

fn default_prune_interval() -> u64 { 3600 }

fn default_admin_password() -> String { "admin123".to_string() }
