//! Query cache keyed by logical resource path.
//!
//! Concurrent fetches of the same key share one request. Results stay cached
//! until a mutation invalidates their key (or a prefix of it).

use std::{
  collections::HashMap,
  future::Future,
  sync::{Arc, Mutex, PoisonError},
  time::Duration,
};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::client::{ClientError, Result};

/// How a failed read is retried before the error surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retry {
  /// Up to three attempts with exponential backoff.
  Default,
  /// One attempt. Used for the current-user check so a logged-out state is
  /// reported immediately.
  Never,
}

impl Retry {
  fn attempts(self) -> u32 {
    match self {
      Self::Default => 3,
      Self::Never => 1,
    }
  }
}

const BASE_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Default)]
pub struct QueryCache {
  entries: Mutex<HashMap<String, Arc<OnceCell<Value>>>>,
}

impl QueryCache {
  pub fn new() -> Self { Self::default() }

  fn cell(&self, key: &str) -> Arc<OnceCell<Value>> {
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(entries.entry(key.to_owned()).or_default())
  }

  /// Return the cached value for `key`, or run `load` to fill it.
  ///
  /// A failed load leaves the key empty so the next fetch tries again.
  pub async fn fetch<T, F, Fut>(&self, key: &str, retry: Retry, load: F) -> Result<T>
  where
    T: Serialize + DeserializeOwned,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let cell = self.cell(key);
    let value = cell
      .get_or_try_init(|| async {
        let fresh = with_retry(retry, &load).await?;
        Ok::<_, ClientError>(serde_json::to_value(fresh)?)
      })
      .await?;
    Ok(serde_json::from_value(value.clone())?)
  }

  /// Drop every entry whose key starts with `prefix`.
  pub fn invalidate(&self, prefix: &str) {
    let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
    entries.retain(|key, _| !key.starts_with(prefix));
  }

  pub fn clear(&self) { self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear(); }
}

async fn with_retry<T, F, Fut>(retry: Retry, load: &F) -> Result<T>
where
  F: Fn() -> Fut,
  Fut: Future<Output = Result<T>>,
{
  let attempts = retry.attempts();
  let mut attempt = 1;
  loop {
    match load().await {
      Err(e) if attempt < attempts && e.is_retryable() => {
        let backoff = BASE_BACKOFF * 2u32.pow(attempt - 1);
        tracing::debug!(attempt, error = %e, ?backoff, "retrying query");
        tokio::time::sleep(backoff).await;
        attempt += 1;
      }
      outcome => return outcome,
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::{AtomicUsize, Ordering};

  use reqwest::StatusCode;

  use super::*;

  fn server_error() -> ClientError {
    ClientError::Api { status: StatusCode::INTERNAL_SERVER_ERROR, message: "Server error".into() }
  }

  #[tokio::test]
  async fn cached_until_invalidated() {
    let cache = QueryCache::new();
    let counter = AtomicUsize::new(0);
    let calls = &counter;
    let load = move || async move {
      Ok::<_, ClientError>(calls.fetch_add(1, Ordering::SeqCst))
    };

    assert_eq!(cache.fetch("/user/allergens", Retry::Default, load).await.unwrap(), 0);
    assert_eq!(cache.fetch("/user/allergens", Retry::Default, load).await.unwrap(), 0);

    cache.invalidate("/user");
    assert_eq!(cache.fetch("/user/allergens", Retry::Default, load).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn concurrent_fetches_share_one_load() {
    let cache = QueryCache::new();
    let counter = AtomicUsize::new(0);
    let calls = &counter;
    let load = move || async move {
      calls.fetch_add(1, Ordering::SeqCst);
      tokio::time::sleep(Duration::from_millis(20)).await;
      Ok::<_, ClientError>(vec![1, 2, 3])
    };

    let (a, b) = tokio::join!(
      cache.fetch::<Vec<i32>, _, _>("/allergens", Retry::Default, load),
      cache.fetch::<Vec<i32>, _, _>("/allergens", Retry::Default, load),
    );
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn retryable_errors_are_retried() {
    let cache = QueryCache::new();
    let counter = AtomicUsize::new(0);
    let calls = &counter;
    let load = move || async move {
      match calls.fetch_add(1, Ordering::SeqCst) {
        0 | 1 => Err(server_error()),
        _ => Ok("ok".to_string()),
      }
    };

    let value: String = cache.fetch("/products", Retry::Default, load).await.unwrap();
    assert_eq!(value, "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn never_retry_fails_fast_and_stays_uncached() {
    let cache = QueryCache::new();
    let counter = AtomicUsize::new(0);
    let calls = &counter;
    let load = move || async move {
      calls.fetch_add(1, Ordering::SeqCst);
      Err::<String, _>(server_error())
    };

    assert!(cache.fetch("/user", Retry::Never, load).await.is_err());
    assert!(cache.fetch("/user", Retry::Never, load).await.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }
}
