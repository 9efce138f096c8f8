//! Durable local key/value state.
//!
//! Two entries survive restarts: the selected handle id and the credential
//! token. Backends (e.g. `nowpage-state-sqlite`) implement [`StateStore`];
//! [`MemoryStateStore`] is the in-process variant.

use std::{
  collections::HashMap,
  convert::Infallible,
  future::Future,
  sync::{Mutex, PoisonError},
};

use strum::{AsRefStr, EnumIter};

/// The persisted entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, EnumIter)]
pub enum StateKey {
  #[strum(serialize = "selected_gist_id")]
  SelectedHandle,
  #[strum(serialize = "github_token")]
  Token,
}

/// Abstraction over a durable key/value backend. Each read and write of a
/// single key is atomic.
pub trait StateStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the value stored under `key`, if any.
  fn load(
    &self,
    key: StateKey,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  /// Store `value` under `key`, replacing any previous value.
  fn save<'a>(
    &'a self,
    key: StateKey,
    value: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove the value under `key`. Removing an absent key is not an error.
  fn clear(
    &self,
    key: StateKey,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Process-local state; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
  entries: Mutex<HashMap<StateKey, String>>,
}

impl MemoryStateStore {
  pub fn new() -> Self { Self::default() }

  fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<StateKey, String>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl StateStore for MemoryStateStore {
  type Error = Infallible;

  async fn load(&self, key: StateKey) -> Result<Option<String>, Infallible> {
    Ok(self.entries().get(&key).cloned())
  }

  async fn save(&self, key: StateKey, value: &str) -> Result<(), Infallible> {
    self.entries().insert(key, value.to_owned());
    Ok(())
  }

  async fn clear(&self, key: StateKey) -> Result<(), Infallible> {
    self.entries().remove(&key);
    Ok(())
  }
}
