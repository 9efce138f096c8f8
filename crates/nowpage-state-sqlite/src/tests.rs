//! Integration tests for `SqliteStateStore`.

use nowpage_core::state::{StateKey, StateStore};

use crate::SqliteStateStore;

async fn store() -> SqliteStateStore {
  SqliteStateStore::open_in_memory()
    .await
    .expect("in-memory store")
}

#[tokio::test]
async fn load_missing_returns_none() {
  let s = store().await;
  assert_eq!(s.load(StateKey::Token).await.unwrap(), None);
  assert_eq!(s.load(StateKey::SelectedHandle).await.unwrap(), None);
}

#[tokio::test]
async fn save_then_load() {
  let s = store().await;
  s.save(StateKey::SelectedHandle, "aa5a315d61ae9438b18d")
    .await
    .unwrap();

  let loaded = s.load(StateKey::SelectedHandle).await.unwrap();
  assert_eq!(loaded.as_deref(), Some("aa5a315d61ae9438b18d"));
  // Keys are independent.
  assert_eq!(s.load(StateKey::Token).await.unwrap(), None);
}

#[tokio::test]
async fn save_overwrites_previous_value() {
  let s = store().await;
  s.save(StateKey::Token, "first").await.unwrap();
  s.save(StateKey::Token, "second").await.unwrap();

  assert_eq!(
    s.load(StateKey::Token).await.unwrap().as_deref(),
    Some("second")
  );
}

#[tokio::test]
async fn clear_removes_and_is_idempotent() {
  let s = store().await;
  s.save(StateKey::Token, "secret").await.unwrap();

  s.clear(StateKey::Token).await.unwrap();
  assert_eq!(s.load(StateKey::Token).await.unwrap(), None);

  s.clear(StateKey::Token).await.unwrap();
}

#[tokio::test]
async fn values_survive_reopen() {
  let dir = std::env::temp_dir().join(format!(
    "nowpage-state-test-{}",
    std::process::id()
  ));
  let path = dir.join("nested").join("state.db");

  {
    let s = SqliteStateStore::open(&path).await.unwrap();
    s.save(StateKey::SelectedHandle, "gist-1").await.unwrap();
  }

  let reopened = SqliteStateStore::open(&path).await.unwrap();
  assert_eq!(
    reopened
      .load(StateKey::SelectedHandle)
      .await
      .unwrap()
      .as_deref(),
    Some("gist-1")
  );

  drop(reopened);
  std::fs::remove_dir_all(&dir).ok();
}
