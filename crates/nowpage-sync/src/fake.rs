//! In-memory stand-ins for the document store and identity endpoint.

use std::{
  collections::{HashMap, HashSet},
  sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicUsize, Ordering},
  },
};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use tokio::sync::{Notify, Semaphore};

use nowpage_core::{
  BODY_FILENAME, Error, Result,
  credential::{Identity, Token},
  document::{Document, Snapshot},
  handle::{DocumentHandle, HandleId},
  revision::{ChangeStatus, Locator, Revision},
  store::{DocumentStore, Fetched, IdentityVerifier, clone_label},
};

pub const GOOD_TOKEN: &str = "good-token";

pub fn good_token() -> Token { Token::new(GOOD_TOKEN).unwrap() }

// ─── Gate ────────────────────────────────────────────────────────────────────

/// Holds one `get_document` call until the test releases it.
pub struct Gate {
  release: Semaphore,
  entered: Notify,
}

impl Gate {
  fn new() -> Self {
    Self {
      release: Semaphore::new(0),
      entered: Notify::new(),
    }
  }

  /// Resolves once the gated call has reached the store.
  pub async fn entered(&self) { self.entered.notified().await }

  pub fn release(&self) { self.release.add_permits(1) }
}

// ─── Document store ──────────────────────────────────────────────────────────

struct Commit {
  version:      String,
  committed_at: DateTime<Utc>,
  body:         Document,
}

struct Entry {
  label:   Option<String>,
  /// Newest first.
  history: Vec<Commit>,
}

#[derive(Default)]
struct Inner {
  handles: IndexMap<HandleId, Entry>,
  clock:   i64,
}

impl Inner {
  fn tick(&mut self) -> DateTime<Utc> {
    self.clock += 1;
    DateTime::from_timestamp(1_700_000_000 + self.clock * 60, 0).unwrap()
  }

  fn commit(&mut self, id: &HandleId, body: Document) -> DateTime<Utc> {
    let committed_at = self.tick();
    let digest = Sha256::digest(format!("{id}:{}:{body:?}", self.clock));
    let commit = Commit {
      version: hex::encode(digest),
      committed_at,
      body,
    };
    if let Some(entry) = self.handles.get_mut(id) {
      entry.history.insert(0, commit);
    }
    committed_at
  }

  fn insert(&mut self, label: Option<String>, body: Document) -> HandleId {
    let id = HandleId::new(uuid::Uuid::new_v4().simple().to_string());
    self.handles.insert(id.clone(), Entry {
      label,
      history: Vec::new(),
    });
    self.commit(&id, body);
    id
  }

  fn entry(&self, id: &HandleId) -> Result<&Entry> {
    self.handles.get(id).ok_or_else(|| Error::NotFound(id.clone()))
  }
}

fn locator(id: &HandleId, version: &str) -> Locator {
  Locator::new(format!("fake://{id}/{version}"))
}

#[derive(Default)]
pub struct FakeStore {
  inner:     Mutex<Inner>,
  gates:     Mutex<HashMap<HandleId, Arc<Gate>>>,
  fail_next: Mutex<Option<Error>>,
  patches:   AtomicUsize,
}

impl FakeStore {
  pub fn new() -> Self { Self::default() }

  pub fn insert(&self, label: &str, body: Document) -> HandleId {
    self.lock().insert(Some(label.to_owned()), body)
  }

  /// Change HEAD behind the engine's back, as another session would.
  pub fn push(&self, id: &HandleId, body: Document) {
    self.lock().commit(id, body);
  }

  pub fn head(&self, id: &HandleId) -> Option<Document> {
    let inner = self.lock();
    let entry = inner.handles.get(id)?;
    entry.history.first().map(|c| c.body.clone())
  }

  pub fn label(&self, id: &HandleId) -> Option<String> {
    self.lock().handles.get(id)?.label.clone()
  }

  pub fn contains(&self, id: &HandleId) -> bool {
    self.lock().handles.contains_key(id)
  }

  pub fn patch_count(&self) -> usize { self.patches.load(Ordering::SeqCst) }

  /// The next store call fails with `error`.
  pub fn fail_next(&self, error: Error) {
    *self.fail_next.lock().unwrap() = Some(error);
  }

  /// Hold the next `get_document` for `id` until the gate is released.
  pub fn gate(&self, id: &HandleId) -> Arc<Gate> {
    let gate = Arc::new(Gate::new());
    self.gates.lock().unwrap().insert(id.clone(), gate.clone());
    gate
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn check(&self, token: &Token) -> Result<()> {
    if let Some(error) = self.fail_next.lock().unwrap().take() {
      return Err(error);
    }
    if token.secret() != GOOD_TOKEN {
      return Err(Error::Unauthorized);
    }
    Ok(())
  }
}

impl DocumentStore for FakeStore {
  async fn list_documents(&self, token: &Token) -> Result<Vec<DocumentHandle>> {
    self.check(token)?;
    let inner = self.lock();
    Ok(
      inner
        .handles
        .iter()
        .map(|(id, entry)| DocumentHandle {
          id:         id.clone(),
          label:      entry.label.clone(),
          public:     false,
          updated_at: entry.history[0].committed_at,
          files:      vec![BODY_FILENAME.to_owned()],
        })
        .collect(),
    )
  }

  async fn get_document(&self, token: &Token, id: &HandleId) -> Result<Fetched> {
    let gate = self.gates.lock().unwrap().remove(id);
    if let Some(gate) = gate {
      gate.entered.notify_one();
      gate.release.acquire().await.unwrap().forget();
    }
    self.check(token)?;

    let inner = self.lock();
    let entry = inner.entry(id)?;
    let head = &entry.history[0];
    Ok(Fetched {
      handle:    DocumentHandle {
        id:         id.clone(),
        label:      entry.label.clone(),
        public:     false,
        updated_at: head.committed_at,
        files:      vec![BODY_FILENAME.to_owned()],
      },
      snapshot:  Snapshot {
        body:       head.body.clone(),
        updated_at: head.committed_at,
      },
      revisions: entry
        .history
        .iter()
        .map(|c| Revision {
          version:      c.version.clone(),
          committed_at: c.committed_at,
          locator:      locator(id, &c.version),
          change:       ChangeStatus::default(),
        })
        .collect(),
    })
  }

  async fn get_document_version(
    &self,
    token: &Token,
    id: &HandleId,
    locator: &Locator,
  ) -> Result<Snapshot> {
    self.check(token)?;
    let inner = self.lock();
    let entry = inner.entry(id)?;
    let prefix = format!("fake://{id}/");
    let version = locator
      .as_str()
      .strip_prefix(&prefix)
      .ok_or_else(|| Error::VersionNotFound(locator.clone()))?;
    entry
      .history
      .iter()
      .find(|c| c.version == version)
      .map(|c| Snapshot {
        body:       c.body.clone(),
        updated_at: c.committed_at,
      })
      .ok_or_else(|| Error::VersionNotFound(locator.clone()))
  }

  async fn patch_document(
    &self,
    token: &Token,
    id: &HandleId,
    body: &Document,
  ) -> Result<DateTime<Utc>> {
    self.patches.fetch_add(1, Ordering::SeqCst);
    self.check(token)?;
    let mut inner = self.lock();
    inner.entry(id)?;
    Ok(inner.commit(id, body.clone()))
  }

  async fn create_document(
    &self,
    token: &Token,
    label: &str,
    body: &Document,
  ) -> Result<HandleId> {
    self.check(token)?;
    Ok(self.lock().insert(Some(label.to_owned()), body.clone()))
  }

  async fn delete_document(&self, token: &Token, id: &HandleId) -> Result<()> {
    self.check(token)?;
    self
      .lock()
      .handles
      .shift_remove(id)
      .map(|_| ())
      .ok_or_else(|| Error::NotFound(id.clone()))
  }

  async fn rename_document(
    &self,
    token: &Token,
    id: &HandleId,
    label: &str,
  ) -> Result<()> {
    self.check(token)?;
    let mut inner = self.lock();
    let entry = inner
      .handles
      .get_mut(id)
      .ok_or_else(|| Error::NotFound(id.clone()))?;
    entry.label = Some(label.to_owned());
    Ok(())
  }

  async fn clone_document(&self, token: &Token, id: &HandleId) -> Result<HandleId> {
    self.check(token)?;
    let mut inner = self.lock();
    let entry = inner.entry(id)?;
    let label = clone_label(entry.label.as_deref());
    let body = entry.history[0].body.clone();
    Ok(inner.insert(Some(label), body))
  }
}

// ─── Identity ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeVerifier {
  accepted: Mutex<HashSet<String>>,
  offline:  Mutex<bool>,
}

impl FakeVerifier {
  pub fn accepting(tokens: &[&str]) -> Self {
    Self {
      accepted: Mutex::new(tokens.iter().map(|t| (*t).to_owned()).collect()),
      offline:  Mutex::new(false),
    }
  }

  /// Revoke `token` on the store side.
  pub fn revoke(&self, token: &str) { self.accepted.lock().unwrap().remove(token); }

  pub fn set_offline(&self, offline: bool) { *self.offline.lock().unwrap() = offline; }
}

impl IdentityVerifier for FakeVerifier {
  async fn verify(&self, token: &Token) -> Result<Identity> {
    if *self.offline.lock().unwrap() {
      return Err(Error::Network("connection refused".into()));
    }
    if !self.accepted.lock().unwrap().contains(token.secret()) {
      return Err(Error::Unauthorized);
    }
    Ok(Identity {
      login: "octocat".into(),
      name:  Some("The Octocat".into()),
    })
  }
}
