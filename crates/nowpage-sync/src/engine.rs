//! Document Synchronization Engine.
//!
//! Loads the selected handle's body and history, moves between the latest
//! and historical views, and pushes local edits back. Reads surface their
//! failures as state; writes return them.
//!
//! Every operation takes a ticket before it awaits the store. A result
//! is applied only if the ticket is still current when it arrives: same
//! epoch, same handle, and that handle is still the registry's selection.
//! Anything else is a response for a handle the user has moved away from,
//! and it is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use nowpage_core::{
  Error, Result,
  credential::Token,
  document::{Document, Snapshot},
  handle::HandleId,
  revision::{Locator, Revision, Viewing},
  store::DocumentStore,
};

/// What the engine is doing, as seen by a presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Idle,
  Loading,
  ReadyLatest,
  ReadyHistorical,
  Failed,
}

impl Status {
  pub fn is_ready(self) -> bool {
    matches!(self, Self::ReadyLatest | Self::ReadyHistorical)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
  #[default]
  Idle,
  Loading,
  Ready,
  Failed,
}

/// A copy of the engine's state at one instant.
#[derive(Debug, Clone, Default)]
pub struct SyncState {
  /// The handle this state belongs to.
  pub handle:    Option<HandleId>,
  pub current:   Option<Snapshot>,
  /// Newest first.
  pub revisions: Option<Vec<Revision>>,
  pub viewing:   Viewing,
  /// The last surfaced read failure, phrased for the user.
  pub error:     Option<String>,
  phase:         Phase,
  epoch:         u64,
}

impl SyncState {
  pub fn status(&self) -> Status {
    match self.phase {
      Phase::Idle => Status::Idle,
      Phase::Loading => Status::Loading,
      Phase::Failed => Status::Failed,
      Phase::Ready if self.viewing.is_latest() => Status::ReadyLatest,
      Phase::Ready => Status::ReadyHistorical,
    }
  }

  fn revision(&self, locator: &Locator) -> Option<&Revision> {
    self
      .revisions
      .as_deref()?
      .iter()
      .find(|r| &r.locator == locator)
  }

  /// Start over for `handle`. Results still in flight for the old epoch
  /// will be discarded.
  fn reset(&mut self, handle: Option<HandleId>) {
    *self = Self {
      handle,
      epoch: self.epoch.wrapping_add(1),
      ..Self::default()
    };
  }
}

/// Identifies one in-flight operation.
struct Ticket {
  handle: HandleId,
  epoch:  u64,
  prior:  Phase,
}

pub struct SyncEngine<D> {
  store:     Arc<D>,
  token:     watch::Receiver<Option<Token>>,
  selection: watch::Receiver<Option<HandleId>>,
  state:     Mutex<SyncState>,
}

impl<D: DocumentStore> SyncEngine<D> {
  /// An idle engine bound to the current selection. Nothing is fetched
  /// until [`refresh`](Self::refresh) is called.
  pub fn new(
    store: Arc<D>,
    token: watch::Receiver<Option<Token>>,
    selection: watch::Receiver<Option<HandleId>>,
  ) -> Self {
    let handle = selection.borrow().clone();
    Self {
      store,
      token,
      selection,
      state: Mutex::new(SyncState {
        handle,
        ..SyncState::default()
      }),
    }
  }

  // ─── Observation ─────────────────────────────────────────────────────────

  // Every getter adopts the registry's selection first, so a handle change
  // is visible as cleared state before anything reloads.

  pub fn state(&self) -> SyncState { self.observe().clone() }

  pub fn status(&self) -> Status { self.observe().status() }

  pub fn current(&self) -> Option<Snapshot> { self.observe().current.clone() }

  pub fn revisions(&self) -> Option<Vec<Revision>> {
    self.observe().revisions.clone()
  }

  pub fn viewing(&self) -> Viewing { self.observe().viewing.clone() }

  pub fn error(&self) -> Option<String> { self.observe().error.clone() }

  // ─── Reads ───────────────────────────────────────────────────────────────

  /// Adopt the registry's current selection, clearing all document state
  /// when it differs from the handle this engine was showing, then load the
  /// new handle. A selected handle that has not been loaded yet is loaded
  /// too.
  pub async fn sync_selection(&self) {
    let changed = self.adopt_selection();
    let pending = {
      let state = self.lock();
      state.handle.is_some() && (changed || state.phase == Phase::Idle)
    };
    if pending {
      self.refresh().await;
    }
  }

  /// Load HEAD and history for the selected handle.
  ///
  /// With no selection this does nothing. Failures become
  /// [`Status::Failed`] with a message; the last good snapshot is kept.
  pub async fn refresh(&self) {
    let (ticket, token, ()) = match self.begin(|_| Ok(())) {
      Ok(begun) => begun,
      Err(Error::NoSelection) => return,
      Err(Error::Busy) => {
        tracing::debug!("refresh skipped; another operation is in flight");
        return;
      }
      Err(e) => {
        let mut state = self.lock();
        state.phase = Phase::Failed;
        state.error = Some(e.user_message());
        return;
      }
    };

    tracing::debug!(id = %ticket.handle, "loading document");
    let result = self.store.get_document(&token, &ticket.handle).await;

    let mut state = self.lock();
    if !self.settle(&mut state, &ticket) {
      return;
    }
    match result {
      Ok(fetched) => {
        tracing::debug!(
          id = %ticket.handle,
          revisions = fetched.revisions.len(),
          "document loaded"
        );
        state.current = Some(fetched.snapshot);
        state.revisions = Some(fetched.revisions);
        state.viewing = Viewing::Latest;
        state.phase = Phase::Ready;
        state.error = None;
      }
      Err(e) => {
        tracing::warn!(id = %ticket.handle, "failed to load document: {e}");
        state.phase = Phase::Failed;
        state.error = Some(e.user_message());
      }
    }
  }

  /// Show the body as of `locator`, which must be one of the loaded
  /// revisions.
  ///
  /// The snapshot's `updated_at` is the revision's commit time. On failure
  /// the previous view is kept and the error is surfaced.
  pub async fn load_version(&self, locator: &Locator) {
    let begun = self.begin(|state| {
      if state.revisions.is_none() {
        return Err(Error::InvalidState("history has not been loaded"));
      }
      state
        .revision(locator)
        .map(|r| r.committed_at)
        .ok_or_else(|| Error::VersionNotFound(locator.clone()))
    });
    let (ticket, token, committed_at) = match begun {
      Ok(begun) => begun,
      Err(Error::NoSelection) => return,
      Err(Error::Busy) => {
        tracing::debug!(%locator, "version load skipped; another operation is in flight");
        return;
      }
      Err(e) => {
        tracing::debug!(%locator, "cannot load version: {e}");
        self.lock().error = Some(e.user_message());
        return;
      }
    };

    tracing::debug!(id = %ticket.handle, %locator, "loading version");
    let result = self
      .store
      .get_document_version(&token, &ticket.handle, locator)
      .await;

    let mut state = self.lock();
    if !self.settle(&mut state, &ticket) {
      return;
    }
    match result {
      Ok(snapshot) => {
        state.current = Some(Snapshot {
          body:       snapshot.body,
          updated_at: committed_at,
        });
        state.viewing = Viewing::Revision(locator.clone());
        state.phase = Phase::Ready;
        state.error = None;
      }
      Err(e) => {
        tracing::warn!(id = %ticket.handle, %locator, "failed to load version: {e}");
        state.phase = ticket.prior;
        state.error = Some(e.user_message());
      }
    }
  }

  // ─── Writes ──────────────────────────────────────────────────────────────

  /// Replace the whole body of the selected handle.
  ///
  /// Local state changes only after the store confirms: `current` becomes
  /// `body` stamped with the returned `updated_at`, and the view moves to
  /// latest. Revisions are not re-fetched. Failures are returned and leave
  /// state untouched.
  pub async fn update_whole(&self, body: Document) -> Result<()> {
    let (ticket, token, ()) = self.begin(|state| {
      if state.status().is_ready() {
        Ok(())
      } else {
        Err(Error::InvalidState("document is not loaded"))
      }
    })?;

    let result = self
      .store
      .patch_document(&token, &ticket.handle, &body)
      .await;
    self.commit(&ticket, body, result)
  }

  /// Make the historical body being viewed the new HEAD, then reload.
  pub async fn revert_to_viewing(&self) -> Result<()> {
    let (ticket, token, body) = self.begin(|state| {
      match (&state.viewing, &state.current, state.phase) {
        (Viewing::Revision(_), Some(current), Phase::Ready) => {
          Ok(current.body.clone())
        }
        _ => Err(Error::InvalidState("not viewing a historical version")),
      }
    })?;

    tracing::info!(id = %ticket.handle, "reverting to viewed version");
    let result = self
      .store
      .patch_document(&token, &ticket.handle, &body)
      .await;
    self.commit(&ticket, body, result)?;
    self.refresh().await;
    Ok(())
  }

  // ─── Following changes ───────────────────────────────────────────────────

  /// Follow selection and credential changes until either channel closes.
  ///
  /// A new selection clears state and loads the new handle. A new token
  /// reloads; losing the token clears the document state. A selection made
  /// before the call is adopted on entry.
  pub async fn run(self: Arc<Self>) {
    let mut selection = self.selection.clone();
    let mut token = self.token.clone();
    self.sync_selection().await;

    loop {
      tokio::select! {
        changed = selection.changed() => {
          if changed.is_err() {
            break;
          }
          selection.borrow_and_update();
          self.sync_selection().await;
        }
        changed = token.changed() => {
          if changed.is_err() {
            break;
          }
          let signed_in = token.borrow_and_update().is_some();
          if signed_in {
            self.refresh().await;
          } else {
            self.forget();
          }
        }
      }
    }
    tracing::debug!("sync engine stopped");
  }

  // ─── Internals ───────────────────────────────────────────────────────────

  fn lock(&self) -> MutexGuard<'_, SyncState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn observe(&self) -> MutexGuard<'_, SyncState> {
    self.adopt_selection();
    self.lock()
  }

  /// Returns true when the registry's selection differed and state was
  /// cleared.
  fn adopt_selection(&self) -> bool {
    let selected = self.selection.borrow().clone();
    let mut state = self.lock();
    if state.handle == selected {
      return false;
    }
    tracing::debug!(
      from = ?state.handle,
      to = ?selected,
      "selection changed; clearing document state"
    );
    state.reset(selected);
    true
  }

  /// Drop everything loaded for the current handle.
  fn forget(&self) {
    let mut state = self.lock();
    let handle = state.handle.take();
    state.reset(handle);
  }

  /// Mark an operation as in flight. `check` sees the state after the
  /// selection is adopted and may refuse, or extract what the operation
  /// needs.
  fn begin<T>(
    &self,
    check: impl FnOnce(&SyncState) -> Result<T>,
  ) -> Result<(Ticket, Token, T)> {
    self.adopt_selection();
    let token = self.token.borrow().clone();

    let mut state = self.lock();
    let handle = state.handle.clone().ok_or(Error::NoSelection)?;
    let token = token.ok_or(Error::Unauthenticated)?;
    if state.phase == Phase::Loading {
      return Err(Error::Busy);
    }
    let extra = check(&state)?;

    let ticket = Ticket {
      handle,
      epoch: state.epoch,
      prior: state.phase,
    };
    state.phase = Phase::Loading;
    Ok((ticket, token, extra))
  }

  /// Whether results for `ticket` may be applied. A stale ticket from the
  /// current epoch gives its phase back; the next operation adopts the new
  /// selection.
  fn settle(&self, state: &mut SyncState, ticket: &Ticket) -> bool {
    let selected = self.selection.borrow().as_ref() == Some(&ticket.handle);
    let same = state.epoch == ticket.epoch
      && state.handle.as_ref() == Some(&ticket.handle);
    if same && selected {
      return true;
    }
    tracing::warn!(id = %ticket.handle, "discarding response for a deselected handle");
    if state.epoch == ticket.epoch {
      state.phase = ticket.prior;
    }
    false
  }

  fn commit(
    &self,
    ticket: &Ticket,
    body: Document,
    result: Result<DateTime<Utc>>,
  ) -> Result<()> {
    let mut state = self.lock();
    let fresh = self.settle(&mut state, ticket);
    match result {
      Ok(updated_at) => {
        tracing::info!(id = %ticket.handle, "document saved");
        if fresh {
          state.current = Some(Snapshot { body, updated_at });
          state.viewing = Viewing::Latest;
          state.phase = Phase::Ready;
          state.error = None;
        }
        Ok(())
      }
      Err(e) => {
        tracing::warn!(id = %ticket.handle, "failed to save document: {e}");
        if fresh {
          state.phase = ticket.prior;
        }
        Err(e)
      }
    }
  }
}
