//! Document Selection Registry — which handle is the active one.

use std::sync::Arc;

use tokio::sync::watch;

use nowpage_core::{
  Error, Result,
  handle::{DocumentHandle, HandleId},
  state::{StateKey, StateStore},
};

/// Persists and publishes the selected handle id. At most one handle is
/// selected at a time; none is a valid state.
pub struct SelectionRegistry<S> {
  state:    Arc<S>,
  selected: watch::Sender<Option<HandleId>>,
}

impl<S: StateStore> SelectionRegistry<S> {
  /// Load the persisted selection.
  pub async fn load(state: Arc<S>) -> Result<Self> {
    let saved = state
      .load(StateKey::SelectedHandle)
      .await
      .map_err(Error::state)?
      .filter(|id| !id.is_empty())
      .map(HandleId::from);
    let (selected, _) = watch::channel(saved);
    Ok(Self { state, selected })
  }

  pub fn selected(&self) -> Option<HandleId> { self.selected.borrow().clone() }

  /// Receive every selection change.
  pub fn subscribe(&self) -> watch::Receiver<Option<HandleId>> {
    self.selected.subscribe()
  }

  /// Persist `id` as the selection.
  pub async fn select(&self, id: HandleId) -> Result<()> {
    self
      .state
      .save(StateKey::SelectedHandle, id.as_str())
      .await
      .map_err(Error::state)?;
    tracing::debug!(%id, "selected handle");
    self.publish(Some(id));
    Ok(())
  }

  /// Drop the selection.
  pub async fn clear(&self) -> Result<()> {
    self
      .state
      .clear(StateKey::SelectedHandle)
      .await
      .map_err(Error::state)?;
    self.publish(None);
    Ok(())
  }

  /// Clear the selection if `id` is the selected handle. Returns whether it
  /// was.
  pub async fn clear_if_selected(&self, id: &HandleId) -> Result<bool> {
    if self.selected().as_ref() != Some(id) {
      return Ok(false);
    }
    self.clear().await?;
    Ok(true)
  }

  /// Clear the selection when it is not among `candidates`. Returns whether
  /// it was cleared.
  pub async fn clear_if_missing(&self, candidates: &[HandleId]) -> Result<bool> {
    let Some(selected) = self.selected() else {
      return Ok(false);
    };
    if candidates.contains(&selected) {
      return Ok(false);
    }
    tracing::warn!(id = %selected, "selected handle no longer listed; clearing");
    self.clear().await?;
    Ok(true)
  }

  /// Bring the selection in line with a fresh listing: drop a selection that
  /// vanished, and pick the only handle when nothing is selected.
  pub async fn reconcile(&self, listed: &[DocumentHandle]) -> Result<()> {
    let ids: Vec<HandleId> = listed.iter().map(|h| h.id.clone()).collect();
    self.clear_if_missing(&ids).await?;

    if let [only] = listed
      && self.selected().is_none()
    {
      tracing::debug!(id = %only.id, "auto-selecting the only handle");
      self.select(only.id.clone()).await?;
    }
    Ok(())
  }

  fn publish(&self, id: Option<HandleId>) {
    self.selected.send_if_modified(|current| {
      if *current == id {
        return false;
      }
      *current = id;
      true
    });
  }
}
