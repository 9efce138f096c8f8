//! Handle catalog — listing and administrative operations on handles.
//!
//! These act on handles, not on body content, and report failures directly
//! to the caller. Each keeps the [`SelectionRegistry`] consistent with the
//! outcome.

use std::sync::Arc;

use tokio::sync::watch;

use nowpage_core::{
  Error, Result,
  credential::Token,
  document::Document,
  handle::{DocumentHandle, HandleId},
  state::StateStore,
  store::{DEFAULT_LABEL, DocumentStore},
};

use crate::SelectionRegistry;

pub struct Catalog<D, S> {
  store:    Arc<D>,
  registry: Arc<SelectionRegistry<S>>,
  token:    watch::Receiver<Option<Token>>,
}

impl<D, S> Catalog<D, S>
where
  D: DocumentStore,
  S: StateStore,
{
  pub fn new(
    store: Arc<D>,
    registry: Arc<SelectionRegistry<S>>,
    token: watch::Receiver<Option<Token>>,
  ) -> Self {
    Self {
      store,
      registry,
      token,
    }
  }

  fn token(&self) -> Result<Token> {
    self.token.borrow().clone().ok_or(Error::Unauthenticated)
  }

  /// Handles holding a body, after reconciling the selection with them.
  pub async fn list(&self) -> Result<Vec<DocumentHandle>> {
    let token = self.token()?;
    let handles = self.store.list_documents(&token).await?;
    tracing::debug!(count = handles.len(), "listed handles");
    self.registry.reconcile(&handles).await?;
    Ok(handles)
  }

  /// Create a handle with the starter body and select it.
  pub async fn create(&self) -> Result<HandleId> {
    let token = self.token()?;
    let id = self
      .store
      .create_document(&token, DEFAULT_LABEL, &Document::starter())
      .await?;
    self.registry.select(id.clone()).await?;
    Ok(id)
  }

  /// Copy `source` into a new handle and select the copy.
  pub async fn clone_handle(&self, source: &HandleId) -> Result<HandleId> {
    let token = self.token()?;
    let id = self.store.clone_document(&token, source).await?;
    self.registry.select(id.clone()).await?;
    Ok(id)
  }

  /// Delete `id`, clearing the selection if it pointed there.
  pub async fn delete(&self, id: &HandleId) -> Result<()> {
    let token = self.token()?;
    self.store.delete_document(&token, id).await?;
    self.registry.clear_if_selected(id).await?;
    Ok(())
  }

  pub async fn rename(&self, id: &HandleId, label: &str) -> Result<()> {
    let token = self.token()?;
    self.store.rename_document(&token, id, label).await
  }
}
