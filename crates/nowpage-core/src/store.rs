//! The `DocumentStore` and `IdentityVerifier` traits.
//!
//! Implemented by remote backends (e.g. `nowpage-gist`). Higher layers
//! (`nowpage-sync`, `nowpage-cli`) depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  Result,
  credential::{Identity, Token},
  document::{Document, Snapshot},
  handle::{DocumentHandle, HandleId},
  revision::{Locator, Revision},
};

/// Result of [`DocumentStore::get_document`].
#[derive(Debug, Clone)]
pub struct Fetched {
  pub handle:    DocumentHandle,
  pub snapshot:  Snapshot,
  /// Newest first, as returned by the store.
  pub revisions: Vec<Revision>,
}

/// Abstraction over the remote document store.
///
/// Every call carries the bearer credential. Failures are normalised into
/// the typed [`Error`](crate::Error) taxonomy so callers can tell a revoked
/// credential from a vanished handle. Writes are last-write-wins: no
/// concurrency token is sent.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait DocumentStore: Send + Sync {
  /// Handles whose file set contains the document body.
  fn list_documents<'a>(
    &'a self,
    token: &'a Token,
  ) -> impl Future<Output = Result<Vec<DocumentHandle>>> + Send + 'a;

  /// Fetch HEAD plus the revision history.
  ///
  /// Fails with `NotFound`, `Unauthorized` or `BodyMissing`.
  fn get_document<'a>(
    &'a self,
    token: &'a Token,
    id: &'a HandleId,
  ) -> impl Future<Output = Result<Fetched>> + Send + 'a;

  /// Dereference a revision locator previously returned in a history
  /// listing.
  fn get_document_version<'a>(
    &'a self,
    token: &'a Token,
    id: &'a HandleId,
    locator: &'a Locator,
  ) -> impl Future<Output = Result<Snapshot>> + Send + 'a;

  /// Replace the body and return the store's new `updated_at`.
  fn patch_document<'a>(
    &'a self,
    token: &'a Token,
    id: &'a HandleId,
    body: &'a Document,
  ) -> impl Future<Output = Result<DateTime<Utc>>> + Send + 'a;

  /// Create a new private handle holding `body`.
  fn create_document<'a>(
    &'a self,
    token: &'a Token,
    label: &'a str,
    body: &'a Document,
  ) -> impl Future<Output = Result<HandleId>> + Send + 'a;

  fn delete_document<'a>(
    &'a self,
    token: &'a Token,
    id: &'a HandleId,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  fn rename_document<'a>(
    &'a self,
    token: &'a Token,
    id: &'a HandleId,
    label: &'a str,
  ) -> impl Future<Output = Result<()>> + Send + 'a;

  /// Copy the full file set of `id` into a new handle with a derived label.
  /// Read and create are separate calls; the source may vanish in between.
  fn clone_document<'a>(
    &'a self,
    token: &'a Token,
    id: &'a HandleId,
  ) -> impl Future<Output = Result<HandleId>> + Send + 'a;
}

/// Resolves a bearer token to the identity it belongs to.
pub trait IdentityVerifier: Send + Sync {
  /// Fails with `Unauthorized` when the token is rejected.
  fn verify<'a>(
    &'a self,
    token: &'a Token,
  ) -> impl Future<Output = Result<Identity>> + Send + 'a;
}

/// Label given to handles created from scratch.
pub const DEFAULT_LABEL: &str = "My Now Page Data";

/// Label given to a clone of `source`.
pub fn clone_label(source: Option<&str>) -> String {
  let source = source.filter(|s| !s.trim().is_empty()).unwrap_or("Now Page Data");
  format!("Clone of {source}")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn clone_label_falls_back_for_missing_source() {
    assert_eq!(clone_label(Some("Weekly")), "Clone of Weekly");
    assert_eq!(clone_label(Some("")), "Clone of Now Page Data");
    assert_eq!(clone_label(None), "Clone of Now Page Data");
  }
}
