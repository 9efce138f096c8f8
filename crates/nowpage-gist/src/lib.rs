//! GitHub Gist backend for the now-page document store.
//!
//! [`GistClient`] implements [`nowpage_core::store::DocumentStore`] and
//! [`nowpage_core::store::IdentityVerifier`] over the Gist REST API. Each
//! handle is a gist; the document body is its `now.json` file and its
//! revisions are the gist's commit history.

mod client;
mod wire;

pub use client::{GistClient, GistConfig};
