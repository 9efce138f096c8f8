//! Document synchronization for the now page.
//!
//! The services here are owned by a composition root and passed to consumers
//! explicitly:
//!
//! - [`CredentialHolder`] owns the bearer token and the cached identity.
//! - [`SelectionRegistry`] persists which handle is the active one.
//! - [`Catalog`] runs the administrative handle operations and keeps the
//!   registry consistent with what the store lists.
//! - [`SyncEngine`] holds the current document, its revisions and the
//!   viewing pointer, and performs every body read and write.
//! - [`FieldSession`] edits one field and merges it back through the engine.
//!
//! Credential and selection changes are published on `tokio::sync::watch`
//! channels; the engine reads both to decide which handle to operate on and
//! to discard responses that arrive after the selection moved on.

mod catalog;
mod credential;
mod engine;
mod selection;
mod session;

pub use catalog::Catalog;
pub use credential::CredentialHolder;
pub use engine::{Status, SyncEngine, SyncState};
pub use selection::SelectionRegistry;
pub use session::{FieldSession, FieldShape, SaveOutcome};

#[cfg(test)]
mod fake;
