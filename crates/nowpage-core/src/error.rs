//! Error types for `nowpage-core`.

use thiserror::Error;

use crate::{handle::HandleId, revision::Locator};

#[derive(Debug, Error)]
pub enum Error {
  /// No credential is held.
  #[error("not signed in")]
  Unauthenticated,

  /// The store rejected the credential, or it lacks the required scope.
  #[error("credential rejected by the document store")]
  Unauthorized,

  /// A candidate credential failed the identity check during login.
  #[error("invalid credential")]
  InvalidCredential,

  #[error("no document selected")]
  NoSelection,

  #[error("document not found: {0}")]
  NotFound(HandleId),

  #[error("now.json not found in document {0}")]
  BodyMissing(HandleId),

  #[error("version not found: {0}")]
  VersionNotFound(Locator),

  #[error("network failure: {0}")]
  Network(String),

  /// The store answered with a status this client does not map.
  #[error("document store responded {status}: {message}")]
  Remote { status: u16, message: String },

  #[error("malformed document body: {0}")]
  MalformedBody(#[from] serde_json::Error),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("{0}")]
  InvalidState(&'static str),

  /// Another engine operation has not completed yet.
  #[error("another operation is still in flight")]
  Busy,

  #[error("local state error: {0}")]
  State(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error from a [`StateStore`](crate::state::StateStore).
  pub fn state<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::State(Box::new(err))
  }

  /// True for failures that mean the credential is missing or no longer
  /// accepted.
  pub fn is_auth_failure(&self) -> bool {
    matches!(
      self,
      Self::Unauthenticated | Self::Unauthorized | Self::InvalidCredential
    )
  }

  /// The message shown to the user when this error is surfaced as state
  /// rather than returned.
  pub fn user_message(&self) -> String {
    match self {
      Self::Unauthenticated => "Sign in to GitHub to load your now page".into(),
      Self::Unauthorized | Self::InvalidCredential => {
        "GitHub rejected the saved credential; sign in again".into()
      }
      Self::NoSelection => "No Gist selected".into(),
      Self::NotFound(_) => "The selected Gist no longer exists".into(),
      Self::BodyMissing(_) => "now.json not found in the selected Gist".into(),
      Self::VersionNotFound(_) => "That version is no longer available".into(),
      Self::Network(_) => "Could not reach GitHub; check your connection".into(),
      Self::Remote { status, .. } => {
        format!("Failed to fetch now page data (HTTP {status})")
      }
      Self::MalformedBody(_) => "now.json in the selected Gist is not valid".into(),
      Self::Validation(msg) => msg.clone(),
      Self::InvalidState(msg) => (*msg).to_owned(),
      Self::Busy => "Still working on the previous request".into(),
      Self::State(_) => "Failed to read local settings".into(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
