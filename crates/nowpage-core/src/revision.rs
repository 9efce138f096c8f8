//! Revisions — immutable historical snapshots tracked by the store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque reference to one revision's content, issued by the store.
///
/// Callers never construct locators from ids; they only pass back what a
/// history listing returned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
  pub fn new(locator: impl Into<String>) -> Self { Self(locator.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Locator {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Change magnitude of one revision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStatus {
  pub additions: u32,
  pub deletions: u32,
  pub total:     u32,
}

/// One entry of a handle's history. Listings are newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
  pub version:      String,
  pub committed_at: DateTime<Utc>,
  pub locator:      Locator,
  pub change:       ChangeStatus,
}

// ─── Viewing pointer ─────────────────────────────────────────────────────────

/// Whether the in-memory document reflects HEAD or a historical revision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Viewing {
  #[default]
  Latest,
  Revision(Locator),
}

impl Viewing {
  pub fn is_latest(&self) -> bool { matches!(self, Self::Latest) }

  pub fn locator(&self) -> Option<&Locator> {
    match self {
      Self::Latest => None,
      Self::Revision(locator) => Some(locator),
    }
  }
}
