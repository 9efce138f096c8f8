//! Wire shapes of the GitHub Gist REST API, limited to the fields read or
//! written here.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use nowpage_core::{
  handle::{DocumentHandle, HandleId},
  revision::{ChangeStatus, Locator, Revision},
};

// ─── Responses ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Gist {
  pub id:          String,
  pub description: Option<String>,
  #[serde(default)]
  pub public:      bool,
  pub updated_at:  DateTime<Utc>,
  /// Entries can be `null` in responses to a PATCH that removed a file.
  #[serde(default)]
  pub files:       BTreeMap<String, Option<GistFile>>,
  /// Absent from listing responses.
  #[serde(default)]
  pub history:     Vec<HistoryEntry>,
}

impl Gist {
  pub fn file(&self, name: &str) -> Option<&GistFile> {
    self.files.get(name).and_then(Option::as_ref)
  }

  pub fn to_handle(&self) -> DocumentHandle {
    DocumentHandle {
      id:         HandleId::new(self.id.clone()),
      label:      self.description.clone(),
      public:     self.public,
      updated_at: self.updated_at,
      files:      self.files.keys().cloned().collect(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GistFile {
  pub raw_url:   Option<String>,
  /// Set when `content` was cut off by the API; fetch `raw_url` instead.
  #[serde(default)]
  pub truncated: bool,
  /// Absent from listing responses.
  pub content:   Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryEntry {
  pub version:       String,
  pub committed_at:  DateTime<Utc>,
  #[serde(default)]
  pub change_status: WireChangeStatus,
  pub url:           String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct WireChangeStatus {
  #[serde(default)]
  pub additions: u32,
  #[serde(default)]
  pub deletions: u32,
  #[serde(default)]
  pub total:     u32,
}

impl From<&HistoryEntry> for Revision {
  fn from(entry: &HistoryEntry) -> Self {
    Revision {
      version:      entry.version.clone(),
      committed_at: entry.committed_at,
      locator:      Locator::new(entry.url.clone()),
      change:       ChangeStatus {
        additions: entry.change_status.additions,
        deletions: entry.change_status.deletions,
        total:     entry.change_status.total,
      },
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
  pub login: String,
  pub name:  Option<String>,
}

/// Error payload returned alongside non-success statuses.
#[derive(Debug, Deserialize)]
pub struct ApiMessage {
  pub message: String,
}

// ─── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct FileContent<'a> {
  pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct CreateGist<'a> {
  pub description: &'a str,
  pub public:      bool,
  pub files:       BTreeMap<&'a str, FileContent<'a>>,
}

/// Body of `PATCH /gists/{id}`; omitted parts are left untouched.
#[derive(Debug, Default, Serialize)]
pub struct PatchGist<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<&'a str>,
  #[serde(skip_serializing_if = "BTreeMap::is_empty")]
  pub files:       BTreeMap<&'a str, FileContent<'a>>,
}
