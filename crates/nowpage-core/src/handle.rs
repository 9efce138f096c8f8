//! Handle — one remote-stored document instance (a gist).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::BODY_FILENAME;

/// Store-assigned identifier of a handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(String);

impl HandleId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for HandleId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<String> for HandleId {
  fn from(id: String) -> Self { Self(id) }
}

impl From<&str> for HandleId {
  fn from(id: &str) -> Self { Self(id.to_owned()) }
}

/// A candidate document as returned by a listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentHandle {
  pub id:         HandleId,
  /// Human-readable label (the gist description); may be absent.
  pub label:      Option<String>,
  pub public:     bool,
  pub updated_at: DateTime<Utc>,
  /// Filenames in the handle's file set.
  pub files:      Vec<String>,
}

impl DocumentHandle {
  /// Whether the handle's file set contains the document body.
  pub fn has_body(&self) -> bool {
    self.files.iter().any(|f| f == BODY_FILENAME)
  }

  /// The label, or a placeholder for unlabelled handles.
  pub fn display_label(&self) -> &str {
    match self.label.as_deref() {
      Some(label) if !label.trim().is_empty() => label,
      _ => "Untitled Gist",
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn handle(files: &[&str], label: Option<&str>) -> DocumentHandle {
    DocumentHandle {
      id:         HandleId::new("abc"),
      label:      label.map(str::to_owned),
      public:     false,
      updated_at: Utc::now(),
      files:      files.iter().map(|f| f.to_string()).collect(),
    }
  }

  #[test]
  fn has_body_requires_exact_filename() {
    assert!(handle(&["notes.md", "now.json"], None).has_body());
    assert!(!handle(&["now.json.bak", "Now.json"], None).has_body());
  }

  #[test]
  fn blank_label_falls_back() {
    assert_eq!(handle(&[], Some("  ")).display_label(), "Untitled Gist");
    assert_eq!(handle(&[], Some("Mine")).display_label(), "Mine");
  }
}
