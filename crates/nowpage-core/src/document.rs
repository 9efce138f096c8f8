//! The now-page document: an ordered mapping from field name to value.
//!
//! The persisted form is exactly the field mapping, pretty-printed with
//! two-space indentation. The `updated_at` timestamp lives beside the body in
//! a [`Snapshot`] and never inside it.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use strum::{Display, EnumString};

use crate::Result;

/// Key the in-memory timestamp was historically attached under. Never
/// persisted, never accepted as a field name.
pub const UPDATED_AT_KEY: &str = "updatedAt";

/// Field holding the `{name, uri}` playlist map.
pub const PLAYLIST_FIELD: &str = "playlist";

/// Field names with a conventional shape, in display order.
pub const WELL_KNOWN_FIELDS: [&str; 6] =
  ["status", "location", "playlist", "activities", "plans", "projects"];

// ─── Field values ────────────────────────────────────────────────────────────

/// The shape of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum FieldKind {
  #[strum(to_string = "text", serialize = "string")]
  Text,
  #[strum(to_string = "list", serialize = "array")]
  List,
  #[strum(to_string = "map", serialize = "object")]
  Map,
}

/// One field value: plain text, an ordered list of text, or a text-to-text
/// map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
  Text(String),
  List(Vec<String>),
  Map(IndexMap<String, String>),
}

impl FieldValue {
  /// An empty value of the given shape.
  pub fn empty(kind: FieldKind) -> Self {
    match kind {
      FieldKind::Text => Self::Text(String::new()),
      FieldKind::List => Self::List(Vec::new()),
      FieldKind::Map => Self::Map(IndexMap::new()),
    }
  }

  pub fn kind(&self) -> FieldKind {
    match self {
      Self::Text(_) => FieldKind::Text,
      Self::List(_) => FieldKind::List,
      Self::Map(_) => FieldKind::Map,
    }
  }

  pub fn as_text(&self) -> Option<&str> {
    match self {
      Self::Text(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[String]> {
    match self {
      Self::List(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_map(&self) -> Option<&IndexMap<String, String>> {
    match self {
      Self::Map(map) => Some(map),
      _ => None,
    }
  }
}

impl From<&str> for FieldValue {
  fn from(s: &str) -> Self { Self::Text(s.to_owned()) }
}

impl From<String> for FieldValue {
  fn from(s: String) -> Self { Self::Text(s) }
}

impl From<Vec<String>> for FieldValue {
  fn from(items: Vec<String>) -> Self { Self::List(items) }
}

impl From<IndexMap<String, String>> for FieldValue {
  fn from(map: IndexMap<String, String>) -> Self { Self::Map(map) }
}

// ─── Document ────────────────────────────────────────────────────────────────

/// The structured now-page content. Field order is preserved as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "IndexMap<String, serde_json::Value>")]
pub struct Document(IndexMap<String, FieldValue>);

impl Document {
  pub fn new() -> Self { Self::default() }

  /// Body of a freshly created handle.
  pub fn starter() -> Self {
    let mut doc = Self::new();
    doc.insert("status", FieldValue::Text(String::new()));
    doc.insert("location", FieldValue::Text(String::new()));
    doc.insert("activities", FieldValue::List(Vec::new()));
    doc.insert("plans", FieldValue::List(Vec::new()));
    doc.insert("projects", FieldValue::List(Vec::new()));
    doc
  }

  /// Parse a stored body.
  pub fn parse(body: &str) -> Result<Self> { Ok(serde_json::from_str(body)?) }

  /// Render the persisted form: pretty-printed JSON, two-space indent.
  pub fn to_body(&self) -> Result<String> {
    Ok(serde_json::to_string_pretty(&self.0)?)
  }

  pub fn get(&self, name: &str) -> Option<&FieldValue> { self.0.get(name) }

  pub fn contains(&self, name: &str) -> bool { self.0.contains_key(name) }

  /// Insert or overwrite a field, keeping the position of an existing key.
  pub fn insert(
    &mut self,
    name: impl Into<String>,
    value: FieldValue,
  ) -> Option<FieldValue> {
    self.0.insert(name.into(), value)
  }

  /// Remove a field, preserving the order of the remaining ones.
  pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
    self.0.shift_remove(name)
  }

  /// A copy with `name` set to `value`; all sibling fields are kept.
  pub fn with_field(&self, name: &str, value: FieldValue) -> Self {
    let mut next = self.clone();
    next.insert(name, value);
    next
  }

  /// A copy with `name` fully absent.
  pub fn without_field(&self, name: &str) -> Self {
    let mut next = self.clone();
    next.remove(name);
    next
  }

  pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v))
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl Serialize for Document {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.0.serialize(serializer)
  }
}

impl TryFrom<IndexMap<String, serde_json::Value>> for Document {
  type Error = serde_json::Error;

  fn try_from(
    raw: IndexMap<String, serde_json::Value>,
  ) -> Result<Self, Self::Error> {
    raw
      .into_iter()
      .filter(|(name, _)| name != UPDATED_AT_KEY)
      .map(|(name, value)| Ok((name, serde_json::from_value(value)?)))
      .collect::<Result<IndexMap<_, _>, serde_json::Error>>()
      .map(Self)
  }
}

impl FromIterator<(String, FieldValue)> for Document {
  fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

// ─── Snapshot ────────────────────────────────────────────────────────────────

/// A document together with the timestamp derived from store metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
  pub body:       Document,
  pub updated_at: DateTime<Utc>,
}
