//! Field editing sessions.
//!
//! A session copies one field's value out of the document, edits the copy,
//! and on save merges it back into the whole document through
//! [`SyncEngine::update_whole`]. Sibling fields are never touched.

use indexmap::IndexMap;

use nowpage_core::{
  Error, Result,
  document::{Document, FieldKind, FieldValue, PLAYLIST_FIELD, UPDATED_AT_KEY},
  store::DocumentStore,
};

use crate::{Status, SyncEngine};

/// Map keys of the playlist field.
const PLAYLIST_KEYS: [&str; 2] = ["name", "uri"];

/// How a session normalises its value before saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
  Text,
  List,
  Map,
  /// The `{name, uri}` map held by the `playlist` field.
  Playlist,
}

impl FieldShape {
  fn of(name: &str, kind: FieldKind) -> Self {
    match kind {
      FieldKind::Map if name == PLAYLIST_FIELD => Self::Playlist,
      FieldKind::Text => Self::Text,
      FieldKind::List => Self::List,
      FieldKind::Map => Self::Map,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
  /// The merged document was written.
  Saved,
  /// Nothing worth writing; the engine was not called.
  Skipped,
}

/// Transient edit state for one named field.
#[derive(Debug, Clone)]
pub struct FieldSession {
  name:  String,
  shape: FieldShape,
  value: FieldValue,
}

impl FieldSession {
  /// Start editing an existing field of `document`.
  pub fn open(document: &Document, name: &str) -> Result<Self> {
    let value = document
      .get(name)
      .cloned()
      .ok_or_else(|| Error::Validation(format!("no field named {name:?}")))?;
    Ok(Self {
      name: name.to_owned(),
      shape: FieldShape::of(name, value.kind()),
      value,
    })
  }

  /// Start a new field of the given shape. Saving over an existing field of
  /// the same name replaces it.
  pub fn create(name: &str, kind: FieldKind) -> Result<Self> {
    let name = name.trim();
    if name.is_empty() {
      return Err(Error::Validation("Please enter a field name".into()));
    }
    if name == UPDATED_AT_KEY {
      return Err(Error::Validation(format!("{UPDATED_AT_KEY} is reserved")));
    }

    let shape = FieldShape::of(name, kind);
    let value = match shape {
      FieldShape::Playlist => FieldValue::Map(
        PLAYLIST_KEYS
          .iter()
          .map(|k| ((*k).to_owned(), String::new()))
          .collect(),
      ),
      _ => FieldValue::empty(kind),
    };
    Ok(Self {
      name: name.to_owned(),
      shape,
      value,
    })
  }

  pub fn name(&self) -> &str { &self.name }

  pub fn shape(&self) -> FieldShape { self.shape }

  pub fn value(&self) -> &FieldValue { &self.value }

  // ─── Text ────────────────────────────────────────────────────────────────

  pub fn set_text(&mut self, text: impl Into<String>) -> Result<()> {
    let Self { name, value, .. } = self;
    match value {
      FieldValue::Text(current) => {
        *current = text.into();
        Ok(())
      }
      other => Err(wrong_shape(name, other, "text")),
    }
  }

  // ─── List ────────────────────────────────────────────────────────────────

  pub fn push_item(&mut self, item: impl Into<String>) -> Result<()> {
    self.items()?.push(item.into());
    Ok(())
  }

  pub fn set_item(&mut self, index: usize, item: impl Into<String>) -> Result<()> {
    let slot = self
      .items()?
      .get_mut(index)
      .ok_or_else(|| out_of_range(index))?;
    *slot = item.into();
    Ok(())
  }

  pub fn remove_item(&mut self, index: usize) -> Result<String> {
    let items = self.items()?;
    if index >= items.len() {
      return Err(out_of_range(index));
    }
    Ok(items.remove(index))
  }

  /// Move the item at `from` so it ends up at `to`.
  pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
    let items = self.items()?;
    if from >= items.len() {
      return Err(out_of_range(from));
    }
    if to >= items.len() {
      return Err(out_of_range(to));
    }
    let item = items.remove(from);
    items.insert(to, item);
    Ok(())
  }

  fn items(&mut self) -> Result<&mut Vec<String>> {
    let Self { name, value, .. } = self;
    match value {
      FieldValue::List(items) => Ok(items),
      other => Err(wrong_shape(name, other, "list")),
    }
  }

  // ─── Map ─────────────────────────────────────────────────────────────────

  /// Add an empty entry under `key`. An existing key keeps its value.
  pub fn add_key(&mut self, key: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
      return Err(Error::Validation("Please enter a key name".into()));
    }
    self.open_entries()?.entry(key.to_owned()).or_default();
    Ok(())
  }

  /// Set the value under `key`, adding the key if needed.
  pub fn set_entry(
    &mut self,
    key: &str,
    value: impl Into<String>,
  ) -> Result<()> {
    if self.shape == FieldShape::Playlist && !PLAYLIST_KEYS.contains(&key) {
      return Err(Error::Validation(format!(
        "playlist has no {key:?} entry"
      )));
    }
    if key.trim().is_empty() {
      return Err(Error::Validation("Please enter a key name".into()));
    }
    self.entries()?.insert(key.to_owned(), value.into());
    Ok(())
  }

  pub fn remove_key(&mut self, key: &str) -> Result<String> {
    self
      .open_entries()?
      .shift_remove(key)
      .ok_or_else(|| Error::Validation(format!("no key named {key:?}")))
  }

  fn entries(&mut self) -> Result<&mut IndexMap<String, String>> {
    let Self { name, value, .. } = self;
    match value {
      FieldValue::Map(entries) => Ok(entries),
      other => Err(wrong_shape(name, other, "map")),
    }
  }

  /// Entries of a map whose key set may change. The playlist's is fixed.
  fn open_entries(&mut self) -> Result<&mut IndexMap<String, String>> {
    if self.shape == FieldShape::Playlist {
      return Err(Error::Validation(
        "playlist entries are fixed to name and uri".into(),
      ));
    }
    self.entries()
  }

  // ─── Save / delete ───────────────────────────────────────────────────────

  /// The value to persist, or `None` when saving should be skipped.
  ///
  /// Text must be non-blank. Blank list items are dropped and an empty list
  /// is skipped. A playlist needs a name; its uri may be empty. Other maps
  /// are kept as they are.
  pub fn cleaned(&self) -> Option<FieldValue> {
    match (&self.shape, &self.value) {
      (_, FieldValue::Text(text)) => {
        (!text.trim().is_empty()).then(|| self.value.clone())
      }
      (_, FieldValue::List(items)) => {
        let kept: Vec<String> = items
          .iter()
          .filter(|item| !item.trim().is_empty())
          .cloned()
          .collect();
        (!kept.is_empty()).then_some(FieldValue::List(kept))
      }
      (FieldShape::Playlist, FieldValue::Map(entries)) => entries
        .get("name")
        .is_some_and(|name| !name.trim().is_empty())
        .then(|| self.value.clone()),
      (_, FieldValue::Map(_)) => Some(self.value.clone()),
    }
  }

  /// Merge the cleaned value into the latest document and write the whole
  /// document.
  pub async fn save<D: DocumentStore>(
    &self,
    engine: &SyncEngine<D>,
  ) -> Result<SaveOutcome> {
    let Some(value) = self.cleaned() else {
      tracing::debug!(field = %self.name, "nothing to save");
      return Ok(SaveOutcome::Skipped);
    };
    let merged = latest(engine).await?.with_field(&self.name, value);
    engine.update_whole(merged).await?;
    Ok(SaveOutcome::Saved)
  }

  /// Remove this field from the document once `confirm` agrees.
  pub async fn delete<D: DocumentStore>(
    &self,
    engine: &SyncEngine<D>,
    confirm: impl FnOnce(&str) -> bool,
  ) -> Result<SaveOutcome> {
    let body = latest(engine).await?;
    if !body.contains(&self.name) || !confirm(&self.name) {
      return Ok(SaveOutcome::Skipped);
    }

    engine.update_whole(body.without_field(&self.name)).await?;
    Ok(SaveOutcome::Saved)
  }
}

/// HEAD's body. A historical view is reloaded first so an edit never carries
/// an old version's other fields back into HEAD.
async fn latest<D: DocumentStore>(engine: &SyncEngine<D>) -> Result<Document> {
  if engine.status() == Status::ReadyHistorical {
    tracing::debug!("reloading the latest version before editing");
    engine.refresh().await;
  }
  match (engine.status(), engine.current()) {
    (Status::ReadyLatest, Some(current)) => Ok(current.body),
    _ => Err(Error::InvalidState("the latest document is not loaded")),
  }
}

fn wrong_shape(name: &str, value: &FieldValue, wanted: &str) -> Error {
  Error::Validation(format!(
    "{name} is a {} field, not a {wanted}",
    value.kind()
  ))
}

fn out_of_range(index: usize) -> Error {
  Error::Validation(format!("no item at position {index}"))
}
