//! Plain-text rendering of handles, documents and history for stdout.

use chrono::{DateTime, Utc};

use nowpage_core::{
  credential::Identity,
  document::{FieldValue, PLAYLIST_FIELD, Snapshot},
  handle::{DocumentHandle, HandleId},
  revision::{Revision, Viewing},
};

fn timestamp(at: DateTime<Utc>) -> String {
  at.format("%Y-%m-%d %H:%M UTC").to_string()
}

pub fn identity(identity: &Identity) -> String {
  match &identity.name {
    Some(name) => format!("{} ({name})", identity.login),
    None => identity.login.clone(),
  }
}

/// One line per handle, numbered from 1; the selected one is starred.
pub fn handles(handles: &[DocumentHandle], selected: Option<&HandleId>) -> String {
  if handles.is_empty() {
    return "No Gists with a now.json yet; run `now create`".into();
  }
  handles
    .iter()
    .enumerate()
    .map(|(i, handle)| {
      let mark = if Some(&handle.id) == selected { '*' } else { ' ' };
      let visibility = if handle.public { "public" } else { "secret" };
      format!(
        "{mark} {:>2}  {}  {}  [{visibility}, updated {}]",
        i + 1,
        handle.id,
        handle.display_label(),
        timestamp(handle.updated_at)
      )
    })
    .collect::<Vec<_>>()
    .join("\n")
}

pub fn document(snapshot: &Snapshot, viewing: &Viewing) -> String {
  let mut lines = vec![match viewing {
    Viewing::Latest => format!("Updated {}", timestamp(snapshot.updated_at)),
    Viewing::Revision(_) => {
      format!("Version from {} (not the latest)", timestamp(snapshot.updated_at))
    }
  }];

  let width = snapshot
    .body
    .fields()
    .map(|(name, _)| name.len())
    .max()
    .unwrap_or(0);

  for (name, value) in snapshot.body.fields() {
    match value {
      FieldValue::Text(text) if text.is_empty() => {
        lines.push(format!("{name:<width$}  (empty)"));
      }
      FieldValue::Text(text) => lines.push(format!("{name:<width$}  {text}")),
      FieldValue::Map(entries) if name == PLAYLIST_FIELD => {
        let title = entries.get("name").map_or("", String::as_str);
        let line = match entries.get("uri").filter(|uri| !uri.is_empty()) {
          Some(uri) => format!("{name:<width$}  {title} <{uri}>"),
          None => format!("{name:<width$}  {title}"),
        };
        lines.push(line);
      }
      FieldValue::List(items) => {
        lines.push(name.to_owned());
        lines.extend(items.iter().map(|item| format!("  - {item}")));
      }
      FieldValue::Map(entries) => {
        lines.push(name.to_owned());
        lines.extend(entries.iter().map(|(k, v)| format!("  {k}: {v}")));
      }
    }
  }
  lines.join("\n")
}

/// Newest first, numbered the way `view` and `revert` expect.
pub fn history(revisions: &[Revision], viewing: &Viewing) -> String {
  revisions
    .iter()
    .enumerate()
    .map(|(i, revision)| {
      let mark = if viewing.locator() == Some(&revision.locator) { '>' } else { ' ' };
      let short = revision.version.get(..7).unwrap_or(&revision.version);
      format!(
        "{mark} {:>3}  {}  {short}  +{} -{}",
        i + 1,
        timestamp(revision.committed_at),
        revision.change.additions,
        revision.change.deletions
      )
    })
    .collect::<Vec<_>>()
    .join("\n")
}
