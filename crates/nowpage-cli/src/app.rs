//! Composition root and command implementations.
//!
//! [`App`] wires the SQLite state, the Gist client and the sync services
//! together. Each public method is one `now` subcommand.

use std::sync::Arc;

use anyhow::{Context as _, bail};

use nowpage_core::{
  Error,
  credential::Token,
  document::{FieldKind, PLAYLIST_FIELD, Snapshot},
  handle::{DocumentHandle, HandleId},
  revision::Revision,
};
use nowpage_gist::GistClient;
use nowpage_state_sqlite::SqliteStateStore;
use nowpage_sync::{
  Catalog, CredentialHolder, FieldSession, SaveOutcome, SelectionRegistry,
  Status, SyncEngine,
};

use crate::{prompt, render, settings::Settings};

/// Present a library error by its user-facing message, keeping the error
/// itself as the cause.
fn user_error(err: Error) -> anyhow::Error {
  let message = err.user_message();
  anyhow::Error::new(err).context(message)
}

pub struct App {
  credentials: CredentialHolder<SqliteStateStore, GistClient>,
  registry:    Arc<SelectionRegistry<SqliteStateStore>>,
  catalog:     Catalog<GistClient, SqliteStateStore>,
  engine:      SyncEngine<GistClient>,
  /// Skip confirmation prompts.
  assume_yes:  bool,
}

impl App {
  pub async fn open(settings: &Settings, assume_yes: bool) -> anyhow::Result<Self> {
    let state = SqliteStateStore::open(&settings.state_path)
      .await
      .with_context(|| {
        format!("failed to open local state at {}", settings.state_path.display())
      })?;
    let state = Arc::new(state);
    let client =
      Arc::new(GistClient::new(settings.gist()).context("failed to set up the Gist client")?);

    let credentials = CredentialHolder::new(state.clone(), client.clone());
    let registry = Arc::new(
      SelectionRegistry::load(state)
        .await
        .context("failed to load the selected Gist")?,
    );
    let catalog = Catalog::new(client.clone(), registry.clone(), credentials.subscribe());
    let engine = SyncEngine::new(client, credentials.subscribe(), registry.subscribe());

    Ok(Self {
      credentials,
      registry,
      catalog,
      engine,
      assume_yes,
    })
  }

  fn confirm(&self, question: &str) -> bool {
    self.assume_yes || prompt::confirm(question).unwrap_or(false)
  }

  /// Restore the saved token; fail if there is none.
  async fn signed_in(&self) -> anyhow::Result<()> {
    self
      .credentials
      .restore()
      .await
      .context("failed to read the saved credential")?;
    if !self.credentials.is_authenticated() {
      bail!("Not signed in; run `now login` first");
    }
    Ok(())
  }

  fn selected(&self) -> anyhow::Result<HandleId> {
    self
      .registry
      .selected()
      .context("No Gist selected; run `now list` and `now select`")
  }

  // ─── Credential ──────────────────────────────────────────────────────────

  pub async fn login(&self, token: Option<String>) -> anyhow::Result<()> {
    let raw = match token {
      Some(token) => token,
      None => prompt::read_line("GitHub personal access token (gist scope): ")?,
    };
    let token = Token::new(raw).context("No token given")?;

    let identity = match self.credentials.login(token).await {
      Ok(identity) => identity,
      Err(Error::InvalidCredential) => bail!("GitHub did not accept that token"),
      Err(e) => return Err(user_error(e)),
    };
    println!("Signed in as {}", render::identity(&identity));
    Ok(())
  }

  pub async fn logout(&self) -> anyhow::Result<()> {
    self.credentials.logout().await.map_err(user_error)?;
    println!("Signed out");
    Ok(())
  }

  pub async fn whoami(&self) -> anyhow::Result<()> {
    self
      .credentials
      .restore()
      .await
      .context("failed to read the saved credential")?;
    match self.credentials.identity() {
      Some(identity) => println!("{}", render::identity(&identity)),
      None if self.credentials.is_authenticated() => {
        println!("Signed in, but GitHub could not be reached to confirm who you are");
      }
      None => println!("Not signed in"),
    }
    Ok(())
  }

  // ─── Catalog ─────────────────────────────────────────────────────────────

  async fn listed(&self) -> anyhow::Result<Vec<DocumentHandle>> {
    self.signed_in().await?;
    self.catalog.list().await.map_err(user_error)
  }

  pub async fn list(&self) -> anyhow::Result<()> {
    let handles = self.listed().await?;
    let selected = self.registry.selected();
    println!("{}", render::handles(&handles, selected.as_ref()));
    Ok(())
  }

  /// `target` is a position from `now list` or a Gist id.
  pub async fn select(&self, target: &str) -> anyhow::Result<()> {
    let handles = self.listed().await?;
    let found = match target.parse::<usize>() {
      Ok(n) if (1..=handles.len()).contains(&n) => handles.get(n - 1),
      _ => handles.iter().find(|h| h.id.as_str() == target),
    };
    let Some(handle) = found else {
      bail!("No Gist with a now.json matches {target:?}");
    };

    self
      .registry
      .select(handle.id.clone())
      .await
      .map_err(user_error)?;
    println!("Selected {} ({})", handle.display_label(), handle.id);
    Ok(())
  }

  pub async fn create(&self) -> anyhow::Result<()> {
    self.signed_in().await?;
    let id = self.catalog.create().await.map_err(user_error)?;
    println!("Created and selected {id}");
    Ok(())
  }

  pub async fn duplicate(&self, source: Option<String>) -> anyhow::Result<()> {
    self.signed_in().await?;
    let source = match source {
      Some(id) => HandleId::from(id),
      None => self.selected()?,
    };
    let id = self
      .catalog
      .clone_handle(&source)
      .await
      .map_err(user_error)?;
    println!("Cloned {source} into {id}, now selected");
    Ok(())
  }

  pub async fn delete(&self, id: &str) -> anyhow::Result<()> {
    self.signed_in().await?;
    let id = HandleId::from(id);
    if !self.confirm(&format!("Delete Gist {id}? This cannot be undone.")) {
      println!("Cancelled");
      return Ok(());
    }
    self.catalog.delete(&id).await.map_err(user_error)?;
    println!("Deleted {id}");
    Ok(())
  }

  pub async fn rename(&self, id: Option<String>, label: &str) -> anyhow::Result<()> {
    self.signed_in().await?;
    let id = match id {
      Some(id) => HandleId::from(id),
      None => self.selected()?,
    };
    self
      .catalog
      .rename(&id, label)
      .await
      .map_err(user_error)?;
    println!("Renamed {id} to {label:?}");
    Ok(())
  }

  // ─── Document ────────────────────────────────────────────────────────────

  /// Load the latest body of the selected Gist.
  async fn load(&self) -> anyhow::Result<Snapshot> {
    self.signed_in().await?;
    self.selected()?;
    self.engine.refresh().await;

    match self.engine.status() {
      Status::ReadyLatest => self
        .engine
        .current()
        .context("the document vanished after loading"),
      _ => bail!(
        self
          .engine
          .error()
          .unwrap_or_else(|| "Failed to load now page data".into())
      ),
    }
  }

  /// Load revision `n` of `now history` (1 is the newest).
  async fn view_revision(&self, n: usize) -> anyhow::Result<(Revision, Snapshot)> {
    self.load().await?;
    let revisions = self.engine.revisions().unwrap_or_default();
    let Some(revision) = n.checked_sub(1).and_then(|i| revisions.get(i)).cloned() else {
      bail!("No version {n}; `now history` lists {}", revisions.len());
    };

    self.engine.load_version(&revision.locator).await;
    if self.engine.status() != Status::ReadyHistorical {
      bail!(
        self
          .engine
          .error()
          .unwrap_or_else(|| "Failed to load that version".into())
      );
    }
    let snapshot = self
      .engine
      .current()
      .context("the version vanished after loading")?;
    Ok((revision, snapshot))
  }

  pub async fn show(&self) -> anyhow::Result<()> {
    let snapshot = self.load().await?;
    println!("{}", render::document(&snapshot, &self.engine.viewing()));
    Ok(())
  }

  pub async fn history(&self) -> anyhow::Result<()> {
    self.load().await?;
    let revisions = self.engine.revisions().unwrap_or_default();
    println!("{}", render::history(&revisions, &self.engine.viewing()));
    Ok(())
  }

  pub async fn view(&self, n: usize) -> anyhow::Result<()> {
    let (_, snapshot) = self.view_revision(n).await?;
    println!("{}", render::document(&snapshot, &self.engine.viewing()));
    Ok(())
  }

  pub async fn revert(&self, n: usize) -> anyhow::Result<()> {
    if n == 1 {
      println!("Version 1 is already the latest");
      return Ok(());
    }
    let (revision, snapshot) = self.view_revision(n).await?;

    println!("{}", render::document(&snapshot, &self.engine.viewing()));
    if !self.confirm(&format!("Make the version from {} the latest?", revision.committed_at)) {
      println!("Cancelled");
      return Ok(());
    }
    self.engine.revert_to_viewing().await.map_err(user_error)?;
    println!("Reverted to version {n}");
    Ok(())
  }

  // ─── Fields ──────────────────────────────────────────────────────────────

  /// Open `field` (or start it with `kind`), apply `edit`, and save.
  async fn edit(
    &self,
    field: &str,
    kind: FieldKind,
    edit: impl FnOnce(&mut FieldSession) -> nowpage_core::Result<()>,
  ) -> anyhow::Result<()> {
    let current = self.load().await?;
    let mut session = if current.body.contains(field) {
      FieldSession::open(&current.body, field)
    } else {
      FieldSession::create(field, kind)
    }
    .map_err(user_error)?;

    edit(&mut session).map_err(user_error)?;

    match session.save(&self.engine).await.map_err(user_error)? {
      SaveOutcome::Saved => println!("Saved {}", session.name()),
      SaveOutcome::Skipped => println!("Nothing to save; {} left unchanged", session.name()),
    }
    Ok(())
  }

  /// Set a text field, or one entry of a map field when `key` is given.
  pub async fn set(
    &self,
    field: &str,
    value: String,
    key: Option<String>,
  ) -> anyhow::Result<()> {
    match key {
      Some(key) => {
        self
          .edit(field, FieldKind::Map, |s| s.set_entry(&key, value))
          .await
      }
      None => self.edit(field, FieldKind::Text, |s| s.set_text(value)).await,
    }
  }

  pub async fn push(&self, field: &str, items: Vec<String>) -> anyhow::Result<()> {
    self
      .edit(field, FieldKind::List, |s| {
        items.into_iter().try_for_each(|item| s.push_item(item))
      })
      .await
  }

  pub async fn playlist(&self, name: String, uri: Option<String>) -> anyhow::Result<()> {
    self
      .edit(PLAYLIST_FIELD, FieldKind::Map, |s| {
        s.set_entry("name", name)?;
        s.set_entry("uri", uri.unwrap_or_default())
      })
      .await
  }

  pub async fn unset(&self, field: &str) -> anyhow::Result<()> {
    let current = self.load().await?;
    let session = FieldSession::open(&current.body, field).map_err(user_error)?;

    let outcome = session
      .delete(&self.engine, |name| self.confirm(&format!("Remove {name}?")))
      .await
      .map_err(user_error)?;
    match outcome {
      SaveOutcome::Saved => println!("Removed {field}"),
      SaveOutcome::Skipped => println!("Cancelled"),
    }
    Ok(())
  }
}
