//! Async HTTP client wrapping the GitHub Gist REST API.

use std::{collections::BTreeMap, time::Duration};

use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde::de::DeserializeOwned;

use nowpage_core::{
  BODY_FILENAME, Error, Result,
  credential::{Identity, Token},
  document::{Document, Snapshot},
  handle::{DocumentHandle, HandleId},
  revision::{Locator, Revision},
  store::{DocumentStore, Fetched, IdentityVerifier, clone_label},
};

use crate::wire::{self, CreateGist, FileContent, PatchGist};

const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;

/// Connection settings for the Gist API.
#[derive(Debug, Clone)]
pub struct GistConfig {
  pub api_url:    String,
  pub user_agent: String,
  pub timeout:    Duration,
}

impl Default for GistConfig {
  fn default() -> Self {
    Self {
      api_url:    "https://api.github.com".to_string(),
      user_agent: concat!("nowpage/", env!("CARGO_PKG_VERSION")).to_string(),
      timeout:    Duration::from_secs(30),
    }
  }
}

/// What a request was about; decides how a 404 is reported.
#[derive(Clone, Copy)]
enum Target<'a> {
  Account,
  Listing,
  Handle(&'a HandleId),
  Version(&'a Locator),
}

/// Async HTTP client for the Gist API.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct GistClient {
  client: Client,
  config: GistConfig,
}

impl GistClient {
  pub fn new(config: GistConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(config.timeout)
      .user_agent(config.user_agent.clone())
      .build()
      .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;
    Ok(Self { client, config })
  }

  fn base(&self) -> &str { self.config.api_url.trim_end_matches('/') }

  fn url(&self, path: &str) -> String { format!("{}{}", self.base(), path) }

  fn auth(&self, req: RequestBuilder, token: &Token) -> RequestBuilder {
    req
      .bearer_auth(token.secret())
      .header(header::ACCEPT, "application/vnd.github+json")
      .header("X-GitHub-Api-Version", API_VERSION)
  }

  /// Locators are only dereferenced under the configured API origin so the
  /// credential is never sent to another host.
  fn owns_locator(&self, locator: &Locator) -> bool {
    locator
      .as_str()
      .strip_prefix(self.base())
      .is_some_and(|rest| rest.starts_with('/'))
  }

  async fn send(
    &self,
    req: RequestBuilder,
    target: Target<'_>,
    what: &str,
  ) -> Result<Response> {
    tracing::debug!("{what}");
    let resp = req
      .send()
      .await
      .map_err(|e| Error::Network(format!("{what} failed: {e}")))?;

    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }

    let message = match resp.json::<wire::ApiMessage>().await {
      Ok(body) => body.message,
      Err(_) => status.canonical_reason().unwrap_or_default().to_owned(),
    };
    tracing::warn!(%status, %message, "{what} rejected");
    Err(status_error(status, target, message))
  }

  async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
    let status = resp.status().as_u16();
    let bytes = resp
      .bytes()
      .await
      .map_err(|e| Error::Network(format!("reading {what}: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::Remote {
      status,
      message: format!("unexpected {what} payload: {e}"),
    })
  }

  // ── Gists ─────────────────────────────────────────────────────────────────

  /// `GET /gists/{id}`
  async fn fetch_gist(&self, token: &Token, id: &HandleId) -> Result<wire::Gist> {
    let what = format!("GET /gists/{id}");
    let resp = self
      .send(
        self.auth(self.client.get(self.url(&format!("/gists/{id}"))), token),
        Target::Handle(id),
        &what,
      )
      .await?;
    Self::decode(resp, "gist").await
  }

  /// Full content of `file`, following `raw_url` when the API truncated it.
  async fn file_content(&self, file: &wire::GistFile) -> Result<Option<String>> {
    match (&file.content, file.truncated, &file.raw_url) {
      (Some(content), false, _) => Ok(Some(content.clone())),
      (_, _, Some(raw_url)) => {
        let what = format!("GET {raw_url}");
        tracing::debug!("{what}");
        let resp = self
          .client
          .get(raw_url)
          .send()
          .await
          .map_err(|e| Error::Network(format!("{what} failed: {e}")))?;
        if !resp.status().is_success() {
          return Err(Error::Remote {
            status:  resp.status().as_u16(),
            message: format!("{what} failed"),
          });
        }
        let text = resp
          .text()
          .await
          .map_err(|e| Error::Network(format!("reading {raw_url}: {e}")))?;
        Ok(Some(text))
      }
      (content, _, None) => Ok(content.clone()),
    }
  }

  /// Parse the document body out of a gist response.
  async fn body_of(&self, gist: &wire::Gist, id: &HandleId) -> Result<Document> {
    let file = gist
      .file(BODY_FILENAME)
      .ok_or_else(|| Error::BodyMissing(id.clone()))?;
    let content = self
      .file_content(file)
      .await?
      .ok_or_else(|| Error::BodyMissing(id.clone()))?;
    Document::parse(&content)
  }

  async fn patch_gist(
    &self,
    token: &Token,
    id: &HandleId,
    patch: &PatchGist<'_>,
  ) -> Result<wire::Gist> {
    let what = format!("PATCH /gists/{id}");
    let resp = self
      .send(
        self
          .auth(self.client.patch(self.url(&format!("/gists/{id}"))), token)
          .json(patch),
        Target::Handle(id),
        &what,
      )
      .await?;
    Self::decode(resp, "gist").await
  }

  async fn create_gist(&self, token: &Token, body: &CreateGist<'_>) -> Result<HandleId> {
    let resp = self
      .send(
        self.auth(self.client.post(self.url("/gists")), token).json(body),
        Target::Listing,
        "POST /gists",
      )
      .await?;
    let gist: wire::Gist = Self::decode(resp, "gist").await?;
    tracing::info!(id = %gist.id, "created gist");
    Ok(HandleId::new(gist.id))
  }
}

/// Map a non-success status onto the error taxonomy.
fn status_error(status: StatusCode, target: Target<'_>, message: String) -> Error {
  match (status, target) {
    (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => Error::Unauthorized,
    (StatusCode::NOT_FOUND, Target::Handle(id)) => Error::NotFound(id.clone()),
    (StatusCode::NOT_FOUND, Target::Version(locator)) => {
      Error::VersionNotFound(locator.clone())
    }
    (StatusCode::NOT_FOUND, Target::Account) => Error::Unauthorized,
    _ => Error::Remote {
      status: status.as_u16(),
      message,
    },
  }
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for GistClient {
  /// `GET /gists`, every page, keeping gists that hold the body file.
  async fn list_documents(&self, token: &Token) -> Result<Vec<DocumentHandle>> {
    let mut handles = Vec::new();
    for page in 1.. {
      let resp = self
        .send(
          self
            .auth(self.client.get(self.url("/gists")), token)
            .query(&[("per_page", PAGE_SIZE), ("page", page)]),
          Target::Listing,
          &format!("GET /gists?page={page}"),
        )
        .await?;
      let gists: Vec<wire::Gist> = Self::decode(resp, "gist listing").await?;
      let last_page = gists.len() < PAGE_SIZE;
      handles.extend(
        gists
          .iter()
          .map(wire::Gist::to_handle)
          .filter(DocumentHandle::has_body),
      );
      if last_page {
        break;
      }
    }
    Ok(handles)
  }

  async fn get_document(&self, token: &Token, id: &HandleId) -> Result<Fetched> {
    let gist = self.fetch_gist(token, id).await?;
    let body = self.body_of(&gist, id).await?;
    Ok(Fetched {
      handle:    gist.to_handle(),
      snapshot:  Snapshot {
        body,
        updated_at: gist.updated_at,
      },
      revisions: gist.history.iter().map(Revision::from).collect(),
    })
  }

  /// `GET <locator>` — the locator is the history entry's own URL.
  async fn get_document_version(
    &self,
    token: &Token,
    id: &HandleId,
    locator: &Locator,
  ) -> Result<Snapshot> {
    if !self.owns_locator(locator) {
      tracing::warn!(%locator, "refusing locator outside the API origin");
      return Err(Error::VersionNotFound(locator.clone()));
    }

    let what = format!("GET {locator}");
    let resp = self
      .send(
        self.auth(self.client.get(locator.as_str()), token),
        Target::Version(locator),
        &what,
      )
      .await?;
    let gist: wire::Gist = Self::decode(resp, "gist revision").await?;
    if gist.id != id.as_str() {
      return Err(Error::VersionNotFound(locator.clone()));
    }

    let body = self.body_of(&gist, id).await?;
    let updated_at = gist
      .history
      .iter()
      .find(|entry| entry.url == locator.as_str())
      .or_else(|| gist.history.first())
      .map_or(gist.updated_at, |entry| entry.committed_at);
    Ok(Snapshot { body, updated_at })
  }

  async fn patch_document(
    &self,
    token: &Token,
    id: &HandleId,
    body: &Document,
  ) -> Result<DateTime<Utc>> {
    let content = body.to_body()?;
    let patch = PatchGist {
      files: BTreeMap::from([(BODY_FILENAME, FileContent { content: &content })]),
      ..PatchGist::default()
    };
    let gist = self.patch_gist(token, id, &patch).await?;
    tracing::info!(%id, "patched {BODY_FILENAME}");
    Ok(gist.updated_at)
  }

  async fn create_document(
    &self,
    token: &Token,
    label: &str,
    body: &Document,
  ) -> Result<HandleId> {
    let content = body.to_body()?;
    self
      .create_gist(token, &CreateGist {
        description: label,
        public:      false,
        files:       BTreeMap::from([(BODY_FILENAME, FileContent {
          content: &content,
        })]),
      })
      .await
  }

  async fn delete_document(&self, token: &Token, id: &HandleId) -> Result<()> {
    let what = format!("DELETE /gists/{id}");
    self
      .send(
        self.auth(self.client.delete(self.url(&format!("/gists/{id}"))), token),
        Target::Handle(id),
        &what,
      )
      .await?;
    tracing::info!(%id, "deleted gist");
    Ok(())
  }

  async fn rename_document(
    &self,
    token: &Token,
    id: &HandleId,
    label: &str,
  ) -> Result<()> {
    let patch = PatchGist {
      description: Some(label),
      ..PatchGist::default()
    };
    self.patch_gist(token, id, &patch).await?;
    Ok(())
  }

  async fn clone_document(&self, token: &Token, id: &HandleId) -> Result<HandleId> {
    let source = self.fetch_gist(token, id).await?;

    let mut contents = BTreeMap::new();
    for (name, file) in &source.files {
      let Some(file) = file else { continue };
      if let Some(content) = self.file_content(file).await? {
        contents.insert(name.as_str(), content);
      }
    }

    let label = clone_label(source.description.as_deref());
    let files = contents
      .iter()
      .map(|(name, content)| (*name, FileContent { content: content.as_str() }))
      .collect();
    self
      .create_gist(token, &CreateGist {
        description: &label,
        public: false,
        files,
      })
      .await
  }
}

// ─── IdentityVerifier impl ───────────────────────────────────────────────────

impl IdentityVerifier for GistClient {
  /// `GET /user`
  async fn verify(&self, token: &Token) -> Result<Identity> {
    let resp = self
      .send(
        self.auth(self.client.get(self.url("/user")), token),
        Target::Account,
        "GET /user",
      )
      .await?;
    let user: wire::User = Self::decode(resp, "user").await?;
    Ok(Identity {
      login: user.login,
      name:  user.name,
    })
  }
}
