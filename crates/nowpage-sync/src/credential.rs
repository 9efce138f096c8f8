//! Credential Holder — owns the bearer token and the identity cache.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;

use nowpage_core::{
  Error, Result,
  credential::{Identity, Token},
  state::{StateKey, StateStore},
  store::IdentityVerifier,
};

/// Holds the bearer token, persists it, and validates it against the store's
/// identity endpoint.
///
/// Token changes are published on a `watch` channel; see
/// [`subscribe`](Self::subscribe).
pub struct CredentialHolder<S, V> {
  state:    Arc<S>,
  verifier: Arc<V>,
  token:    watch::Sender<Option<Token>>,
  identity: Mutex<Option<Identity>>,
}

impl<S, V> CredentialHolder<S, V>
where
  S: StateStore,
  V: IdentityVerifier,
{
  /// A holder with no token. Call [`restore`](Self::restore) to load the
  /// persisted one.
  pub fn new(state: Arc<S>, verifier: Arc<V>) -> Self {
    let (token, _) = watch::channel(None);
    Self {
      state,
      verifier,
      token,
      identity: Mutex::new(None),
    }
  }

  /// Load the persisted token and validate it.
  ///
  /// A token the store rejects is treated as no token and logged out. A
  /// transport failure keeps the token so a later call can succeed.
  pub async fn restore(&self) -> Result<Option<Identity>> {
    let saved = self
      .state
      .load(StateKey::Token)
      .await
      .map_err(Error::state)?;
    let Some(token) = saved.and_then(Token::new) else {
      return Ok(None);
    };

    self.token.send_replace(Some(token.clone()));
    match self.verifier.verify(&token).await {
      Ok(identity) => {
        tracing::debug!(login = %identity.login, "restored credential");
        *self.identity_slot() = Some(identity.clone());
        Ok(Some(identity))
      }
      Err(e) if e.is_auth_failure() => {
        tracing::warn!("saved credential was rejected; signing out");
        self.logout().await?;
        Ok(None)
      }
      Err(e) => {
        tracing::warn!("could not validate saved credential: {e}");
        Ok(None)
      }
    }
  }

  /// Validate `candidate` and, if accepted, persist it and make it current.
  pub async fn login(&self, candidate: Token) -> Result<Identity> {
    let identity = match self.verifier.verify(&candidate).await {
      Ok(identity) => identity,
      Err(e) if e.is_auth_failure() => return Err(Error::InvalidCredential),
      Err(e) => return Err(e),
    };

    self
      .state
      .save(StateKey::Token, candidate.secret())
      .await
      .map_err(Error::state)?;
    *self.identity_slot() = Some(identity.clone());
    self.token.send_replace(Some(candidate));
    tracing::info!(login = %identity.login, "signed in");
    Ok(identity)
  }

  /// Forget the token and the cached identity.
  pub async fn logout(&self) -> Result<()> {
    self
      .state
      .clear(StateKey::Token)
      .await
      .map_err(Error::state)?;
    *self.identity_slot() = None;
    self.token.send_replace(None);
    Ok(())
  }

  pub fn token(&self) -> Option<Token> { self.token.borrow().clone() }

  pub fn is_authenticated(&self) -> bool { self.token.borrow().is_some() }

  /// The identity resolved by the last successful validation.
  pub fn identity(&self) -> Option<Identity> { self.identity_slot().clone() }

  /// Receive every token change.
  pub fn subscribe(&self) -> watch::Receiver<Option<Token>> {
    self.token.subscribe()
  }

  fn identity_slot(&self) -> std::sync::MutexGuard<'_, Option<Identity>> {
    self.identity.lock().unwrap_or_else(PoisonError::into_inner)
  }
}
