//! Bearer credential and the identity it resolves to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A bearer token. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(String);

impl Token {
  /// Wrap a raw token, trimming surrounding whitespace. Returns `None` for
  /// blank input.
  pub fn new(raw: impl Into<String>) -> Option<Self> {
    let raw = raw.into();
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| Self(trimmed.to_owned()))
  }

  pub fn secret(&self) -> &str { &self.0 }
}

impl fmt::Debug for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("Token(***)")
  }
}

/// The authenticated user behind a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub login: String,
  pub name:  Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_token_is_rejected() {
    assert!(Token::new("   ").is_none());
    assert_eq!(Token::new(" ghp_x \n").unwrap().secret(), "ghp_x");
  }

  #[test]
  fn debug_is_redacted() {
    let token = Token::new("ghp_secret").unwrap();
    assert!(!format!("{token:?}").contains("secret"));
  }
}
