//! Layered configuration: defaults, then the TOML file, then `NOWPAGE_*`
//! environment variables, then command-line flags.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use serde::Deserialize;

use nowpage_gist::GistConfig;

const DEFAULT_CONFIG_PATH: &str = "~/.config/nowpage/config.toml";
const DEFAULT_STATE_PATH: &str = "~/.local/share/nowpage/state.db";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// Base URL of the GitHub REST API.
  pub api_url:      String,
  /// SQLite file holding the selected Gist and the saved token.
  pub state_path:   PathBuf,
  pub timeout_secs: u64,
  pub user_agent:   String,
}

/// Values given on the command line; they beat every other source.
#[derive(Debug, Default)]
pub struct Overrides {
  pub api_url:    Option<String>,
  pub state_path: Option<PathBuf>,
}

impl Settings {
  pub fn load(file: Option<&Path>, overrides: Overrides) -> anyhow::Result<Self> {
    let file = file.map_or_else(
      || expand_tilde(Path::new(DEFAULT_CONFIG_PATH)),
      expand_tilde,
    );
    let defaults = GistConfig::default();

    let settings = config::Config::builder()
      .set_default("api_url", defaults.api_url)?
      .set_default("state_path", DEFAULT_STATE_PATH)?
      .set_default("timeout_secs", defaults.timeout.as_secs())?
      .set_default("user_agent", defaults.user_agent)?
      .add_source(config::File::from(file.as_path()).required(false))
      .add_source(config::Environment::with_prefix("NOWPAGE"))
      .set_override_option("api_url", overrides.api_url)?
      .set_override_option(
        "state_path",
        overrides
          .state_path
          .map(|p| p.to_string_lossy().into_owned()),
      )?
      .build()
      .with_context(|| format!("failed to read config file {}", file.display()))?;

    let mut settings: Self = settings
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.state_path = expand_tilde(&settings.state_path);
    Ok(settings)
  }

  pub fn gist(&self) -> GistConfig {
    GistConfig {
      api_url:    self.api_url.clone(),
      user_agent: self.user_agent.clone(),
      timeout:    Duration::from_secs(self.timeout_secs),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
