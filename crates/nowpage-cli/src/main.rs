//! `now` — keep a GitHub Gist-backed now page up to date from the terminal.
//!
//! # Usage
//!
//! ```text
//! now login
//! now list
//! now select 1
//! now set status "Writing a parser"
//! now push activities running reading
//! now history
//! now revert 3
//! ```
//!
//! Settings come from `~/.config/nowpage/config.toml` (or `--config`), then
//! `NOWPAGE_*` environment variables, then the flags below.

mod app;
mod prompt;
mod render;
mod settings;

use std::path::PathBuf;

use app::App;
use clap::{Parser, Subcommand};
use settings::{Overrides, Settings};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "now", version, about = "Edit a now page stored in a GitHub Gist")]
struct Cli {
  /// Path to a TOML config file.
  #[arg(short, long, value_name = "FILE", env = "NOWPAGE_CONFIG")]
  config: Option<PathBuf>,

  /// Base URL of the GitHub REST API.
  #[arg(long, value_name = "URL", env = "NOWPAGE_API_URL")]
  api_url: Option<String>,

  /// Path to the local state database.
  #[arg(long, value_name = "FILE", env = "NOWPAGE_STATE_PATH")]
  state: Option<PathBuf>,

  /// Log requests and state changes to stderr.
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Answer yes to every confirmation prompt.
  #[arg(short = 'y', long, global = true)]
  yes: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Sign in with a personal access token that has the gist scope.
  Login {
    /// Read from stdin when omitted.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,
  },
  /// Forget the saved token.
  Logout,
  /// Show the signed-in GitHub user.
  Whoami,
  /// List Gists holding a now.json.
  List,
  /// Select a Gist by its position in `list` or by id.
  Select { target: String },
  /// Create a new Gist with an empty now page and select it.
  Create,
  /// Copy a Gist (the selected one by default) and select the copy.
  #[command(name = "clone")]
  Duplicate { id: Option<String> },
  /// Delete a Gist.
  Delete { id: String },
  /// Change a Gist's description.
  Rename {
    label: String,
    /// Defaults to the selected Gist.
    #[arg(long)]
    id:    Option<String>,
  },
  /// Print the now page.
  Show,
  /// List versions, newest first.
  History,
  /// Print version `n` from `history`.
  View { n: usize },
  /// Make version `n` from `history` the latest.
  Revert { n: usize },
  /// Set a text field, or one entry of a map field with `--key`.
  Set {
    field: String,
    value: String,
    #[arg(long)]
    key:   Option<String>,
  },
  /// Append items to a list field.
  Push {
    field: String,
    #[arg(required = true)]
    items: Vec<String>,
  },
  /// Set the playlist name and link.
  Playlist { name: String, uri: Option<String> },
  /// Remove a field.
  Unset { field: String },
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose {
    LevelFilter::DEBUG
  } else {
    LevelFilter::WARN
  };
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy(),
    )
    .init();

  let settings = Settings::load(cli.config.as_deref(), Overrides {
    api_url:    cli.api_url,
    state_path: cli.state,
  })?;
  tracing::debug!(?settings, "loaded settings");

  let app = App::open(&settings, cli.yes).await?;

  match cli.command {
    Command::Login { token } => app.login(token).await,
    Command::Logout => app.logout().await,
    Command::Whoami => app.whoami().await,
    Command::List => app.list().await,
    Command::Select { target } => app.select(&target).await,
    Command::Create => app.create().await,
    Command::Duplicate { id } => app.duplicate(id).await,
    Command::Delete { id } => app.delete(&id).await,
    Command::Rename { label, id } => app.rename(id, &label).await,
    Command::Show => app.show().await,
    Command::History => app.history().await,
    Command::View { n } => app.view(n).await,
    Command::Revert { n } => app.revert(n).await,
    Command::Set { field, value, key } => app.set(&field, value, key).await,
    Command::Push { field, items } => app.push(&field, items).await,
    Command::Playlist { name, uri } => app.playlist(name, uri).await,
    Command::Unset { field } => app.unset(&field).await,
  }
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn location_flags_fall_back_to_environment() {
    let cli = Cli::command();
    let env_of = |id: &str| {
      cli
        .get_arguments()
        .find(|arg| arg.get_id() == id)
        .and_then(|arg| arg.get_env())
        .map(|env| env.to_string_lossy().into_owned())
    };
    assert_eq!(env_of("api_url").as_deref(), Some("NOWPAGE_API_URL"));
    assert_eq!(env_of("state").as_deref(), Some("NOWPAGE_STATE_PATH"));
  }

  #[test]
  fn arguments_are_consistent() { Cli::command().debug_assert(); }
}
