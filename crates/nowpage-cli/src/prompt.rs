//! Line-based prompts on stdin; the question goes to stderr.

use std::io::{self, BufRead, Write};

use anyhow::Context as _;

/// Read one line, without its line ending.
pub fn read_line(prompt: &str) -> anyhow::Result<String> {
  let mut err = io::stderr();
  write!(err, "{prompt}")?;
  err.flush()?;

  let mut line = String::new();
  io::stdin()
    .lock()
    .read_line(&mut line)
    .context("failed to read from stdin")?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}

/// Ask a yes/no question. Anything but `y` or `yes` is a no.
pub fn confirm(question: &str) -> anyhow::Result<bool> {
  let answer = read_line(&format!("{question} [y/N] "))?;
  Ok(matches!(
    answer.trim().to_ascii_lowercase().as_str(),
    "y" | "yes"
  ))
}
