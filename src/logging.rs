use color_eyre::{eyre::eyre, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;

/// Default log location: $XDG_DATA_HOME/bookshelf/bookshelf.log
fn default_log_file() -> Option<PathBuf> {
  dirs::data_dir().map(|d| d.join("bookshelf").join("bookshelf.log"))
}

/// Filter directive for the configured level, scoped to this crate
fn directive(level: &str) -> String {
  format!("bookshelf={}", level.trim())
}

/// Install the global subscriber. Output goes to a file since the terminal
/// belongs to the UI.
///
/// Keep the returned guard alive until exit, or buffered lines are lost.
pub fn init(config: &LogConfig) -> Result<WorkerGuard> {
  let path = config
    .file
    .clone()
    .or_else(default_log_file)
    .ok_or_else(|| eyre!("Could not determine a log file location; set log.file"))?;

  let (dir, file_name) = split_path(&path)?;
  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::never(dir, file_name);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(&config.level)));

  tracing_subscriber::registry()
    .with(filter)
    .with(
      tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false),
    )
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  tracing::info!(file = %path.display(), "bookshelf v{} starting", env!("CARGO_PKG_VERSION"));

  Ok(guard)
}

fn split_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr)> {
  let file_name = path
    .file_name()
    .ok_or_else(|| eyre!("log.file must name a file: {}", path.display()))?;
  let dir = match path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p,
    _ => Path::new("."),
  };
  Ok((dir, file_name))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_directive_scopes_to_crate() {
    assert_eq!(directive("debug"), "bookshelf=debug");
    assert_eq!(directive(" warn\n"), "bookshelf=warn");
  }

  #[test]
  fn test_split_path() {
    let (dir, name) = split_path(Path::new("/var/log/bookshelf.log")).unwrap();
    assert_eq!(dir, Path::new("/var/log"));
    assert_eq!(name, "bookshelf.log");

    let (dir, name) = split_path(Path::new("bookshelf.log")).unwrap();
    assert_eq!(dir, Path::new("."));
    assert_eq!(name, "bookshelf.log");

    assert!(split_path(Path::new("/")).is_err());
  }
}
