mod app;
mod cache;
mod commands;
mod config;
mod event;
mod library;
mod logging;
mod query;
mod router;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bookshelf")]
#[command(about = "A terminal front end for a library management service")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/bookshelf/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the library service
  #[arg(long)]
  base_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(base_url) = args.base_url {
    config.api.base_url = base_url;
  }
  // Fail before the terminal is taken over
  config.api.base_url()?;

  let _guard = logging::init(&config.log)?;

  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
