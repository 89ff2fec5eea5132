mod api;
mod app;
mod cache;
mod commands;
mod config;
mod error;
mod event;
mod logging;
mod queries;
mod query;
mod store;
mod suggest;
#[cfg(test)]
mod test_support;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "flashdeck")]
#[command(about = "Flashcards from the terminal, synced with your deck server")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/flashdeck/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Mirror logs to stderr
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Keep session, cards and settings in memory for this run only
  #[arg(long, global = true)]
  ephemeral: bool,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let config = config::Config::load(args.config.as_deref())?;
  let log_guard = logging::init(&config::data_dir()?.join("logs"), args.verbose)?;

  let mut app = app::App::new(&config, args.ephemeral)?;
  let outcome = app.run(args.command).await;

  // Flush buffered log lines before a possible early exit.
  drop(app);
  drop(log_guard);

  if let Err(e) = outcome {
    eprintln!("Error: {}", e);
    std::process::exit(1);
  }

  Ok(())
}
