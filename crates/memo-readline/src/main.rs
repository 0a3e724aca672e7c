use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use memo_application::NotesScreen;
use memo_core::notification::ChannelNotifier;
use memo_infrastructure::{ConfigService, MemoPaths};

mod backend;
mod commands;
mod helper;
mod repl;

use backend::{Backend, PromptConfirmer};
use repl::Repl;

#[derive(Parser)]
#[command(name = "memo")]
#[command(about = "Personal notes synchronized with your Supabase project", long_about = None)]
struct Cli {
    /// Keep notes in memory for this run instead of talking to Supabase
    #[arg(long)]
    offline: bool,

    /// Directory holding config.toml, session.json and logs (default: <config dir>/memo)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let paths = MemoPaths::new(cli.config);
    let config = ConfigService::new(&paths)?.get_config()?;
    let _guard = setup_tracing(&paths, &config.logging.level)?;

    let (backend, feed, store) = Backend::connect(cli.offline, &config, &paths)?;
    let (notifier, notifications) = ChannelNotifier::channel();
    let screen =
        NotesScreen::start(feed, store, Arc::new(notifier), Arc::new(PromptConfirmer)).await;

    let mut repl = Repl::new(screen, backend, notifications)?;
    let result = repl.run().await;
    repl.screen().shutdown();
    result
}

/// Logs go to a daily file so they never interleave with the prompt.
fn setup_tracing(paths: &MemoPaths, level: &str) -> Result<WorkerGuard> {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let logs_dir = paths.logs_dir()?;
    std::fs::create_dir_all(&logs_dir)?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(&logs_dir, "memo.log"));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .init();

    tracing::info!(path = ?logs_dir, "memo tracing initialized");
    Ok(guard)
}
