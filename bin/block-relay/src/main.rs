mod cmd;

use clap::{Parser, Subcommand};
use std::future::Future;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[clap(author, version, about = "auctions proposer block space across relays", long_about = None)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Run(cmd::run::Command),
    Config(cmd::config::Command),
}

fn setup_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Drives `task` until it completes or Ctrl-C arrives, in which case the task is told to shut
/// down and given the chance to drain.
fn run_task_until_signal<F, T>(task: F) -> eyre::Result<()>
where
    F: FnOnce(CancellationToken) -> T,
    T: Future<Output = eyre::Result<()>>,
{
    setup_logging();

    // impl #[tokio::main]
    tokio::runtime::Builder::new_multi_thread().enable_all().build()?.block_on(async move {
        let shutdown = CancellationToken::new();
        let task = task(shutdown.clone());
        tokio::pin!(task);

        tokio::select! {
            result = &mut task => result,
            _ = signal::ctrl_c() => {
                tracing::info!("shutting down...");
                shutdown.cancel();
                task.await
            }
        }
    })
}

fn main() -> eyre::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(cmd) => run_task_until_signal(|shutdown| cmd.execute(shutdown)),
        Commands::Config(cmd) => run_task_until_signal(|_| cmd.execute()),
    }
}
