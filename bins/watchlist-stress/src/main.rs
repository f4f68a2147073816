mod cmd;

use clap::{Parser, Subcommand};
use cmd::config::{Effective, EngineArgs};
use cmd::stress::StressArgs;

#[derive(Parser)]
#[command(name = "watchlist-stress", about = "Concurrency harness for versioned watchlist updates")]
struct Cli {
    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Many concurrent updates on one record; checks no update is lost.
    Stress(StressArgs),
    /// Rapid sequential updates; every one must apply.
    Sequential {
        #[arg(long, default_value_t = 20)]
        updates: usize,
    },
    /// Two writers race from the same version, loser re-reads and retries.
    Scenario,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let eff = match Effective::new(&cli.engine) {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = match &cli.command {
        Command::Stress(args) => cmd::stress::run(&eff, args).await,
        Command::Sequential { updates } => cmd::sequential::run(&eff, *updates).await,
        Command::Scenario => cmd::scenario::run(&eff).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
