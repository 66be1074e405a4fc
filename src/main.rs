use clap::Parser;

use timer_trigger_scheduler::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    if let Err(e) = cli::dispatch(&cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
