use clap::Parser;
use projector_control::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = cli::run(cli).await {
        tracing::error!(error = %e, "command failed");
        eprintln!("projector_control: {e}");
        std::process::exit(1);
    }
}
