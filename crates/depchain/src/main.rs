//! depchain CLI binary.

use anyhow::Result;
use depchain::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the depchain CLI.
///
/// Uses tokio's current_thread runtime; commands are sequential and I/O bound.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Controlled via RUST_LOG, e.g. RUST_LOG=depchain=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("depchain=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("Starting depchain CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("depchain CLI completed successfully");
    Ok(())
}
