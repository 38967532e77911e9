//! Docstore CLI binary.

mod cli;
mod output;

use anyhow::Result;
use cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Controlled via RUST_LOG, e.g. RUST_LOG=docstore=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("docstore=info,docstore_cli=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting docstore CLI");

    let cli = Cli::parse_args();
    cli.execute()?;

    tracing::debug!("Docstore CLI completed successfully");
    Ok(())
}
