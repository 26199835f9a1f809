//! Isoforge CLI - unattended Debian installer images
//!
//! Entry point for the isoforge command-line application.

use anyhow::Result;
use clap::Parser;

use isoforge::cli::output::{display_error, OutputConfig};
use isoforge::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output_config = OutputConfig::new(cli.quiet, cli.json, cli.verbose);

    // RUST_LOG directives take precedence over -v
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(output_config.log_level().into())
                .from_env_lossy(),
        )
        .init();

    output_config.apply_global();

    match cli.run().await {
        Ok(()) => Ok(()),
        Err(e) => {
            display_error(&e);
            std::process::exit(1);
        }
    }
}
