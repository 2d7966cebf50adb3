//! docsync CLI: keep an instructions file in step with Confluence.
//!
//! Fetches the configured Confluence pages and rewrites the auto-synced
//! section of the target file, leaving hand-written content untouched.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
