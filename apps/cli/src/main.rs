//! pagestitch CLI — compose landing pages from their sibling reference document.
//!
//! Fetches `<root_path>index.html` next to a landing page, moves its header,
//! main and footer into the page and writes the stitched result.

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
