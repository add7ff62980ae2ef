//! TopicLens CLI: local topic modeling for document collections.
//!
//! Loads every matching document under a path, fits an LDA model, and
//! prints each topic's top terms and each document's dominant topic.

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
