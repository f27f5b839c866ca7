//! xmldex CLI entry point

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use xmldex::cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_env("XMLDEX_LOG"))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Index(args) => {
            let dir = args.dir.display().to_string();
            xmldex::cli::index::run(args).with_context(|| format!("Indexing {} failed", dir))
        }
        Commands::Release(args) => {
            let id = args.logicalid.clone();
            xmldex::cli::release::run(args)
                .with_context(|| format!("Release lookup for {} failed", id))
        }
    }
}
