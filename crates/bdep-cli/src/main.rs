//! bdep - build-dependency closures CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use bdep_cli::cmd::{self, Context};
use bdep_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `--json` output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let universe = cli.universe.as_deref();
    let config = cli.config.as_deref();

    match &cli.command {
        Commands::BuildDeps(args) => {
            let ctx = Context::load(universe, config).await?;
            cmd::build::build_deps(&ctx, args, cli.json).await
        }
        Commands::FullDeps(args) => {
            let ctx = Context::load(universe, config).await?;
            cmd::full::full_deps(&ctx, args, cli.json).await
        }
        Commands::Completions { shell } => {
            cmd::completions::write(*shell, &mut std::io::stdout().lock())
        }
    }
}
