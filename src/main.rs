use clap::Parser;
use pmp_experiment_store::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    cli::experiment::run(cli.command).await
}
