use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    animesync::logging::init().context("init logging")?;

    let cli = animesync::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        animesync::cli::Command::Fetch(args) => {
            animesync::fetch::run(args).await.context("fetch")?;
        }
        animesync::cli::Command::Sync(args) => {
            animesync::sync::run(args).await.context("sync")?;
        }
    }

    Ok(())
}
