use clap::Parser;
use mosaic_cli::CliArgs;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    mosaic_cli::run(CliArgs::parse()).await
}
