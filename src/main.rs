use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fastspeedtest::cli::Cli;
use fastspeedtest::engine::units;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "fastspeedtest=debug"
    } else {
        "fastspeedtest=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if cli.list_units {
        for name in units::NAMES {
            println!("{name}");
        }
        return Ok(());
    }

    let config = cli.to_config();
    let speed = fastspeedtest::measure(&config)
        .await
        .context("measurement failed")?;
    println!("{speed:.2} {}", cli.unit);

    Ok(())
}
