use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod config;
mod workflow;

/// Fuse an LCI database snapshot with bilateral trade data into a
/// regionalized supply-chain graph.
#[derive(Parser)]
#[command(name = "regiolink", version, about)]
struct Cli {
    /// Path to the run configuration file.
    #[arg(short, long, default_value = "regiolink.yaml")]
    config: PathBuf,

    /// Override the cutoff from the configuration file.
    #[arg(long)]
    cutoff: Option<f64>,

    /// Override the impact method from the configuration file.
    #[arg(long)]
    method: Option<String>,
}

fn main() -> Result<()> {
    println!("--- Regiolink ---");

    let cli = Cli::parse();
    let mut config = config::RunConfig::load(&cli.config)?;
    if let Some(cutoff) = cli.cutoff {
        config.cutoff = cutoff;
    }
    if let Some(method) = cli.method {
        config.method = method;
    }

    workflow::run(&config)
}
