#[cfg(not(unix))]
compile_error!("Only unix platforms are currently supported");

use std::path::PathBuf;

use clap::Parser;
use missive::{Missive, controller::CONFIG_ENV, find_config_file};

/// Email notification service with duplicate suppression
#[derive(Parser, Debug)]
#[command(name = "missive", version, about, long_about = None)]
struct Args {
    /// Path to the RON configuration file
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = find_config_file(args.config.as_deref())?;
    let missive = Missive::load(&config_path)?;

    missive.run().await
}
