use clap::Parser;
use log::{error, info};
use std::path::PathBuf;
use std::process;

use url_monitor::{RootConfig, monitor_targets, worker::build_client};

#[derive(Parser, Debug)]
#[command(name = "url-monitor", version, about = "Monitors URLs for patterns, and alerts by SMS.")]
struct Args {
    /// YAML (or .toml) configuration file defining URLs to monitor
    #[arg(short = 'c', long, default_value = "configuration.yaml")]
    configuration_file: PathBuf,
}

#[tokio::main]
async fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    let args = Args::parse();

    let config = match RootConfig::load(&args.configuration_file) {
        Ok(config) => config,
        Err(e) => {
            error!(
                "Failed to load configuration from {}: {e}",
                args.configuration_file.display()
            );
            process::exit(1);
        }
    };
    info!(
        "Loaded {} URLs from {}",
        config.urls.len(),
        args.configuration_file.display()
    );

    let client = match build_client() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build HTTP client: {e}");
            process::exit(1);
        }
    };

    monitor_targets(config, client).await;
}
