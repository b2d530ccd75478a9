use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use nginx_request_exporter::config::{load_config, Overrides};
use nginx_request_exporter::lifecycle::startup;
use nginx_request_exporter::observability::init_logging;

#[derive(Parser)]
#[command(name = "nginx-request-exporter")]
#[command(about = "Prometheus exporter for Nginx access logs received over syslog", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(long, env = "NRE_CONFIG_FILE")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match load_config(cli.config.as_deref(), &cli.overrides) {
        Ok(settings) => settings,
        Err(e) => {
            init_logging("info");
            tracing::error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&settings.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Nginx Request Exporter");

    match startup::run(&settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Exporter failed");
            ExitCode::FAILURE
        }
    }
}
