//! Trellis demo server
//!
//! ```text
//! web-demo --config demos/web-demo/application.properties
//! curl 'http://localhost:8080/web/query?name=Alice'
//! curl 'http://localhost:8080/web/add?a=3&b=4'
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use trellis::logging::{LogConfig, LogFormat};
use trellis::trellis_config::ContextConfig;
use trellis::{InventorySource, bootstrap};

mod service;
mod web;

/// Serve the demo controller through the Trellis container
#[derive(Parser, Debug)]
#[command(name = "web-demo")]
#[command(version)]
#[command(about = "Trellis demo: a query controller wired to a service")]
struct Cli {
    /// Configuration file (.properties, .json or .toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the configured port
    #[arg(short, long)]
    port: Option<u16>,

    /// Human-readable log output instead of JSON
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut log_config = LogConfig::from_env();
    if cli.pretty {
        log_config = log_config.format(LogFormat::Pretty).with_colors(true);
    }
    let _guard = match log_config.init() {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = match ContextConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let port = cli.port.unwrap_or(config.port);

    let application = match bootstrap(&config, &InventorySource::new()) {
        Ok(application) => application,
        Err(e) => {
            error!(error = %e, "Container initialization failed");
            return ExitCode::FAILURE;
        }
    };

    info!(port, context_path = %config.context_path, "Starting web demo");
    if let Err(e) = application.listen(port).await {
        error!(error = %e, "Server stopped");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
