//! MCP server binary entry point.

use anyhow::{Context, Result};
use mcpr::{LogDestination, LoggingConfig, McpServer, ServerConfig, builtin};
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_FILTER: &str = "mcpr=info,warn";

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::builder()
        .from_env()?
        .build()
        .context("Invalid server configuration")?;

    init_tracing(&config.logging)?;

    info!(
        "Starting {} v{} over {}",
        config.name,
        config.version,
        config.transport.as_str()
    );

    let server = McpServer::builder().config(config).build()?;
    builtin::register(&server);

    server.run().await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_env("MCPR_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // stdout carries protocol frames only.
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .with_file(false)
        .with_line_number(false);

    match &logging.destination {
        LogDestination::Off => {}
        LogDestination::Stderr if logging.json => builder.json().with_writer(std::io::stderr).init(),
        LogDestination::Stderr => builder.with_writer(std::io::stderr).init(),
        LogDestination::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            let writer = Mutex::new(file);
            if logging.json {
                builder.json().with_writer(writer).init();
            } else {
                builder.with_writer(writer).init();
            }
        }
    }
    Ok(())
}
