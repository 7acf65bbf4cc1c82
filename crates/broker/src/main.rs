//! TMF Resource Broker
//!
//! Runs the resource service and the webhook event hub.

use clap::Parser;
use tmf_broker::Broker;
use tmf_service::{ServiceConfig, init_logging};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        version = tmf_service::VERSION,
        storage_backend = %config.storage_backend,
        base_url = %config.base_url,
        "Starting TMF resource broker"
    );

    let broker = Broker::start(&config).await?;
    info!(
        backend = broker.store.backend_name(),
        workers = broker.worker_count(),
        "Broker ready"
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    broker.shutdown();

    Ok(())
}
