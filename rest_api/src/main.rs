// rest_api/src/main.rs

use anyhow::Result;
use rest_api::{init_tracing, load_api_config, start_server};
use tokio::sync::oneshot;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_api_config(None)?;
    init_tracing(&config.log_level);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
        }
        shutdown_tx.send(()).ok();
    });

    start_server(config, shutdown_rx).await
}
