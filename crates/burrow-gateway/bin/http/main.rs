mod cli;

use crate::cli::CLI;
use burrow_gateway::{App, AppState};
use burrow_generator::RandomGenerator;
use burrow_shortener::{shutdown_signal, ShortenerService};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CLI::try_parse()?;
    burrow_telemetry::init(config.log_format.into())?;

    let repository = config.backend()?.open().await?;
    let service = Arc::new(ShortenerService::new(
        repository,
        RandomGenerator::new(),
        config.base_url.clone(),
    ));
    let app = App::router(AppState::new(service.clone(), config.trusted_subnet));

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(
        listen_addr = %listener.local_addr()?,
        base_url = %config.base_url,
        storage_backend = %config.storage,
        "starting gateway server"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            service.shutdown();
        })
        .await?;

    info!("gateway server stopped");
    Ok(())
}
