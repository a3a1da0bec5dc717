mod cli;
mod error;
mod server;

use crate::cli::CLI;
use crate::server::ShortenerGrpcServer;
use burrow_core::TrustedSubnet;
use burrow_generator::{Generator, RandomGenerator};
use burrow_proto_schema::v1::shortener_service_server::ShortenerServiceServer;
use burrow_shortener::{shutdown_signal, ShortenerService};
use clap::Parser;
use std::sync::Arc;
use tonic::transport::Server;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CLI::try_parse()?;
    burrow_telemetry::init(config.log_format.into())?;

    info!(
        listen_addr = %config.listen_addr,
        base_url = %config.base_url,
        storage_backend = %config.storage,
        trusted_subnet = ?config.trusted_subnet.map(|s| s.to_string()),
        "starting shortener gRPC server"
    );

    let repository = config.backend()?.open().await?;
    let service = Arc::new(ShortenerService::new(
        repository,
        RandomGenerator::new(),
        config.base_url,
    ));

    run_server(config.listen_addr, service, config.trusted_subnet).await?;

    info!("shortener gRPC server stopped");
    Ok(())
}

async fn run_server<G: Generator>(
    listen_addr: std::net::SocketAddr,
    service: Arc<ShortenerService<G>>,
    trusted_subnet: Option<TrustedSubnet>,
) -> Result<(), tonic::transport::Error> {
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<ShortenerServiceServer<ShortenerGrpcServer<ShortenerService<G>>>>()
        .await;

    let grpc = ShortenerGrpcServer::new(Arc::clone(&service), trusted_subnet);
    let shutdown = async move {
        shutdown_signal().await;
        service.shutdown();
    };

    Server::builder()
        .add_service(health_service)
        .add_service(ShortenerServiceServer::new(grpc))
        .serve_with_shutdown(listen_addr, shutdown)
        .await
}
