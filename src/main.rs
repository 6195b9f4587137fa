use federated_search::cluster::Cluster;
use federated_search::config::{GatewayConfig, USAGE};
use federated_search::gateway::handlers::router;
use federated_search::gateway::service::Gateway;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = match GatewayConfig::from_env_and_args() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {:#}", e);
            eprintln!("{}", USAGE);
            std::process::exit(1);
        }
    };

    tracing::info!("Federating {} nodes: {:?}", config.nodes.len(), config.nodes);
    tracing::info!(
        "Node request timeout {:?}, connect timeout {:?}, pool {} per node",
        config.transport.request_timeout,
        config.transport.connect_timeout,
        config.transport.pool_max_idle_per_host
    );

    let cluster = Cluster::new(&config.nodes, &config.transport)?;
    let gateway = Arc::new(Gateway::new(cluster));
    let app = router(gateway);

    tracing::info!("HTTP server listening on {}", config.bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
