pub mod api;
pub mod models;
pub mod processor;
pub mod services;
pub mod storage;
pub mod utils;

use common::Result;
use common::config::Settings;
use services::PipelineService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Serves the pipeline front door until the process is stopped.
pub async fn run_pipeline_server(config_path: &str) -> Result<()> {
    // Load configuration
    let config = Settings::new(config_path)?;

    // Initialize pipeline service
    let service = Arc::new(PipelineService::new(&config).await?);

    // Create API router
    let api_router = api::routes(Arc::clone(&service));

    // Start the server
    let addr = SocketAddr::from(([127, 0, 0, 1], config.api_port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Pipeline API server listening");
    axum::serve(listener, api_router).await?;

    Ok(())
}
