//! Agent host process
//!
//! Wires configuration, the agent service and the HTTP surface together.

mod api;

use std::sync::Arc;

use tower_http::cors::CorsLayer;

use toolsched_core::agent::AgentService;
use toolsched_core::config::AgentConfig;
use toolsched_core::logging::{ConsoleLogger, Logger, SharedLogger};

use api::{router, AppState};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let logger: SharedLogger = Arc::new(ConsoleLogger::with_prefix("[AgentHost]"));

    let config = AgentConfig::load();
    config.log_warnings(logger.as_ref());

    let service = Arc::new(AgentService::from_config(&config, Arc::clone(&logger)));

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3002);

    let app = router(AppState { service }).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    logger.info(&format!("Agent API listening on 0.0.0.0:{}", port));

    axum::serve(listener, app).await
}
