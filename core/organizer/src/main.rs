use anyhow::Result;
use code_organizer::{router, CodeOrganizer, OrganizerConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Code Organizer Service v{}", env!("CARGO_PKG_VERSION"));

    let config = OrganizerConfig::load(None)?;
    let addr = config.addr.clone();
    let organizer = CodeOrganizer::new(config)?;
    info!("Heuristic catalog loaded");

    let app = router(Arc::new(organizer));

    // Start server
    info!("Starting HTTP server on http://{}", addr);
    info!("Classify endpoint: http://{}/classify", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
