use std::sync::Arc;

use trihand::{config::ServerConfig, http::build_router, AppState};
use trihand_store::FallbackStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trihand=info,tower_http=info".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    let store = Arc::new(FallbackStore::from_url(config.redis_url.as_deref()));
    if store.has_remote() {
        tracing::info!("state store: redis with in-process fallback");
    } else {
        tracing::info!("state store: in-process only");
    }

    let port = config.port;
    let state = Arc::new(AppState::new(config, store));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(port, "trihand server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
