use quote_stream_api::{create_router, AlphaVantageProvider, AppConfig, AppContext};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quote_stream_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();
    tracing::debug!("Configuration: {:?}", config);

    let provider = Arc::new(AlphaVantageProvider::new(
        config.alpha_vantage_api_key.clone(),
        config.alpha_vantage_base_url.clone(),
        config.fetch_timeout(),
    )?);

    let ctx = Arc::new(AppContext::new(config, provider));

    // First tick runs immediately so indices are populated at startup
    let refresh = ctx.start_refresh_loop();
    tracing::info!(
        "🔄 Refresh loop started (every {}s)",
        ctx.config.refresh_interval_secs
    );

    let addr = ctx.config.bind_addr.clone();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let app = create_router(ctx.clone());

    tracing::info!("🚀 Quote Stream API server running on http://{}", addr);
    tracing::info!("📊 Health check: http://{}/api/health", addr);
    tracing::info!("📚 Swagger UI: http://{}/swagger-ui", addr);
    tracing::info!("🔌 WebSocket: ws://{}/ws", addr);
    tracing::info!(r#"   {{"type":"subscribe","symbol":"AAPL"}}"#);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down refresh loop");
    refresh.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
