use axum::{
    routing::{delete, get, patch},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::websocket::websocket_handler;

use super::handlers::*;
use super::openapi::ApiDoc;

/// Create the API router with Swagger UI and WebSocket support
pub fn create_router(ctx: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // WebSocket endpoint
        .route("/ws", get(websocket_handler))
        .route("/api/health", get(health_check))
        // Quotes
        .route("/api/stocks", get(list_stocks))
        .route("/api/stocks/search", get(search_stock))
        .route("/api/stocks/:symbol", get(get_stock))
        .route("/api/market/indices", get(get_market_indices))
        // Watchlist
        .route("/api/watchlist", get(get_watchlist).post(add_to_watchlist))
        .route("/api/watchlist/:symbol", delete(remove_from_watchlist))
        // Alerts
        .route("/api/alerts", get(get_alerts).post(create_alert))
        .route("/api/alerts/:id", patch(update_alert).delete(delete_alert))
        // Portfolio
        .route("/api/portfolio", get(get_portfolio).post(add_to_portfolio))
        .route(
            "/api/portfolio/:id",
            patch(update_portfolio_item).delete(remove_from_portfolio),
        )
        .with_state(ctx)
}
