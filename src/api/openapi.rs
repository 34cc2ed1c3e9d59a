use utoipa::OpenApi;

use crate::api::handlers;
use crate::api::responses::*;
use crate::market_data::{RefreshReport, RefreshState, RefreshStatus};
use crate::models::{
    Alert, AlertType, AlertUpdate, MarketIndex, PortfolioItem, PortfolioUpdate, Quote,
    WatchlistItem,
};
use crate::websocket::{DispatcherStats, StockUpdateData};

/// OpenAPI specification
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Quote Stream API",
        version = "1.0.0",
        description = "Real-time stock quotes over REST and WebSocket"
    ),
    paths(
        handlers::health_check,
        handlers::list_stocks,
        handlers::search_stock,
        handlers::get_stock,
        handlers::get_market_indices,
        handlers::get_watchlist,
        handlers::add_to_watchlist,
        handlers::remove_from_watchlist,
        handlers::get_alerts,
        handlers::create_alert,
        handlers::update_alert,
        handlers::delete_alert,
        handlers::get_portfolio,
        handlers::add_to_portfolio,
        handlers::update_portfolio_item,
        handlers::remove_from_portfolio,
    ),
    components(
        schemas(
            Quote,
            MarketIndex,
            StockUpdateData,
            WatchlistItem,
            Alert,
            AlertType,
            AlertUpdate,
            PortfolioItem,
            PortfolioUpdate,
            AddWatchlistRequest,
            CreateAlertRequest,
            AddPortfolioRequest,
            WatchlistEntryResponse,
            PortfolioEntryResponse,
            SuccessResponse,
            HealthResponse,
            RefreshState,
            RefreshReport,
            RefreshStatus,
            DispatcherStats,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Stocks", description = "Quote lookup"),
        (name = "Market", description = "Market indices"),
        (name = "Watchlist", description = "Per-user watchlist"),
        (name = "Alerts", description = "Per-user price alerts"),
        (name = "Portfolio", description = "Per-user holdings"),
    )
)]
pub struct ApiDoc;
