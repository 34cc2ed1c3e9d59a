use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::market_data::RefreshStatus;
use crate::models::{AlertType, PortfolioItem, Quote, WatchlistItem};
use crate::websocket::DispatcherStats;

/// Query for `/api/stocks/search`
#[derive(Debug, Deserialize, IntoParams)]
pub struct SearchQuery {
    /// Ticker to look up (case-insensitive)
    pub q: Option<String>,
}

/// Request to add a symbol to the caller's watchlist
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddWatchlistRequest {
    #[schema(example = "AAPL")]
    pub symbol: String,
}

/// Request to create a price/volume alert
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    #[schema(example = "AAPL")]
    pub symbol: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    #[schema(value_type = String, example = "155.00")]
    pub target_value: Decimal,
    /// Defaults to true
    pub is_active: Option<bool>,
}

/// Request to add a holding
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddPortfolioRequest {
    #[schema(example = "AAPL")]
    pub symbol: String,
    #[schema(value_type = String, example = "10")]
    pub shares: Decimal,
    #[schema(value_type = String, example = "142.30")]
    pub avg_cost: Decimal,
}

/// Watchlist entry joined with its latest quote
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntryResponse {
    #[serde(flatten)]
    pub item: WatchlistItem,
    pub stock: Option<Quote>,
}

/// Holding joined with its latest quote
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioEntryResponse {
    #[serde(flatten)]
    pub item: PortfolioItem,
    pub stock: Option<Quote>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Service health
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub connections: usize,
    pub subscribed_symbols: usize,
    pub tracked_symbols: usize,
    pub refresh: RefreshStatus,
    pub dispatcher: DispatcherStats,
    pub timestamp: DateTime<Utc>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
