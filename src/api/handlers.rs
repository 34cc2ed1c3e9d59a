use axum::{
    async_trait,
    extract::{FromRequestParts, Path, Query, State},
    http::request::Parts,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use std::convert::Infallible;
use std::sync::Arc;

use crate::context::AppContext;
use crate::models::{
    normalize_symbol, Alert, AlertUpdate, MarketIndex, PortfolioItem, PortfolioUpdate, Quote,
    WatchlistItem, DEFAULT_USER_ID,
};

use super::errors::ApiError;
use super::responses::*;

/// Shared application state
pub type AppState = Arc<AppContext>;

/// Caller identity taken from the `user-id` header, "anonymous" when absent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("user-id")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_USER_ID);

        Ok(UserId(user_id.to_string()))
    }
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health_check(State(ctx): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        connections: ctx.registry.connection_count(),
        subscribed_symbols: ctx.registry.symbol_count(),
        tracked_symbols: ctx.quotes.len(),
        refresh: ctx.refresh.status(),
        dispatcher: ctx.broadcaster.stats(),
        timestamp: Utc::now(),
    })
}

/// List every tracked stock
#[utoipa::path(
    get,
    path = "/api/stocks",
    tag = "Stocks",
    responses(
        (status = 200, description = "Tracked quotes", body = Vec<Quote>)
    )
)]
pub async fn list_stocks(State(ctx): State<AppState>) -> Json<Vec<Quote>> {
    Json(ctx.quotes.list_all())
}

/// Look up a symbol upstream and start tracking it
#[utoipa::path(
    get,
    path = "/api/stocks/search",
    tag = "Stocks",
    params(SearchQuery),
    responses(
        (status = 200, description = "Latest quote", body = Quote),
        (status = 400, description = "Missing query", body = ErrorResponse)
    )
)]
pub async fn search_stock(
    State(ctx): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Quote>, ApiError> {
    let symbol = query
        .q
        .map(|q| normalize_symbol(&q))
        .filter(|q| !q.is_empty())
        .ok_or(ApiError::MissingParameter("q"))?;

    Ok(Json(ctx.lookup_quote(&symbol).await))
}

/// Get a quote, fetching it if the symbol is not tracked yet
#[utoipa::path(
    get,
    path = "/api/stocks/{symbol}",
    tag = "Stocks",
    params(("symbol" = String, Path, description = "Ticker symbol")),
    responses(
        (status = 200, description = "Latest quote", body = Quote)
    )
)]
pub async fn get_stock(
    State(ctx): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Quote>, ApiError> {
    let symbol = normalize_symbol(&symbol);
    if symbol.is_empty() {
        return Err(ApiError::MissingParameter("symbol"));
    }

    Ok(Json(ctx.get_or_lookup_quote(&symbol).await))
}

/// Get all market indices
#[utoipa::path(
    get,
    path = "/api/market/indices",
    tag = "Market",
    responses(
        (status = 200, description = "Market indices", body = Vec<MarketIndex>)
    )
)]
pub async fn get_market_indices(State(ctx): State<AppState>) -> Json<Vec<MarketIndex>> {
    Json(ctx.quotes.list_indices())
}

/// Get the caller's watchlist with latest quotes
#[utoipa::path(
    get,
    path = "/api/watchlist",
    tag = "Watchlist",
    responses(
        (status = 200, description = "Watchlist", body = Vec<WatchlistEntryResponse>)
    )
)]
pub async fn get_watchlist(
    State(ctx): State<AppState>,
    UserId(user_id): UserId,
) -> Json<Vec<WatchlistEntryResponse>> {
    let entries = ctx
        .user_data
        .get_watchlist(&user_id)
        .into_iter()
        .map(|item| WatchlistEntryResponse {
            stock: ctx.quotes.get(&item.symbol),
            item,
        })
        .collect();

    Json(entries)
}

/// Add a symbol to the caller's watchlist
#[utoipa::path(
    post,
    path = "/api/watchlist",
    tag = "Watchlist",
    request_body = AddWatchlistRequest,
    responses(
        (status = 200, description = "Watchlist item", body = WatchlistItem),
        (status = 400, description = "Missing symbol", body = ErrorResponse)
    )
)]
pub async fn add_to_watchlist(
    State(ctx): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<AddWatchlistRequest>,
) -> Result<Json<WatchlistItem>, ApiError> {
    let symbol = required_symbol(&request.symbol)?;

    // Watched symbols must be tracked so the refresh loop keeps them fresh
    ctx.get_or_lookup_quote(&symbol).await;
    let item = ctx.user_data.add_to_watchlist(&user_id, &symbol);

    tracing::info!("{} added {} to watchlist", user_id, symbol);
    Ok(Json(item))
}

/// Remove a symbol from the caller's watchlist
#[utoipa::path(
    delete,
    path = "/api/watchlist/{symbol}",
    tag = "Watchlist",
    params(("symbol" = String, Path, description = "Ticker symbol")),
    responses(
        (status = 200, description = "Removed", body = SuccessResponse)
    )
)]
pub async fn remove_from_watchlist(
    State(ctx): State<AppState>,
    UserId(user_id): UserId,
    Path(symbol): Path<String>,
) -> Json<SuccessResponse> {
    ctx.user_data.remove_from_watchlist(&user_id, &symbol);
    Json(SuccessResponse::ok())
}

/// Get the caller's alerts
#[utoipa::path(
    get,
    path = "/api/alerts",
    tag = "Alerts",
    responses(
        (status = 200, description = "Alerts", body = Vec<Alert>)
    )
)]
pub async fn get_alerts(
    State(ctx): State<AppState>,
    UserId(user_id): UserId,
) -> Json<Vec<Alert>> {
    Json(ctx.user_data.get_alerts(&user_id))
}

/// Create an alert
#[utoipa::path(
    post,
    path = "/api/alerts",
    tag = "Alerts",
    request_body = CreateAlertRequest,
    responses(
        (status = 200, description = "Created alert", body = Alert),
        (status = 400, description = "Missing symbol", body = ErrorResponse)
    )
)]
pub async fn create_alert(
    State(ctx): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<CreateAlertRequest>,
) -> Result<Json<Alert>, ApiError> {
    let symbol = required_symbol(&request.symbol)?;
    let alert = ctx.user_data.create_alert(
        &user_id,
        &symbol,
        request.alert_type,
        request.target_value,
        request.is_active,
    );

    Ok(Json(alert))
}

/// Partially update an alert
#[utoipa::path(
    patch,
    path = "/api/alerts/{id}",
    tag = "Alerts",
    params(("id" = i64, Path, description = "Alert id")),
    request_body = AlertUpdate,
    responses(
        (status = 200, description = "Updated alert", body = Alert),
        (status = 404, description = "Alert not found", body = ErrorResponse)
    )
)]
pub async fn update_alert(
    State(ctx): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
    Json(update): Json<AlertUpdate>,
) -> Result<Json<Alert>, ApiError> {
    ctx.user_data
        .update_alert(&user_id, id, update)
        .map(Json)
        .ok_or(ApiError::AlertNotFound(id))
}

/// Delete an alert
#[utoipa::path(
    delete,
    path = "/api/alerts/{id}",
    tag = "Alerts",
    params(("id" = i64, Path, description = "Alert id")),
    responses(
        (status = 200, description = "Deleted", body = SuccessResponse)
    )
)]
pub async fn delete_alert(
    State(ctx): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
) -> Json<SuccessResponse> {
    ctx.user_data.delete_alert(&user_id, id);
    Json(SuccessResponse::ok())
}

/// Get the caller's portfolio with latest quotes
#[utoipa::path(
    get,
    path = "/api/portfolio",
    tag = "Portfolio",
    responses(
        (status = 200, description = "Portfolio", body = Vec<PortfolioEntryResponse>)
    )
)]
pub async fn get_portfolio(
    State(ctx): State<AppState>,
    UserId(user_id): UserId,
) -> Json<Vec<PortfolioEntryResponse>> {
    let entries = ctx
        .user_data
        .get_portfolio(&user_id)
        .into_iter()
        .map(|item| PortfolioEntryResponse {
            stock: ctx.quotes.get(&item.symbol),
            item,
        })
        .collect();

    Json(entries)
}

/// Add a holding
#[utoipa::path(
    post,
    path = "/api/portfolio",
    tag = "Portfolio",
    request_body = AddPortfolioRequest,
    responses(
        (status = 200, description = "Holding", body = PortfolioItem),
        (status = 400, description = "Missing symbol", body = ErrorResponse)
    )
)]
pub async fn add_to_portfolio(
    State(ctx): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<AddPortfolioRequest>,
) -> Result<Json<PortfolioItem>, ApiError> {
    let symbol = required_symbol(&request.symbol)?;

    ctx.get_or_lookup_quote(&symbol).await;
    let item = ctx
        .user_data
        .add_to_portfolio(&user_id, &symbol, request.shares, request.avg_cost);

    Ok(Json(item))
}

/// Partially update a holding
#[utoipa::path(
    patch,
    path = "/api/portfolio/{id}",
    tag = "Portfolio",
    params(("id" = i64, Path, description = "Holding id")),
    request_body = PortfolioUpdate,
    responses(
        (status = 200, description = "Updated holding", body = PortfolioItem),
        (status = 404, description = "Holding not found", body = ErrorResponse)
    )
)]
pub async fn update_portfolio_item(
    State(ctx): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
    Json(update): Json<PortfolioUpdate>,
) -> Result<Json<PortfolioItem>, ApiError> {
    ctx.user_data
        .update_portfolio_item(&user_id, id, update)
        .map(Json)
        .ok_or(ApiError::PortfolioItemNotFound(id))
}

/// Remove a holding
#[utoipa::path(
    delete,
    path = "/api/portfolio/{id}",
    tag = "Portfolio",
    params(("id" = i64, Path, description = "Holding id")),
    responses(
        (status = 200, description = "Removed", body = SuccessResponse)
    )
)]
pub async fn remove_from_portfolio(
    State(ctx): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<i64>,
) -> Json<SuccessResponse> {
    ctx.user_data.remove_from_portfolio(&user_id, id);
    Json(SuccessResponse::ok())
}

fn required_symbol(raw: &str) -> Result<String, ApiError> {
    let symbol = normalize_symbol(raw);
    if symbol.is_empty() {
        Err(ApiError::MissingParameter("symbol"))
    } else {
        Ok(symbol)
    }
}
