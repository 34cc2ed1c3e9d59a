use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Normalize a user-supplied ticker: trimmed and upper-cased
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Quote payload as reported by a provider (or synthesized locally)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockData {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_amount: f64,
    pub change_percent: f64,
    pub volume: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
}

/// Latest known snapshot of a tracked stock
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Store-assigned creation marker, stable across upserts
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_amount: f64,
    pub change_percent: f64,
    pub volume: i64,
    pub market_cap: Option<f64>,
    pub last_updated: DateTime<Utc>,
}

impl Quote {
    /// True when the price fields differ from the given values
    pub fn price_differs(&self, price: f64, change_amount: f64, change_percent: f64) -> bool {
        self.price != price
            || self.change_amount != change_amount
            || self.change_percent != change_percent
    }
}

/// Market index snapshot (fixed symbol set, see `market_data::indices`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarketIndex {
    pub id: i64,
    pub symbol: String,
    pub name: String,
    pub value: f64,
    pub change_amount: f64,
    pub change_percent: f64,
    pub last_updated: DateTime<Utc>,
}

/// A change notification for one symbol, fanned out to its subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteUpdate {
    pub symbol: String,
    pub price: f64,
    pub change_amount: f64,
    pub change_percent: f64,
    pub volume: i64,
}

impl From<&StockData> for QuoteUpdate {
    fn from(data: &StockData) -> Self {
        Self {
            symbol: data.symbol.clone(),
            price: data.price,
            change_amount: data.change_amount,
            change_percent: data.change_percent,
            volume: data.volume,
        }
    }
}

impl From<&Quote> for QuoteUpdate {
    fn from(quote: &Quote) -> Self {
        Self {
            symbol: quote.symbol.clone(),
            price: quote.price,
            change_amount: quote.change_amount,
            change_percent: quote.change_percent,
            volume: quote.volume,
        }
    }
}
