use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{normalize_symbol, QuoteUpdate};

/// Server -> client push messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsMessage {
    /// Latest quote for a subscribed symbol
    StockUpdate { data: StockUpdateData },
}

/// Payload of a `stock_update` push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockUpdateData {
    pub symbol: String,
    pub price: f64,
    pub change_amount: f64,
    pub change_percent: f64,
    pub volume: i64,
}

impl From<&QuoteUpdate> for WsMessage {
    fn from(update: &QuoteUpdate) -> Self {
        WsMessage::StockUpdate {
            data: StockUpdateData {
                symbol: update.symbol.clone(),
                price: update.price,
                change_amount: update.change_amount,
                change_percent: update.change_percent,
                volume: update.volume,
            },
        }
    }
}

/// Client -> server control messages
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { symbol: String },
    Unsubscribe { symbol: String },
}

impl ClientMessage {
    /// Parse a text frame; anything malformed, unknown or without a usable
    /// symbol yields `None` and is meant to be ignored
    pub fn parse(text: &str) -> Option<Self> {
        let message: ClientMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!("Ignoring unrecognized client message: {}", e);
                return None;
            }
        };

        match message {
            ClientMessage::Subscribe { symbol } => {
                non_empty(&symbol).map(|symbol| ClientMessage::Subscribe { symbol })
            }
            ClientMessage::Unsubscribe { symbol } => {
                non_empty(&symbol).map(|symbol| ClientMessage::Unsubscribe { symbol })
            }
        }
    }
}

fn non_empty(symbol: &str) -> Option<String> {
    let symbol = normalize_symbol(symbol);
    if symbol.is_empty() {
        None
    } else {
        Some(symbol)
    }
}
