//! Alpha Vantage quote provider.
//!
//! Uses the `GLOBAL_QUOTE` endpoint. The free tier throttles aggressively and
//! reports throttling in several ways (an HTML page, a "Note" or an
//! "Information" field), all of which are classified here.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::provider::{ProviderError, QuoteProvider};
use crate::models::StockData;

const PROVIDER_ID: &str = "ALPHA_VANTAGE";

pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

/// Body of the "Global Quote" object
#[derive(Debug, Deserialize)]
struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: Option<String>,
    #[serde(rename = "05. price")]
    price: Option<String>,
    #[serde(rename = "06. volume")]
    volume: Option<String>,
    #[serde(rename = "09. change")]
    change: Option<String>,
    #[serde(rename = "10. change percent")]
    change_percent: Option<String>,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    async fn fetch(&self, symbol: &str) -> Result<StockData, ProviderError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        // Throttling pages come back with a non-2xx status as often as not,
        // so classify the body before the status.
        let parsed = parse_global_quote(symbol, &body);
        if parsed.is_ok() && !status.is_success() {
            return Err(ProviderError::Http(format!("HTTP {}", status)));
        }
        parsed
    }
}

/// Classify and parse a `GLOBAL_QUOTE` response body
pub fn parse_global_quote(symbol: &str, body: &str) -> Result<StockData, ProviderError> {
    let trimmed = body.trim_start();
    if trimmed.starts_with("<!DOCTYPE") || trimmed.starts_with("<html") {
        return Err(ProviderError::RateLimited(
            "provider returned an HTML page".to_string(),
        ));
    }

    let value: serde_json::Value = serde_json::from_str(trimmed)
        .map_err(|e| ProviderError::MalformedPayload(e.to_string()))?;

    if let Some(message) = value.get("Error Message").and_then(|v| v.as_str()) {
        return Err(ProviderError::Upstream(message.to_string()));
    }
    for marker in ["Note", "Information"] {
        if let Some(message) = value.get(marker).and_then(|v| v.as_str()) {
            return Err(ProviderError::RateLimited(message.to_string()));
        }
    }

    let quote = match value.get("Global Quote") {
        Some(q) if q.as_object().is_some_and(|o| !o.is_empty()) => q.clone(),
        _ => return Err(ProviderError::MissingQuote(symbol.to_string())),
    };

    let quote: GlobalQuote = serde_json::from_value(quote)
        .map_err(|e| ProviderError::MalformedPayload(e.to_string()))?;

    let reported_symbol = quote
        .symbol
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_else(|| symbol.to_string());

    let price = parse_number("05. price", quote.price.as_deref())?;
    let change_amount = parse_number("09. change", quote.change.as_deref())?;
    let change_percent = match quote.change_percent.as_deref() {
        Some(raw) => parse_number("10. change percent", Some(raw.trim().trim_end_matches('%')))?,
        None => 0.0,
    };
    let volume = parse_volume(quote.volume.as_deref())?;

    Ok(StockData {
        // GLOBAL_QUOTE carries no company name
        name: reported_symbol.clone(),
        symbol: reported_symbol,
        price,
        change_amount,
        change_percent,
        volume,
        market_cap: None,
    })
}

fn parse_number(field: &str, raw: Option<&str>) -> Result<f64, ProviderError> {
    let raw = raw.ok_or_else(|| ProviderError::MalformedPayload(format!("missing {}", field)))?;
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ProviderError::MalformedPayload(format!("bad {}: {:?}", field, raw)))
}

fn parse_volume(raw: Option<&str>) -> Result<i64, ProviderError> {
    let raw = raw.ok_or_else(|| ProviderError::MalformedPayload("missing 06. volume".to_string()))?;
    let raw = raw.trim();
    raw.parse::<i64>()
        .or_else(|_| raw.parse::<f64>().map(|v| v as i64))
        .map_err(|_| ProviderError::MalformedPayload(format!("bad 06. volume: {:?}", raw)))
}
