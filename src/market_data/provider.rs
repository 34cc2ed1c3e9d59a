use async_trait::async_trait;
use thiserror::Error;

use crate::models::StockData;

/// Failures reported by an upstream quote provider
///
/// None of these reach a client: the quote source turns every one of them
/// into a synthetic quote.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Transport-level failure (DNS, TLS, connection reset, bad status)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Provider signalled throttling (HTML page, "Note" or "Information" marker)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Provider returned an explicit error message
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Body was not the expected JSON shape
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// JSON parsed but carried no quote for the symbol
    #[error("No quote data for {0}")]
    MissingQuote(String),

    /// The call did not finish within the configured budget
    #[error("Timed out after {0} ms")]
    Timeout(u64),
}

/// Upstream source of single-symbol quotes
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Short identifier used in logs
    fn id(&self) -> &'static str;

    /// Fetch the latest quote for an upper-cased symbol
    async fn fetch(&self, symbol: &str) -> Result<StockData, ProviderError>;
}
