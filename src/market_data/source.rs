use std::sync::Arc;
use std::time::Duration;

use super::indices::IndexSpec;
use super::provider::{ProviderError, QuoteProvider};
use super::synthetic::SyntheticQuoteGenerator;
use crate::models::{normalize_symbol, StockData};

/// Result of a quote fetch: real upstream data, or a synthetic stand-in
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Upstream(StockData),
    Fallback {
        data: StockData,
        reason: ProviderError,
    },
}

impl FetchOutcome {
    pub fn data(&self) -> &StockData {
        match self {
            FetchOutcome::Upstream(data) => data,
            FetchOutcome::Fallback { data, .. } => data,
        }
    }

    pub fn into_data(self) -> StockData {
        match self {
            FetchOutcome::Upstream(data) => data,
            FetchOutcome::Fallback { data, .. } => data,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, FetchOutcome::Fallback { .. })
    }
}

/// Quote source adapter
///
/// Wraps a provider with a per-call timeout and substitutes synthetic data
/// for every failure, so callers always get a quote back and the dashboard
/// never goes blank because of provider health.
pub struct QuoteSource {
    provider: Arc<dyn QuoteProvider>,
    synthetic: SyntheticQuoteGenerator,
    timeout: Duration,
}

impl QuoteSource {
    pub fn new(provider: Arc<dyn QuoteProvider>, timeout: Duration) -> Self {
        Self::with_generator(provider, timeout, SyntheticQuoteGenerator::new())
    }

    pub fn with_generator(
        provider: Arc<dyn QuoteProvider>,
        timeout: Duration,
        synthetic: SyntheticQuoteGenerator,
    ) -> Self {
        Self {
            provider,
            synthetic,
            timeout,
        }
    }

    /// Fetch a stock quote; never fails
    pub async fn fetch(&self, symbol: &str) -> FetchOutcome {
        let symbol = normalize_symbol(symbol);

        match self.fetch_upstream(&symbol).await {
            Ok(data) => FetchOutcome::Upstream(data),
            Err(reason) => {
                tracing::warn!(
                    "{} quote for {} unavailable ({}), using synthetic data",
                    self.provider.id(),
                    symbol,
                    reason
                );
                FetchOutcome::Fallback {
                    data: self.synthetic.stock(&symbol),
                    reason,
                }
            }
        }
    }

    /// Fetch a market index; the fallback drifts around the index base level
    /// and the display name always comes from the catalogue
    pub async fn fetch_index(&self, index: &IndexSpec) -> FetchOutcome {
        match self.fetch_upstream(index.symbol).await {
            Ok(mut data) => {
                data.name = index.name.to_string();
                FetchOutcome::Upstream(data)
            }
            Err(reason) => {
                tracing::warn!(
                    "{} index {} unavailable ({}), using synthetic data",
                    self.provider.id(),
                    index.symbol,
                    reason
                );
                FetchOutcome::Fallback {
                    data: self
                        .synthetic
                        .index(index.symbol, index.name, index.base_price),
                    reason,
                }
            }
        }
    }

    async fn fetch_upstream(&self, symbol: &str) -> Result<StockData, ProviderError> {
        let mut data = tokio::time::timeout(self.timeout, self.provider.fetch(symbol))
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout.as_millis() as u64))??;

        // Keep the store keyed by what was asked for, whatever casing came back
        data.symbol = normalize_symbol(&data.symbol);
        if data.symbol != symbol {
            tracing::debug!("Provider answered {} for {}", data.symbol, symbol);
            data.symbol = symbol.to_string();
        }
        Ok(data)
    }
}
