use std::sync::Arc;

use crate::config::AppConfig;
use crate::market_data::{
    FetchOutcome, QuoteProvider, QuoteSource, RefreshHandle, RefreshLoop,
};
use crate::models::{normalize_symbol, Quote, QuoteUpdate};
use crate::storage::{QuoteStore, UserDataStore};
use crate::websocket::{Broadcaster, SubscriptionRegistry};

/// Process-scoped application context
///
/// Built once at startup and shared with every handler and the refresh
/// loop. Owns the quote store, the user data store, the subscription
/// registry and its broadcaster, and the quote source.
pub struct AppContext {
    pub config: AppConfig,
    pub quotes: Arc<QuoteStore>,
    pub user_data: Arc<UserDataStore>,
    pub registry: Arc<SubscriptionRegistry>,
    pub broadcaster: Broadcaster,
    pub source: Arc<QuoteSource>,
    pub refresh: Arc<RefreshLoop>,
}

impl AppContext {
    pub fn new(config: AppConfig, provider: Arc<dyn QuoteProvider>) -> Self {
        let source = Arc::new(QuoteSource::new(provider, config.fetch_timeout()));
        Self::with_source(config, source)
    }

    pub fn with_source(config: AppConfig, source: Arc<QuoteSource>) -> Self {
        let quotes = Arc::new(QuoteStore::new());
        let registry = Arc::new(SubscriptionRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));
        let refresh = Arc::new(RefreshLoop::new(
            Arc::clone(&quotes),
            Arc::clone(&source),
            broadcaster.clone(),
            config.refresh_interval(),
            config.refresh_concurrency,
        ));

        Self {
            config,
            quotes,
            user_data: Arc::new(UserDataStore::new()),
            registry,
            broadcaster,
            source,
            refresh,
        }
    }

    /// Start the background refresh loop
    pub fn start_refresh_loop(&self) -> RefreshHandle {
        Arc::clone(&self.refresh).spawn()
    }

    /// Fetch a symbol on demand, store it, and push it to subscribers
    ///
    /// This is the ad hoc second writer next to the refresh loop;
    /// last write wins. Subscribers only hear about it when the stored
    /// quote actually changed.
    pub async fn lookup_quote(&self, symbol: &str) -> Quote {
        let outcome = self.source.fetch(symbol).await;
        if let FetchOutcome::Fallback { reason, .. } = &outcome {
            tracing::debug!("Lookup of {} served synthetic data: {}", symbol, reason);
        }

        let data = outcome.data();
        let changed = match self.quotes.get(&data.symbol) {
            Some(previous) => {
                previous.price_differs(data.price, data.change_amount, data.change_percent)
                    || previous.volume != data.volume
            }
            None => true,
        };

        let quote = self.quotes.upsert(data);
        if changed {
            self.broadcaster.publish(&QuoteUpdate::from(&quote));
        }
        quote
    }

    /// Stored quote, or an on-demand lookup when the symbol is untracked
    pub async fn get_or_lookup_quote(&self, symbol: &str) -> Quote {
        match self.quotes.get(symbol) {
            Some(quote) => quote,
            None => self.lookup_quote(&normalize_symbol(symbol)).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market_data::provider::mock::ScriptedProvider;
    use crate::websocket::outbound_channel;

    #[tokio::test]
    async fn test_lookup_tracks_and_publishes() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.set_price("NVDA", 900.0, 10.0, 1.12);
        let ctx = AppContext::new(AppConfig::default(), provider.clone());

        let (tx, mut rx) = outbound_channel(4);
        let conn = ctx.registry.register(tx);
        ctx.registry.subscribe(conn, "NVDA");

        let quote = ctx.lookup_quote("nvda").await;
        assert_eq!(quote.symbol, "NVDA");
        assert_eq!(quote.price, 900.0);
        assert!(ctx.quotes.contains("NVDA"));

        let frame = rx.try_recv().unwrap();
        let message: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(message["data"]["price"], 900.0);
    }

    #[tokio::test]
    async fn test_unchanged_lookup_is_not_republished() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.set_price("AAPL", 150.0, 0.0, 0.0);
        let ctx = AppContext::new(AppConfig::default(), provider.clone());
        ctx.lookup_quote("AAPL").await;

        let (tx, mut rx) = outbound_channel(4);
        let conn = ctx.registry.register(tx);
        ctx.registry.subscribe(conn, "AAPL");

        ctx.lookup_quote("AAPL").await;
        ctx.lookup_quote("aapl").await;
        assert!(rx.try_recv().is_err());

        provider.set_price("AAPL", 150.5, 0.5, 0.33);
        ctx.lookup_quote("AAPL").await;
        let frame = rx.try_recv().unwrap();
        let message: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(message["data"]["price"], 150.5);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_get_or_lookup_uses_store_first() {
        let provider = Arc::new(ScriptedProvider::new());
        provider.set_price("AMD", 160.0, 0.0, 0.0);
        let ctx = AppContext::new(AppConfig::default(), provider.clone());

        ctx.get_or_lookup_quote("amd").await;
        ctx.get_or_lookup_quote("AMD").await;

        assert_eq!(provider.calls(), vec!["AMD".to_string()]);
    }
}
