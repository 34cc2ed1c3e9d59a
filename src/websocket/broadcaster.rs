use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use utoipa::ToSchema;

use super::messages::WsMessage;
use super::registry::{OutboundFrame, SubscriptionRegistry};
use crate::models::QuoteUpdate;

/// Outcome of one publish call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Lifetime dispatcher counters
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct DispatcherStats {
    pub published: u64,
    pub delivered: u64,
    pub failed: u64,
}

/// Fans quote updates out to the connections subscribed to each symbol
///
/// Sends never block: each connection has a bounded queue drained by its own
/// writer task, and a full or closed queue only affects that connection.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<SubscriptionRegistry>,
    published: Arc<AtomicU64>,
    delivered: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
}

impl Broadcaster {
    pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self {
            registry,
            published: Arc::new(AtomicU64::new(0)),
            delivered: Arc::new(AtomicU64::new(0)),
            failed: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Deliver a `stock_update` to every current subscriber of the symbol
    pub fn publish(&self, update: &QuoteUpdate) -> DeliveryReport {
        self.published.fetch_add(1, Ordering::Relaxed);

        let subscribers = self.registry.subscribers(&update.symbol);
        if subscribers.is_empty() {
            return DeliveryReport::default();
        }

        let frame: OutboundFrame = match serde_json::to_string(&WsMessage::from(update)) {
            Ok(json) => json.into(),
            Err(e) => {
                tracing::error!("Failed to serialize update for {}: {}", update.symbol, e);
                return DeliveryReport::default();
            }
        };

        let mut report = DeliveryReport::default();
        for (connection, sender) in subscribers {
            match sender.try_send(Arc::clone(&frame)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        "Outbound queue full for connection {}, dropping {} update",
                        connection,
                        update.symbol
                    );
                    report.failed += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    // Connection is going away; its handler drops the registration
                    tracing::debug!(
                        "Connection {} closed, skipping {} update",
                        connection,
                        update.symbol
                    );
                    report.failed += 1;
                }
            }
        }

        self.delivered
            .fetch_add(report.delivered as u64, Ordering::Relaxed);
        self.failed.fetch_add(report.failed as u64, Ordering::Relaxed);

        tracing::debug!(
            "Published {} to {} subscriber(s) ({} failed)",
            update.symbol,
            report.delivered,
            report.failed
        );
        report
    }

    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            published: self.published.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::registry::outbound_channel;

    fn update(symbol: &str, price: f64) -> QuoteUpdate {
        QuoteUpdate {
            symbol: symbol.to_string(),
            price,
            change_amount: 0.5,
            change_percent: 0.25,
            volume: 10,
        }
    }

    fn decode(frame: OutboundFrame) -> serde_json::Value {
        serde_json::from_str(&frame).unwrap()
    }

    #[tokio::test]
    async fn test_publish_reaches_only_subscribers() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let (tx_a, mut rx_a) = outbound_channel(8);
        let (tx_b, mut rx_b) = outbound_channel(8);
        let a = registry.register(tx_a);
        let _b = registry.register(tx_b);
        registry.subscribe(a, "AAPL");

        let report = broadcaster.publish(&update("AAPL", 151.25));
        assert_eq!(report, DeliveryReport { delivered: 1, failed: 0 });

        let message = decode(rx_a.try_recv().unwrap());
        assert_eq!(message["type"], "stock_update");
        assert_eq!(message["data"]["price"], 151.25);
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribed_connection_gets_nothing() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let (tx, mut rx) = outbound_channel(8);
        let id = registry.register(tx);
        registry.subscribe(id, "TSLA");
        registry.unsubscribe(id, "TSLA");

        assert_eq!(broadcaster.publish(&update("TSLA", 200.0)).delivered, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dead_connection_does_not_block_others() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let (tx_dead, rx_dead) = outbound_channel(8);
        let (tx_full, _rx_full) = outbound_channel(1);
        let (tx_live, mut rx_live) = outbound_channel(8);
        for tx in [tx_dead, tx_full, tx_live] {
            let id = registry.register(tx);
            registry.subscribe(id, "MSFT");
        }
        drop(rx_dead);

        broadcaster.publish(&update("MSFT", 1.0));
        let report = broadcaster.publish(&update("MSFT", 2.0));

        // dead fails both times, full fails the second time
        assert_eq!(report, DeliveryReport { delivered: 1, failed: 2 });
        assert_eq!(decode(rx_live.try_recv().unwrap())["data"]["price"], 1.0);
        assert_eq!(decode(rx_live.try_recv().unwrap())["data"]["price"], 2.0);

        let stats = broadcaster.stats();
        assert_eq!(stats.published, 2);
        assert_eq!(stats.delivered, 3);
        assert_eq!(stats.failed, 3);
    }

    #[tokio::test]
    async fn test_dropped_connection_never_referenced() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let (tx, mut rx) = outbound_channel(8);
        let id = registry.register(tx);
        registry.subscribe(id, "AAPL");
        registry.drop_connection(id);

        assert_eq!(broadcaster.publish(&update("AAPL", 3.0)), DeliveryReport::default());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_per_symbol_order_preserved() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let broadcaster = Broadcaster::new(Arc::clone(&registry));

        let (tx, mut rx) = outbound_channel(64);
        let id = registry.register(tx);
        registry.subscribe(id, "NVDA");

        for i in 0..20 {
            broadcaster.publish(&update("NVDA", i as f64));
        }
        for i in 0..20 {
            assert_eq!(decode(rx.try_recv().unwrap())["data"]["price"], i as f64);
        }
    }
}
