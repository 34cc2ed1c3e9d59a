use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Serialized frame queued for a connection's writer task
pub type OutboundFrame = Arc<str>;
pub type OutboundSender = mpsc::Sender<OutboundFrame>;
pub type OutboundReceiver = mpsc::Receiver<OutboundFrame>;

/// Bounded per-connection outbound queue
pub fn outbound_channel(capacity: usize) -> (OutboundSender, OutboundReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Opaque connection handle; the registry never stores socket handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ConnectionEntry {
    sender: OutboundSender,
    subscriptions: HashSet<String>,
}

#[derive(Default)]
struct RegistryInner {
    /// Arena of live connections
    connections: HashMap<ConnectionId, ConnectionEntry>,
    /// symbol -> connections subscribed to it; never holds empty buckets
    reverse_index: HashMap<String, HashSet<ConnectionId>>,
}

/// Per-connection subscription sets plus the symbol -> subscribers index
///
/// Invariant: `C` is in `reverse_index[S]` iff `S` is in `C`'s subscription
/// set. Both sides are mutated under the same lock so the invariant holds at
/// every observable point. All mutations are idempotent.
pub struct SubscriptionRegistry {
    inner: Mutex<RegistryInner>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Register a new connection with an empty subscription set
    pub fn register(&self, sender: OutboundSender) -> ConnectionId {
        let id = ConnectionId::new();
        self.inner.lock().connections.insert(
            id,
            ConnectionEntry {
                sender,
                subscriptions: HashSet::new(),
            },
        );
        id
    }

    /// Returns true if the subscription was added; unknown connections are ignored
    pub fn subscribe(&self, connection: ConnectionId, symbol: &str) -> bool {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.connections.get_mut(&connection) else {
            return false;
        };
        if !entry.subscriptions.insert(symbol.to_string()) {
            return false;
        }

        inner
            .reverse_index
            .entry(symbol.to_string())
            .or_default()
            .insert(connection);
        true
    }

    /// Returns true if the subscription existed and was removed
    pub fn unsubscribe(&self, connection: ConnectionId, symbol: &str) -> bool {
        let mut inner = self.inner.lock();
        let removed = inner
            .connections
            .get_mut(&connection)
            .map(|entry| entry.subscriptions.remove(symbol))
            .unwrap_or(false);

        if removed {
            remove_from_bucket(&mut inner.reverse_index, symbol, connection);
        }
        removed
    }

    /// Forget a connection and every reverse-index entry it held
    ///
    /// Returns false if the connection was already dropped.
    pub fn drop_connection(&self, connection: ConnectionId) -> bool {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.connections.remove(&connection) else {
            return false;
        };

        for symbol in &entry.subscriptions {
            remove_from_bucket(&mut inner.reverse_index, symbol, connection);
        }
        true
    }

    /// Snapshot of the connections subscribed to `symbol`
    ///
    /// The lock is released before the caller sends anything, so
    /// concurrent subscribe/unsubscribe never races with delivery.
    pub fn subscribers(&self, symbol: &str) -> Vec<(ConnectionId, OutboundSender)> {
        let inner = self.inner.lock();
        let Some(bucket) = inner.reverse_index.get(symbol) else {
            return Vec::new();
        };

        bucket
            .iter()
            .filter_map(|id| {
                inner
                    .connections
                    .get(id)
                    .map(|entry| (*id, entry.sender.clone()))
            })
            .collect()
    }

    pub fn subscriber_count(&self, symbol: &str) -> usize {
        self.inner
            .lock()
            .reverse_index
            .get(symbol)
            .map(|bucket| bucket.len())
            .unwrap_or(0)
    }

    pub fn subscriptions(&self, connection: ConnectionId) -> Vec<String> {
        let inner = self.inner.lock();
        let mut symbols: Vec<String> = inner
            .connections
            .get(&connection)
            .map(|entry| entry.subscriptions.iter().cloned().collect())
            .unwrap_or_default();
        symbols.sort();
        symbols
    }

    pub fn is_subscribed(&self, connection: ConnectionId, symbol: &str) -> bool {
        self.inner
            .lock()
            .reverse_index
            .get(symbol)
            .is_some_and(|bucket| bucket.contains(&connection))
    }

    pub fn is_registered(&self, connection: ConnectionId) -> bool {
        self.inner.lock().connections.contains_key(&connection)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.lock().connections.len()
    }

    /// Number of symbols with at least one subscriber
    pub fn symbol_count(&self) -> usize {
        self.inner.lock().reverse_index.len()
    }

    #[cfg(test)]
    fn assert_consistent(&self) {
        let inner = self.inner.lock();
        for (id, entry) in &inner.connections {
            for symbol in &entry.subscriptions {
                assert!(
                    inner.reverse_index.get(symbol).is_some_and(|b| b.contains(id)),
                    "{} missing from index bucket {}",
                    id,
                    symbol
                );
            }
        }
        for (symbol, bucket) in &inner.reverse_index {
            assert!(!bucket.is_empty(), "empty bucket for {}", symbol);
            for id in bucket {
                assert!(
                    inner
                        .connections
                        .get(id)
                        .is_some_and(|entry| entry.subscriptions.contains(symbol)),
                    "stale index entry {} -> {}",
                    symbol,
                    id
                );
            }
        }
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn remove_from_bucket(
    index: &mut HashMap<String, HashSet<ConnectionId>>,
    symbol: &str,
    connection: ConnectionId,
) {
    if let Some(bucket) = index.get_mut(symbol) {
        bucket.remove(&connection);
        if bucket.is_empty() {
            index.remove(symbol);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect(registry: &SubscriptionRegistry) -> (ConnectionId, OutboundReceiver) {
        let (tx, rx) = outbound_channel(8);
        (registry.register(tx), rx)
    }

    #[test]
    fn test_register_starts_empty() {
        let registry = SubscriptionRegistry::new();
        let (id, _rx) = connect(&registry);

        assert!(registry.is_registered(id));
        assert!(registry.subscriptions(id).is_empty());
        assert_eq!(registry.connection_count(), 1);
        assert_eq!(registry.symbol_count(), 0);
    }

    #[test]
    fn test_subscribe_updates_reverse_index() {
        let registry = SubscriptionRegistry::new();
        let (a, _rx_a) = connect(&registry);
        let (b, _rx_b) = connect(&registry);

        assert!(registry.subscribe(a, "AAPL"));
        assert!(registry.subscribe(b, "AAPL"));
        assert!(registry.subscribe(b, "TSLA"));

        assert_eq!(registry.subscriber_count("AAPL"), 2);
        assert_eq!(registry.subscriber_count("TSLA"), 1);
        assert!(registry.is_subscribed(a, "AAPL"));
        assert!(!registry.is_subscribed(a, "TSLA"));
        assert_eq!(registry.subscriptions(b), vec!["AAPL", "TSLA"]);
        registry.assert_consistent();
    }

    #[test]
    fn test_idempotent_operations() {
        let registry = SubscriptionRegistry::new();
        let (a, _rx) = connect(&registry);

        assert!(registry.subscribe(a, "AAPL"));
        assert!(!registry.subscribe(a, "AAPL"));
        assert_eq!(registry.subscriber_count("AAPL"), 1);
        assert_eq!(registry.subscriptions(a), vec!["AAPL"]);

        assert!(registry.unsubscribe(a, "AAPL"));
        assert!(!registry.unsubscribe(a, "AAPL"));
        assert!(!registry.unsubscribe(a, "NEVER"));
        assert_eq!(registry.symbol_count(), 0);

        assert!(registry.drop_connection(a));
        assert!(!registry.drop_connection(a));
        registry.assert_consistent();
    }

    #[test]
    fn test_drop_connection_clears_every_bucket() {
        let registry = SubscriptionRegistry::new();
        let (a, _rx_a) = connect(&registry);
        let (b, _rx_b) = connect(&registry);

        for symbol in ["AAPL", "MSFT", "TSLA"] {
            registry.subscribe(a, symbol);
        }
        registry.subscribe(b, "MSFT");

        assert!(registry.drop_connection(a));

        assert!(registry.subscribers("AAPL").is_empty());
        assert!(registry.subscribers("TSLA").is_empty());
        let msft: Vec<ConnectionId> = registry.subscribers("MSFT").into_iter().map(|(id, _)| id).collect();
        assert_eq!(msft, vec![b]);
        assert_eq!(registry.symbol_count(), 1);
        registry.assert_consistent();
    }

    #[test]
    fn test_subscribe_after_drop_is_ignored() {
        let registry = SubscriptionRegistry::new();
        let (a, _rx) = connect(&registry);
        registry.drop_connection(a);

        assert!(!registry.subscribe(a, "AAPL"));
        assert_eq!(registry.subscriber_count("AAPL"), 0);
        registry.assert_consistent();
    }

    #[test]
    fn test_concurrent_churn_keeps_invariant() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let symbols = ["AAPL", "MSFT", "TSLA", "NVDA"];

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let (tx, _rx) = outbound_channel(1);
                    let id = registry.register(tx);
                    for round in 0..200 {
                        let symbol = symbols[(worker + round) % symbols.len()];
                        if round % 3 == 0 {
                            registry.unsubscribe(id, symbol);
                        } else {
                            registry.subscribe(id, symbol);
                        }
                    }
                    if worker % 2 == 0 {
                        registry.drop_connection(id);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.connection_count(), 4);
        registry.assert_consistent();
    }
}
