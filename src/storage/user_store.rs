use chrono::Utc;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::models::{
    normalize_symbol, Alert, AlertType, AlertUpdate, PortfolioItem, PortfolioUpdate,
    WatchlistItem,
};

/// In-memory per-user watchlists, alerts and portfolios
///
/// Plain keyed CRUD. Records are partitioned by user id and every
/// by-id operation is scoped to the requesting user.
pub struct UserDataStore {
    watchlists: DashMap<String, Vec<WatchlistItem>>,
    alerts: DashMap<String, Vec<Alert>>,
    portfolios: DashMap<String, Vec<PortfolioItem>>,
    next_id: AtomicI64,
}

impl UserDataStore {
    pub fn new() -> Self {
        Self {
            watchlists: DashMap::new(),
            alerts: DashMap::new(),
            portfolios: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    // Watchlist

    pub fn get_watchlist(&self, user_id: &str) -> Vec<WatchlistItem> {
        self.watchlists
            .get(user_id)
            .map(|items| items.clone())
            .unwrap_or_default()
    }

    /// Add a symbol; adding one already on the list returns the existing item
    pub fn add_to_watchlist(&self, user_id: &str, symbol: &str) -> WatchlistItem {
        let symbol = normalize_symbol(symbol);
        let mut items = self.watchlists.entry(user_id.to_string()).or_default();

        if let Some(existing) = items.iter().find(|item| item.symbol == symbol) {
            return existing.clone();
        }

        let item = WatchlistItem {
            id: self.allocate_id(),
            user_id: user_id.to_string(),
            symbol,
            added_at: Utc::now(),
        };
        items.push(item.clone());
        item
    }

    pub fn remove_from_watchlist(&self, user_id: &str, symbol: &str) -> bool {
        let symbol = normalize_symbol(symbol);
        match self.watchlists.get_mut(user_id) {
            Some(mut items) => {
                let before = items.len();
                items.retain(|item| item.symbol != symbol);
                items.len() != before
            }
            None => false,
        }
    }

    // Alerts

    pub fn get_alerts(&self, user_id: &str) -> Vec<Alert> {
        self.alerts
            .get(user_id)
            .map(|alerts| alerts.clone())
            .unwrap_or_default()
    }

    pub fn create_alert(
        &self,
        user_id: &str,
        symbol: &str,
        alert_type: AlertType,
        target_value: Decimal,
        is_active: Option<bool>,
    ) -> Alert {
        let alert = Alert {
            id: self.allocate_id(),
            user_id: user_id.to_string(),
            symbol: normalize_symbol(symbol),
            alert_type,
            target_value,
            is_active: is_active.unwrap_or(true),
            created_at: Utc::now(),
        };

        self.alerts
            .entry(user_id.to_string())
            .or_default()
            .push(alert.clone());
        alert
    }

    pub fn update_alert(&self, user_id: &str, id: i64, update: AlertUpdate) -> Option<Alert> {
        let mut alerts = self.alerts.get_mut(user_id)?;
        let alert = alerts.iter_mut().find(|alert| alert.id == id)?;

        if let Some(alert_type) = update.alert_type {
            alert.alert_type = alert_type;
        }
        if let Some(target_value) = update.target_value {
            alert.target_value = target_value;
        }
        if let Some(is_active) = update.is_active {
            alert.is_active = is_active;
        }

        Some(alert.clone())
    }

    pub fn delete_alert(&self, user_id: &str, id: i64) -> bool {
        match self.alerts.get_mut(user_id) {
            Some(mut alerts) => {
                let before = alerts.len();
                alerts.retain(|alert| alert.id != id);
                alerts.len() != before
            }
            None => false,
        }
    }

    // Portfolio

    pub fn get_portfolio(&self, user_id: &str) -> Vec<PortfolioItem> {
        self.portfolios
            .get(user_id)
            .map(|items| items.clone())
            .unwrap_or_default()
    }

    pub fn add_to_portfolio(
        &self,
        user_id: &str,
        symbol: &str,
        shares: Decimal,
        avg_cost: Decimal,
    ) -> PortfolioItem {
        let item = PortfolioItem {
            id: self.allocate_id(),
            user_id: user_id.to_string(),
            symbol: normalize_symbol(symbol),
            shares,
            avg_cost,
            added_at: Utc::now(),
        };

        self.portfolios
            .entry(user_id.to_string())
            .or_default()
            .push(item.clone());
        item
    }

    pub fn update_portfolio_item(
        &self,
        user_id: &str,
        id: i64,
        update: PortfolioUpdate,
    ) -> Option<PortfolioItem> {
        let mut items = self.portfolios.get_mut(user_id)?;
        let item = items.iter_mut().find(|item| item.id == id)?;

        if let Some(shares) = update.shares {
            item.shares = shares;
        }
        if let Some(avg_cost) = update.avg_cost {
            item.avg_cost = avg_cost;
        }

        Some(item.clone())
    }

    pub fn remove_from_portfolio(&self, user_id: &str, id: i64) -> bool {
        match self.portfolios.get_mut(user_id) {
            Some(mut items) => {
                let before = items.len();
                items.retain(|item| item.id != id);
                items.len() != before
            }
            None => false,
        }
    }
}

impl Default for UserDataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_watchlist_per_user() {
        let store = UserDataStore::new();

        let item = store.add_to_watchlist("alice", "aapl");
        let again = store.add_to_watchlist("alice", "AAPL");
        store.add_to_watchlist("bob", "TSLA");

        assert_eq!(item.symbol, "AAPL");
        assert_eq!(item.id, again.id);
        assert_eq!(store.get_watchlist("alice").len(), 1);
        assert_eq!(store.get_watchlist("bob")[0].symbol, "TSLA");
        assert!(store.get_watchlist("carol").is_empty());

        assert!(store.remove_from_watchlist("alice", "aapl"));
        assert!(!store.remove_from_watchlist("alice", "AAPL"));
        assert!(store.get_watchlist("alice").is_empty());
    }

    #[test]
    fn test_alert_lifecycle() {
        let store = UserDataStore::new();
        let alert = store.create_alert("anonymous", "msft", AlertType::PriceAbove, dec!(420.00), None);
        assert!(alert.is_active);
        assert_eq!(alert.symbol, "MSFT");

        let updated = store
            .update_alert(
                "anonymous",
                alert.id,
                AlertUpdate {
                    is_active: Some(false),
                    target_value: Some(dec!(430.50)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.target_value, dec!(430.50));
        assert_eq!(updated.alert_type, AlertType::PriceAbove);

        // Other users cannot touch it
        assert!(store.update_alert("mallory", alert.id, AlertUpdate::default()).is_none());
        assert!(!store.delete_alert("mallory", alert.id));

        assert!(store.delete_alert("anonymous", alert.id));
        assert!(store.get_alerts("anonymous").is_empty());
    }

    #[test]
    fn test_portfolio_lifecycle() {
        let store = UserDataStore::new();
        let item = store.add_to_portfolio("anonymous", "AAPL", dec!(10), dec!(142.30));

        let updated = store
            .update_portfolio_item(
                "anonymous",
                item.id,
                PortfolioUpdate {
                    shares: Some(dec!(12.5)),
                    avg_cost: None,
                },
            )
            .unwrap();
        assert_eq!(updated.shares, dec!(12.5));
        assert_eq!(updated.avg_cost, dec!(142.30));

        assert!(store.update_portfolio_item("anonymous", 9999, PortfolioUpdate::default()).is_none());
        assert!(store.remove_from_portfolio("anonymous", item.id));
        assert!(store.get_portfolio("anonymous").is_empty());
    }
}
