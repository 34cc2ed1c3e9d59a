use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::models::{normalize_symbol, MarketIndex, Quote, StockData};

/// Process-wide map of symbol -> latest quote
///
/// Single source of truth for REST handlers and the refresh loop. Stocks and
/// indices live behind separate locks; every method is one atomic
/// read or read-modify-write and never holds a lock across an await.
pub struct QuoteStore {
    stocks: RwLock<HashMap<String, Quote>>,
    indices: RwLock<HashMap<String, MarketIndex>>,
    next_id: AtomicI64,
}

impl QuoteStore {
    pub fn new() -> Self {
        Self {
            stocks: RwLock::new(HashMap::new()),
            indices: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn get(&self, symbol: &str) -> Option<Quote> {
        self.stocks.read().get(&normalize_symbol(symbol)).cloned()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.stocks.read().contains_key(&normalize_symbol(symbol))
    }

    /// Insert or replace a quote, keeping the original id of an existing entry
    pub fn upsert(&self, data: &StockData) -> Quote {
        let symbol = normalize_symbol(&data.symbol);
        let mut stocks = self.stocks.write();

        let id = match stocks.get(&symbol) {
            Some(existing) => existing.id,
            None => self.allocate_id(),
        };

        let quote = Quote {
            id,
            symbol: symbol.clone(),
            name: data.name.clone(),
            price: data.price,
            change_amount: data.change_amount,
            change_percent: data.change_percent,
            volume: data.volume,
            market_cap: data.market_cap,
            last_updated: Utc::now(),
        };
        stocks.insert(symbol, quote.clone());

        quote
    }

    pub fn list_all(&self) -> Vec<Quote> {
        let mut quotes: Vec<Quote> = self.stocks.read().values().cloned().collect();
        quotes.sort_by_key(|q| q.id);
        quotes
    }

    /// Symbols currently tracked by the refresh loop
    pub fn tracked_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.stocks.read().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Replace the price fields of a tracked symbol
    ///
    /// Returns the quote as it was before the update, or `None` when the
    /// symbol is not tracked (callers must upsert first).
    pub fn update_price(
        &self,
        symbol: &str,
        price: f64,
        change_amount: f64,
        change_percent: f64,
    ) -> Option<Quote> {
        self.replace_fields(symbol, price, change_amount, change_percent, None)
    }

    /// Like `update_price`, but also takes the fetched volume in the same write
    pub fn update_quote(&self, symbol: &str, data: &StockData) -> Option<Quote> {
        self.replace_fields(
            symbol,
            data.price,
            data.change_amount,
            data.change_percent,
            Some(data.volume),
        )
    }

    fn replace_fields(
        &self,
        symbol: &str,
        price: f64,
        change_amount: f64,
        change_percent: f64,
        volume: Option<i64>,
    ) -> Option<Quote> {
        let mut stocks = self.stocks.write();
        let quote = stocks.get_mut(&normalize_symbol(symbol))?;
        let previous = quote.clone();

        quote.price = price;
        quote.change_amount = change_amount;
        quote.change_percent = change_percent;
        if let Some(volume) = volume {
            quote.volume = volume;
        }
        quote.last_updated = Utc::now();

        Some(previous)
    }

    pub fn remove(&self, symbol: &str) -> Option<Quote> {
        self.stocks.write().remove(&normalize_symbol(symbol))
    }

    pub fn len(&self) -> usize {
        self.stocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stocks.read().is_empty()
    }

    pub fn list_indices(&self) -> Vec<MarketIndex> {
        let mut indices: Vec<MarketIndex> = self.indices.read().values().cloned().collect();
        indices.sort_by_key(|i| i.id);
        indices
    }

    /// Insert or replace a market index; `name` is the catalogue display name
    pub fn upsert_index(&self, name: &str, data: &StockData) -> MarketIndex {
        let symbol = normalize_symbol(&data.symbol);
        let mut indices = self.indices.write();

        let id = match indices.get(&symbol) {
            Some(existing) => existing.id,
            None => self.allocate_id(),
        };

        let index = MarketIndex {
            id,
            symbol: symbol.clone(),
            name: name.to_string(),
            value: data.price,
            change_amount: data.change_amount,
            change_percent: data.change_percent,
            last_updated: Utc::now(),
        };
        indices.insert(symbol, index.clone());

        index
    }
}

impl Default for QuoteStore {
    fn default() -> Self {
        Self::new()
    }
}
