// Library Crate Root
// lib.rs

pub mod api;
pub mod config;
pub mod context;
pub mod market_data;
pub mod models;
pub mod storage;
pub mod websocket;

pub use api::{create_router, AppState};
pub use config::AppConfig;
pub use context::AppContext;
pub use market_data::{AlphaVantageProvider, QuoteProvider, QuoteSource, RefreshLoop};
pub use models::{MarketIndex, Quote, QuoteUpdate, StockData};
pub use storage::{QuoteStore, UserDataStore};
pub use websocket::{Broadcaster, SubscriptionRegistry};
