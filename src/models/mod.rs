pub mod quote;
pub mod user_data;

pub use quote::{normalize_symbol, MarketIndex, Quote, QuoteUpdate, StockData};
pub use user_data::{
    Alert, AlertType, AlertUpdate, PortfolioItem, PortfolioUpdate, WatchlistItem, DEFAULT_USER_ID,
};
