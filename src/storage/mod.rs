//! In-memory stores shared across handlers and the refresh loop.

pub mod quote_store;
pub mod user_store;

pub use quote_store::QuoteStore;
pub use user_store::UserDataStore;
