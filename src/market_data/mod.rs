/// Market data acquisition
///
/// Provider seam and the Alpha Vantage client, the fallback-aware quote
/// source, the fixed index catalogue, and the periodic refresh loop that
/// feeds the quote store and the WebSocket broadcaster.

pub mod alpha_vantage;
pub mod indices;
pub mod provider;
pub mod refresh;
pub mod source;
pub mod synthetic;

pub use alpha_vantage::AlphaVantageProvider;
pub use indices::{IndexSpec, MARKET_INDICES};
pub use provider::{ProviderError, QuoteProvider};
pub use refresh::{RefreshHandle, RefreshLoop, RefreshReport, RefreshState, RefreshStatus};
pub use source::{FetchOutcome, QuoteSource};
pub use synthetic::SyntheticQuoteGenerator;
