use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::StockData;

/// Generates plausible stand-in quotes when the provider is unavailable
///
/// Shape is fixed (price band, symmetric percent band, consistent change
/// amount); the values are pseudo-random and reproducible with a seed.
pub struct SyntheticQuoteGenerator {
    rng: Mutex<StdRng>,
}

impl SyntheticQuoteGenerator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Stock quote: price in [50, 250), percent in [-5, 5)
    pub fn stock(&self, symbol: &str) -> StockData {
        let mut rng = self.rng.lock();
        let price: f64 = rng.random_range(50.0..250.0);
        let change_percent: f64 = rng.random_range(-5.0..5.0);
        let change_amount = price * change_percent / 100.0;
        let volume = rng.random_range(1_000_000..11_000_000);

        let symbol = symbol.to_uppercase();
        StockData {
            name: symbol.clone(),
            symbol,
            price: round2(price),
            change_amount: round2(change_amount),
            change_percent: round2(change_percent),
            volume,
            market_cap: None,
        }
    }

    /// Index quote drifting within ±1% of its base level
    pub fn index(&self, symbol: &str, name: &str, base_price: f64) -> StockData {
        let mut rng = self.rng.lock();
        let change_percent: f64 = rng.random_range(-1.0..1.0);
        let price = base_price * (1.0 + change_percent / 100.0);
        let volume = rng.random_range(10_000_000..110_000_000);

        StockData {
            symbol: symbol.to_string(),
            name: name.to_string(),
            price: round2(price),
            change_amount: round2(price - base_price),
            change_percent: round2(change_percent),
            volume,
            market_cap: None,
        }
    }
}

impl Default for SyntheticQuoteGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_within_bands_and_consistent() {
        let generator = SyntheticQuoteGenerator::with_seed(7);

        for _ in 0..500 {
            let q = generator.stock("msft");
            assert_eq!(q.symbol, "MSFT");
            assert!(q.price >= 50.0 && q.price <= 250.0, "price {}", q.price);
            assert!(q.change_percent >= -5.0 && q.change_percent <= 5.0);
            assert!((1_000_000..11_000_000).contains(&q.volume));

            // Both sides are rounded to cents, so allow a couple of cents of slack
            let expected = q.price * q.change_percent / 100.0;
            assert!(
                (q.change_amount - expected).abs() < 0.05,
                "{} vs {}",
                q.change_amount,
                expected
            );
        }
    }

    #[test]
    fn test_seeded_generators_agree() {
        let a = SyntheticQuoteGenerator::with_seed(42);
        let b = SyntheticQuoteGenerator::with_seed(42);
        assert_eq!(a.stock("AAPL"), b.stock("AAPL"));
    }

    #[test]
    fn test_index_stays_near_base() {
        let generator = SyntheticQuoteGenerator::with_seed(1);
        let q = generator.index("SPY", "S&P 500", 450.0);
        assert_eq!(q.name, "S&P 500");
        assert!(q.price >= 445.0 && q.price <= 455.0);
        assert!((q.price - 450.0 - q.change_amount).abs() < 0.02);
    }
}
