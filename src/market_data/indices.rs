/// A market index tracked on every refresh tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexSpec {
    pub symbol: &'static str,
    pub name: &'static str,
    /// Reference level used when synthesizing a value
    pub base_price: f64,
}

/// Fixed index catalogue (ETF proxies, plus VIX)
pub const MARKET_INDICES: [IndexSpec; 4] = [
    IndexSpec {
        symbol: "SPY",
        name: "S&P 500",
        base_price: 450.0,
    },
    IndexSpec {
        symbol: "QQQ",
        name: "NASDAQ",
        base_price: 380.0,
    },
    IndexSpec {
        symbol: "DIA",
        name: "DOW JONES",
        base_price: 350.0,
    },
    IndexSpec {
        symbol: "VIX",
        name: "VIX",
        base_price: 15.0,
    },
];
