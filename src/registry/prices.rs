use std::collections::HashMap;

/// USD price lookup used by the simulator and the liquidation aggregator.
///
/// Ships with conservative fallback prices; callers inject live quotes by
/// overriding symbols. Oracle selection is out of scope here.
#[derive(Debug, Clone)]
pub struct PriceBook {
    prices: HashMap<String, f64>,
}

impl PriceBook {
    pub fn with_defaults() -> Self {
        let mut prices = HashMap::new();
        for (symbol, price) in [
            ("ETH", 3_000.0),
            ("WETH", 3_000.0),
            // Rebasing receipts track their underlying 1:1 for estimation.
            ("STETH", 3_000.0),
            ("EETH", 3_000.0),
            ("WSTETH", 3_000.0),
            ("WEETH", 3_000.0),
            ("USDC", 1.0),
            ("USDT", 1.0),
            ("DAI", 1.0),
            ("WBTC", 60_000.0),
        ] {
            prices.insert(symbol.to_string(), price);
        }
        PriceBook { prices }
    }

    pub fn set(&mut self, symbol: &str, price: f64) -> &mut Self {
        self.prices.insert(symbol.to_uppercase(), price);
        self
    }

    pub fn price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(&symbol.to_uppercase()).copied()
    }

    /// Price with a 1.0 fallback for unknown symbols, so USD estimates
    /// degrade instead of vanishing.
    pub fn price_or_one(&self, symbol: &str) -> f64 {
        self.price(symbol).unwrap_or(1.0)
    }

    pub fn eth_price(&self) -> f64 {
        self.price("ETH").unwrap_or(3_000.0)
    }
}

impl Default for PriceBook {
    fn default() -> Self {
        Self::with_defaults()
    }
}
