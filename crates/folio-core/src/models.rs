//! Typed payloads for the resources the client loads, and their static fallbacks.

use serde::{Deserialize, Serialize};

/// One position in the user's portfolio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: f64,
    pub average_price: f64,
    pub current_price: f64,
}

impl Holding {
    pub fn market_value(&self) -> f64 {
        self.quantity * self.current_price
    }

    pub fn unrealized_gain(&self) -> f64 {
        (self.current_price - self.average_price) * self.quantity
    }
}

/// Portfolio overview shown on the home screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_value: f64,
    pub day_change: f64,
    pub day_change_percent: f64,
    #[serde(default)]
    pub holdings: Vec<Holding>,
}

/// A symbol from the market's trending list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingStock {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_percent: f64,
}

/// Decoded value of any resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceValue {
    Portfolio(PortfolioSummary),
    Trending(Vec<TrendingStock>),
}

impl ResourceValue {
    pub fn as_portfolio(&self) -> Option<&PortfolioSummary> {
        match self {
            ResourceValue::Portfolio(p) => Some(p),
            ResourceValue::Trending(_) => None,
        }
    }

    pub fn as_trending(&self) -> Option<&[TrendingStock]> {
        match self {
            ResourceValue::Trending(list) => Some(list),
            ResourceValue::Portfolio(_) => None,
        }
    }
}

/// Placeholder portfolio shown when the real one cannot be loaded.
pub fn fallback_portfolio() -> PortfolioSummary {
    PortfolioSummary::default()
}

/// Well-known symbols shown when the trending list cannot be loaded.
pub fn fallback_trending() -> Vec<TrendingStock> {
    [
        ("AAPL", "Apple Inc.", 189.84),
        ("MSFT", "Microsoft Corporation", 415.26),
        ("NVDA", "NVIDIA Corporation", 875.28),
        ("AMZN", "Amazon.com, Inc.", 178.15),
        ("GOOGL", "Alphabet Inc.", 152.26),
        ("TSLA", "Tesla, Inc.", 175.79),
    ]
    .into_iter()
    .map(|(symbol, name, price)| TrendingStock {
        symbol: symbol.to_string(),
        name: name.to_string(),
        price,
        change_percent: 0.0,
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn holding_value_and_gain() {
        let h = Holding {
            symbol: "AAPL".into(),
            quantity: 10.0,
            average_price: 150.0,
            current_price: 180.0,
        };
        assert!((h.market_value() - 1800.0).abs() < 1e-9);
        assert!((h.unrealized_gain() - 300.0).abs() < 1e-9);
    }

    #[test]
    fn portfolio_holdings_default_to_empty() {
        let json = r#"{"total_value": 10.5, "day_change": -1.0, "day_change_percent": -0.5}"#;
        let p: PortfolioSummary = serde_json::from_str(json).unwrap();
        assert!(p.holdings.is_empty());
        assert!((p.total_value - 10.5).abs() < 1e-9);
    }

    #[test]
    fn fallback_trending_is_stable() {
        let list = fallback_trending();
        assert_eq!(list.len(), 6);
        assert_eq!(list[0].symbol, "AAPL");
        assert_eq!(list, fallback_trending());
    }
}
