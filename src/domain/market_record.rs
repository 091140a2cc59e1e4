use {
    crate::utils::rfc3339_to_epoch_ms,
    serde::{Deserialize, Serialize},
};

/// Return-on-investment block CoinGecko attaches to coins that launched via an ICO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    pub times: f64,
    pub currency: String,
    pub percentage: f64,
}

/// One element of the `/coins/markets` response, and one row of the `market` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,

    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub market_cap_rank: Option<i64>,
    #[serde(default)]
    pub fully_diluted_valuation: Option<f64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
    #[serde(default)]
    pub high_24h: Option<f64>,
    #[serde(default)]
    pub low_24h: Option<f64>,
    #[serde(default)]
    pub price_change_24h: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,

    #[serde(default)]
    pub circulating_supply: Option<f64>,
    #[serde(default)]
    pub total_supply: Option<f64>,
    #[serde(default)]
    pub max_supply: Option<f64>,

    #[serde(default)]
    pub ath: Option<f64>,
    #[serde(default)]
    pub ath_change_percentage: Option<f64>,
    #[serde(default)]
    pub ath_date: Option<String>,
    #[serde(default)]
    pub atl: Option<f64>,
    #[serde(default)]
    pub atl_change_percentage: Option<f64>,
    #[serde(default)]
    pub atl_date: Option<String>,

    #[serde(default)]
    pub roi: Option<Roi>,
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl MarketRecord {
    /// Minimal record, mostly for tests and fixtures.
    pub fn new(id: &str, symbol: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            image: None,
            current_price: None,
            market_cap: None,
            market_cap_rank: None,
            fully_diluted_valuation: None,
            total_volume: None,
            high_24h: None,
            low_24h: None,
            price_change_24h: None,
            price_change_percentage_24h: None,
            circulating_supply: None,
            total_supply: None,
            max_supply: None,
            ath: None,
            ath_change_percentage: None,
            ath_date: None,
            atl: None,
            atl_change_percentage: None,
            atl_date: None,
            roi: None,
            last_updated: None,
        }
    }

    pub fn last_updated_ms(&self) -> Option<i64> {
        self.last_updated.as_deref().and_then(rfc3339_to_epoch_ms)
    }

    /// `(timestamp_ms, price)` when both are present and the price is usable.
    pub fn price_point(&self) -> Option<PricePoint> {
        let timestamp_ms = self.last_updated_ms()?;
        let price = self.current_price.filter(|p| p.is_finite() && *p > 0.0)?;
        Some(PricePoint {
            timestamp_ms,
            price,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp_ms: i64,
    pub price: f64,
}
