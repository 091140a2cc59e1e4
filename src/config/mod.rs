//! Configuration module for the market data poller.

// Can all be private now because we have a public re-export.
mod coingecko;
mod debug;
mod persistence;
mod quota;

// Re-export commonly used items
pub use coingecko::{COINGECKO, COINGECKO_API_KEY_ENV, CoinGeckoApiConfig};
pub use debug::DF;
pub use persistence::PERSISTENCE;
pub use quota::{PacingRegime, QUOTA, QuotaConfig};
