// Domain types and value objects
mod market_record;
mod signal;

pub use market_record::{MarketRecord, PricePoint, Roi};
pub use signal::Signal;
