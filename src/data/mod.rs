mod credentials;
mod provider;
mod quota_state;
mod rate_limiter;
mod storage;

pub use {
    credentials::{api_key_from_str, expand_home, load_api_key},
    provider::{CoinGeckoProvider, FetchError, MarketDataProvider},
    quota_state::{QuotaError, QuotaOrigin, QuotaState},
    rate_limiter::{PacingGovernor, compute_delay, delay_for_window},
    storage::{CallRecord, MarketDataStorage, SqliteStorage},
};
