// Core modules
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod utils;

// Re-export commonly used types outside of crate (for the backtest binary)
pub use data::{PacingGovernor, QuotaState, SqliteStorage, compute_delay};
pub use domain::MarketRecord;
pub use engine::{PollSummary, Poller};

use {
    crate::{
        config::{
            COINGECKO, COINGECKO_API_KEY_ENV, CoinGeckoApiConfig, PERSISTENCE, PacingRegime, QUOTA,
            QuotaConfig,
        },
        data::{CoinGeckoProvider, MarketDataStorage, api_key_from_str, load_api_key},
        engine::{DecrementPolicy, PollerConfig},
    },
    anyhow::{Context, Result},
    secrecy::SecretString,
    std::{future::Future, sync::Arc},
};

// CLI argument parsing
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Poll CoinGecko market data within the monthly call quota", long_about = None)]
pub struct Cli {
    /// File holding the CoinGecko demo API key
    #[arg(long, default_value = PERSISTENCE.credentials.api_key_path)]
    pub api_key_file: String,

    /// API key given directly; takes precedence over --api-key-file
    #[arg(long, env = COINGECKO_API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Persistent tracker for remaining monthly calls
    #[arg(long, default_value = PERSISTENCE.quota.calls_tracker_path)]
    pub calls_tracker_file: String,

    /// Calls remaining this month. Overrides (and rewrites) the tracker file
    #[arg(long, allow_negative_numbers = true)]
    pub remaining_calls: Option<i64>,

    /// Monthly call cap used when no tracker file exists yet
    #[arg(long, default_value_t = QUOTA.max_calls_per_month)]
    pub monthly_cap: i64,

    /// Pacing floor regime
    #[arg(long, value_enum, default_value_t = PacingRegime::LongRun)]
    pub regime: PacingRegime,

    /// Explicit pacing floor in seconds; overrides --regime
    #[arg(long)]
    pub floor_seconds: Option<f64>,

    /// Stop after this many calls
    #[arg(long)]
    pub max_calls: Option<u64>,

    /// Write the tracker file after this many counted calls (0 = only on exit)
    #[arg(long, default_value_t = PERSISTENCE.quota.persist_every)]
    pub persist_every: u64,

    /// Which calls count against the quota
    #[arg(long, value_enum, default_value_t = DecrementPolicy::OnSuccess)]
    pub decrement_policy: DecrementPolicy,

    /// SQLite database for market rows and the call log
    #[arg(long, default_value = PERSISTENCE.store.db_path)]
    pub db_path: String,

    #[arg(long, default_value = COINGECKO.rest.base_url)]
    pub base_url: String,

    #[arg(long, default_value = COINGECKO.markets.vs_currency)]
    pub vs_currency: String,

    #[arg(long, default_value_t = COINGECKO.markets.per_page)]
    pub per_page: u32,

    #[arg(long, default_value_t = COINGECKO.markets.page)]
    pub page: u32,
}

impl Cli {
    pub fn quota_config(&self) -> QuotaConfig {
        let mut config = QuotaConfig::for_regime(self.regime);
        config.monthly_cap = self.monthly_cap;
        if let Some(floor) = self.floor_seconds {
            config.floor_seconds = floor;
        }
        config
    }

    pub fn api_config(&self) -> CoinGeckoApiConfig {
        CoinGeckoApiConfig {
            base_url: self.base_url.clone(),
            vs_currency: self.vs_currency.clone(),
            per_page: self.per_page,
            page: self.page,
            ..CoinGeckoApiConfig::default()
        }
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            max_calls: self.max_calls,
            persist_every: self.persist_every,
            decrement_policy: self.decrement_policy,
        }
    }

    pub fn api_key(&self) -> Result<SecretString> {
        match &self.api_key {
            Some(key) => api_key_from_str(key),
            None => load_api_key(&self.api_key_file),
        }
    }
}

/// Main poller entry point. Runs until `shutdown` resolves or `--max-calls` is reached.
pub async fn run_poller<F>(args: Cli, shutdown: F) -> Result<PollSummary>
where
    F: Future<Output = ()>,
{
    let api_key = args.api_key()?;
    let quota_config = args.quota_config();

    // A corrupt tracker file stops the process here.
    let quota = QuotaState::initialize(
        args.remaining_calls,
        &args.calls_tracker_file,
        quota_config.monthly_cap,
    )
    .context("Could not initialise the remaining-calls tracker")?;

    let governor = PacingGovernor::new(quota_config);

    let provider = CoinGeckoProvider::new(args.api_config(), api_key)?;

    let storage = SqliteStorage::new(&args.db_path).await?;
    storage.initialize().await?;

    let poller = Poller::new(
        Arc::new(provider),
        Arc::new(storage),
        quota,
        governor,
        args.poller_config(),
    );

    poller.run_until(shutdown).await
}

/// Logger shared by every binary: third-party crates at Warn, this crate at `crate_level`.
/// Callers add their own targets and `parse_default_env` before `init`.
pub fn log_builder(crate_level: log::LevelFilter) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .filter(None, log::LevelFilter::Warn)
        .filter(Some("coin_pacer"), crate_level);
    builder
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log, Metadata};
    use secrecy::ExposeSecret;

    fn enabled(logger: &env_logger::Logger, target: &str, level: Level) -> bool {
        logger.enabled(&Metadata::builder().target(target).level(level).build())
    }

    #[test]
    fn test_log_builder_quiets_dependencies() {
        let logger = log_builder(log::LevelFilter::Info).build();
        assert!(enabled(&logger, "coin_pacer::engine::poller", Level::Info));
        assert!(!enabled(&logger, "coin_pacer::engine::poller", Level::Debug));
        assert!(!enabled(&logger, "sqlx::query", Level::Info));
        assert!(enabled(&logger, "sqlx::query", Level::Warn));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["coin-pacer"]).unwrap();
        assert_eq!(cli.calls_tracker_file, "remaining_calls.txt");
        assert_eq!(cli.remaining_calls, None);
        assert_eq!(cli.quota_config(), QuotaConfig::default());
        assert_eq!(cli.poller_config().decrement_policy, DecrementPolicy::OnSuccess);
        assert_eq!(cli.api_config().per_page, 100);
    }

    #[test]
    fn test_regime_and_floor_override() {
        let cli = Cli::try_parse_from(["coin-pacer", "--regime", "short-run"]).unwrap();
        assert_eq!(cli.quota_config().floor_seconds, 2.0);

        let cli = Cli::try_parse_from([
            "coin-pacer",
            "--regime",
            "short-run",
            "--floor-seconds",
            "30",
        ])
        .unwrap();
        assert_eq!(cli.quota_config().floor_seconds, 30.0);
    }

    #[test]
    fn test_override_and_policy() {
        let cli = Cli::try_parse_from([
            "coin-pacer",
            "--remaining-calls",
            "-3",
            "--decrement-policy",
            "on-every-attempt",
            "--max-calls",
            "5",
        ])
        .unwrap();
        assert_eq!(cli.remaining_calls, Some(-3));
        let config = cli.poller_config();
        assert_eq!(config.decrement_policy, DecrementPolicy::OnEveryAttempt);
        assert_eq!(config.max_calls, Some(5));
    }

    #[test]
    fn test_inline_api_key_wins() {
        let cli = Cli::try_parse_from([
            "coin-pacer",
            "--api-key",
            "CG-inline ",
            "--api-key-file",
            "/no/such/file",
        ])
        .unwrap();
        assert_eq!(cli.api_key().unwrap().expose_secret(), "CG-inline");
    }
}
