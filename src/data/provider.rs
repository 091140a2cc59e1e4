use {
    crate::{
        config::{COINGECKO, CoinGeckoApiConfig},
        domain::MarketRecord,
    },
    anyhow::{Context, Result},
    async_trait::async_trait,
    secrecy::{ExposeSecret, SecretString},
    std::time::Duration,
    thiserror::Error,
};

#[cfg(debug_assertions)]
use crate::config::DF;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The API answered with a non-2xx status.
    #[error("market data request failed with HTTP status {status}")]
    Status { status: u16 },

    #[error("market data request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not decode market data payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status } => Some(*status),
            FetchError::Transport(e) => e.status().map(|s| s.as_u16()),
            FetchError::Decode(_) => None,
        }
    }
}

/// Abstract interface for fetching market data.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// One page of market records. Exactly one outbound request per call.
    async fn fetch_markets(&self) -> Result<Vec<MarketRecord>, FetchError>;
}

pub struct CoinGeckoProvider {
    client: reqwest::Client,
    config: CoinGeckoApiConfig,
    api_key: SecretString,
}

impl CoinGeckoProvider {
    pub fn new(config: CoinGeckoApiConfig, api_key: SecretString) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn markets_url(&self) -> String {
        format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            COINGECKO.rest.markets_path
        )
    }
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    async fn fetch_markets(&self) -> Result<Vec<MarketRecord>, FetchError> {
        let url = self.markets_url();

        #[cfg(debug_assertions)]
        if DF.log_provider {
            log::debug!(
                "GET {} (vs_currency={}, per_page={}, page={})",
                url,
                self.config.vs_currency,
                self.config.per_page,
                self.config.page
            );
        }

        let response = self
            .client
            .get(&url)
            .header(COINGECKO.rest.api_key_header, self.api_key.expose_secret())
            .query(&[
                ("vs_currency", self.config.vs_currency.clone()),
                ("order", COINGECKO.markets.order.to_string()),
                ("per_page", self.config.per_page.to_string()),
                ("page", self.config.page.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let records: Vec<MarketRecord> = serde_json::from_slice(&body)?;

        #[cfg(debug_assertions)]
        if DF.log_provider {
            log::debug!("{} returned {} records ({} bytes)", url, records.len(), body.len());
        }

        Ok(records)
    }
}
