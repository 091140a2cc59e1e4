pub struct CoinGeckoApiConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub vs_currency: String,
    pub per_page: u32,
    pub page: u32,
}

impl Default for CoinGeckoApiConfig {
    fn default() -> Self {
        Self {
            base_url: COINGECKO.rest.base_url.to_string(),
            timeout_ms: COINGECKO.client.timeout_ms,
            vs_currency: COINGECKO.markets.vs_currency.to_string(),
            per_page: COINGECKO.markets.per_page,
            page: COINGECKO.markets.page,
        }
    }
}

/// REST endpoint layout and the header that carries the demo key.
pub struct RestEndpoints {
    pub base_url: &'static str,
    pub markets_path: &'static str,
    pub api_key_header: &'static str,
}

/// Query defaults for `/coins/markets`.
pub struct MarketsQuery {
    pub vs_currency: &'static str,
    /// CoinGecko caps this at 250.
    pub per_page: u32,
    pub page: u32,
    pub order: &'static str,
}

pub struct ClientDefaults {
    pub timeout_ms: u64,
}

/// Environment variable consulted when no key file is given.
pub const COINGECKO_API_KEY_ENV: &str = "COINGECKO_API_KEY";

pub struct CoinGeckoConfig {
    pub rest: RestEndpoints,
    pub markets: MarketsQuery,
    pub client: ClientDefaults,
}

pub const COINGECKO: CoinGeckoConfig = CoinGeckoConfig {
    rest: RestEndpoints {
        base_url: "https://api.coingecko.com/api/v3",
        markets_path: "/coins/markets",
        api_key_header: "x-cg-demo-api-key",
    },
    markets: MarketsQuery {
        vs_currency: "usd",
        per_page: 100,
        page: 1,
        order: "market_cap_desc",
    },
    client: ClientDefaults { timeout_ms: 10_000 },
};
