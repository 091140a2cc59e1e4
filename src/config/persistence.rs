//! File persistence configuration

/// Where the remaining-call counter lives between runs.
pub struct QuotaPersistenceConfig {
    /// Plain-text file holding a single decimal integer.
    pub calls_tracker_path: &'static str,
    /// Persist the counter after this many counted calls (and always on exit).
    pub persist_every: u64,
}

/// Market data database
pub struct StorePersistenceConfig {
    pub db_path: &'static str,
    /// Rows per INSERT statement. 24 columns * 1000 rows stays under SQLite's 32k parameter limit.
    pub insert_chunk_rows: usize,
}

pub struct CredentialsConfig {
    /// `~` is expanded to the user's home directory.
    pub api_key_path: &'static str,
}

/// The Master Persistence Configuration
pub struct PersistenceConfig {
    pub quota: QuotaPersistenceConfig,
    pub store: StorePersistenceConfig,
    pub credentials: CredentialsConfig,
}

pub const PERSISTENCE: PersistenceConfig = PersistenceConfig {
    quota: QuotaPersistenceConfig {
        calls_tracker_path: "remaining_calls.txt",
        persist_every: 10,
    },
    store: StorePersistenceConfig {
        db_path: "coins.db",
        insert_chunk_rows: 1000,
    },
    credentials: CredentialsConfig {
        api_key_path: "~/keys/coingecko.key",
    },
};
