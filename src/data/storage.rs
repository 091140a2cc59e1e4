use {
    crate::{
        config::PERSISTENCE,
        domain::{MarketRecord, Roi},
    },
    anyhow::{Context, Result},
    async_trait::async_trait,
    sqlx::{
        ConnectOptions, Pool, QueryBuilder, Row, Sqlite,
        sqlite::{
            SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
            SqliteSynchronous,
        },
    },
    std::{str::FromStr, time::Duration},
};

#[cfg(debug_assertions)]
use crate::config::DF;

/// Column list of the `market` table. Order matches the CoinGecko payload and must stay stable.
const MARKET_COLUMNS: &str = "id, symbol, name, image, \
    current_price, market_cap, market_cap_rank, fully_diluted_valuation, \
    total_volume, high_24h, low_24h, price_change_24h, price_change_percentage_24h, \
    circulating_supply, total_supply, max_supply, \
    ath, ath_change_percentage, ath_date, atl, atl_change_percentage, atl_date, \
    roi, last_updated";

/// One outbound API call, successful or not.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub session_id: String,
    pub called_at_ms: i64,
    pub success: bool,
    pub status: Option<u16>,
    pub records: u64,
    /// Quota counter after this call was accounted for.
    pub remaining_calls: i64,
    pub error: Option<String>,
}

#[async_trait]
pub trait MarketDataStorage: Send + Sync {
    async fn initialize(&self) -> Result<()>;
    async fn insert_records(&self, records: &[MarketRecord]) -> Result<u64>;
    /// Rows in `last_updated` order, optionally for a single coin id.
    async fn load_records(&self, coin_id: Option<&str>) -> Result<Vec<MarketRecord>>;
    async fn record_call(&self, call: &CallRecord) -> Result<()>;
    async fn call_count(&self) -> Result<i64>;
}

pub struct SqliteStorage {
    pool: Pool<Sqlite>,
}

impl SqliteStorage {
    pub async fn new(db_path: &str) -> Result<Self> {
        let connection_options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(60))
            .synchronous(SqliteSynchronous::Normal)
            .log_slow_statements(log::LevelFilter::Warn, Duration::from_secs(10));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connection_options)
            .await
            .with_context(|| format!("Failed to open market database {}", db_path))?;

        Ok(Self { pool })
    }

    /// Private in-memory database. One connection, since each connection would get its own database.
    pub async fn in_memory() -> Result<Self> {
        let connection_options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connection_options)
            .await?;

        Ok(Self { pool })
    }
}

fn record_from_row(row: &SqliteRow) -> Result<MarketRecord> {
    let roi_json: Option<String> = row.try_get("roi")?;
    let roi: Option<Roi> = roi_json
        .map(|json| serde_json::from_str(&json))
        .transpose()
        .context("Corrupt roi column")?;

    Ok(MarketRecord {
        id: row.try_get("id")?,
        symbol: row.try_get("symbol")?,
        name: row.try_get("name")?,
        image: row.try_get("image")?,
        current_price: row.try_get("current_price")?,
        market_cap: row.try_get("market_cap")?,
        market_cap_rank: row.try_get("market_cap_rank")?,
        fully_diluted_valuation: row.try_get("fully_diluted_valuation")?,
        total_volume: row.try_get("total_volume")?,
        high_24h: row.try_get("high_24h")?,
        low_24h: row.try_get("low_24h")?,
        price_change_24h: row.try_get("price_change_24h")?,
        price_change_percentage_24h: row.try_get("price_change_percentage_24h")?,
        circulating_supply: row.try_get("circulating_supply")?,
        total_supply: row.try_get("total_supply")?,
        max_supply: row.try_get("max_supply")?,
        ath: row.try_get("ath")?,
        ath_change_percentage: row.try_get("ath_change_percentage")?,
        ath_date: row.try_get("ath_date")?,
        atl: row.try_get("atl")?,
        atl_change_percentage: row.try_get("atl_change_percentage")?,
        atl_date: row.try_get("atl_date")?,
        roi,
        last_updated: row.try_get("last_updated")?,
    })
}

#[async_trait]
impl MarketDataStorage for SqliteStorage {
    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS market (
                id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                name TEXT NOT NULL,
                image TEXT,
                current_price REAL,
                market_cap REAL,
                market_cap_rank INTEGER,
                fully_diluted_valuation REAL,
                total_volume REAL,
                high_24h REAL,
                low_24h REAL,
                price_change_24h REAL,
                price_change_percentage_24h REAL,
                circulating_supply REAL,
                total_supply REAL,
                max_supply REAL,
                ath REAL,
                ath_change_percentage REAL,
                ath_date TEXT,
                atl REAL,
                atl_change_percentage REAL,
                atl_date TEXT,
                roi TEXT,
                last_updated TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create market table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS api_calls (
                call_id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                called_at INTEGER NOT NULL,
                success INTEGER NOT NULL,
                status INTEGER,
                records INTEGER NOT NULL,
                remaining_calls INTEGER NOT NULL,
                error TEXT
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create api_calls table")?;

        Ok(())
    }

    /// One transaction per batch; rows are chunked to stay within SQLite's parameter limit.
    async fn insert_records(&self, records: &[MarketRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let roi_json = records
            .iter()
            .map(|r| r.roi.as_ref().map(serde_json::to_string).transpose())
            .collect::<Result<Vec<_>, _>>()?;
        let rows: Vec<(&MarketRecord, Option<String>)> = records.iter().zip(roi_json).collect();

        let mut tx = self.pool.begin().await?;

        for chunk in rows.chunks(PERSISTENCE.store.insert_chunk_rows) {
            let mut query_builder =
                QueryBuilder::new(format!("INSERT INTO market ({}) ", MARKET_COLUMNS));

            query_builder.push_values(chunk, |mut b, (r, roi)| {
                b.push_bind(r.id.as_str())
                    .push_bind(r.symbol.as_str())
                    .push_bind(r.name.as_str())
                    .push_bind(r.image.as_deref())
                    .push_bind(r.current_price)
                    .push_bind(r.market_cap)
                    .push_bind(r.market_cap_rank)
                    .push_bind(r.fully_diluted_valuation)
                    .push_bind(r.total_volume)
                    .push_bind(r.high_24h)
                    .push_bind(r.low_24h)
                    .push_bind(r.price_change_24h)
                    .push_bind(r.price_change_percentage_24h)
                    .push_bind(r.circulating_supply)
                    .push_bind(r.total_supply)
                    .push_bind(r.max_supply)
                    .push_bind(r.ath)
                    .push_bind(r.ath_change_percentage)
                    .push_bind(r.ath_date.as_deref())
                    .push_bind(r.atl)
                    .push_bind(r.atl_change_percentage)
                    .push_bind(r.atl_date.as_deref())
                    .push_bind(roi.clone())
                    .push_bind(r.last_updated.as_deref());
            });

            query_builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;

        #[cfg(debug_assertions)]
        if DF.log_storage {
            log::debug!("STORE: inserted {} market rows", records.len());
        }

        Ok(records.len() as u64)
    }

    async fn load_records(&self, coin_id: Option<&str>) -> Result<Vec<MarketRecord>> {
        let query_str = if coin_id.is_some() {
            format!(
                "SELECT {} FROM market WHERE id = ? ORDER BY last_updated ASC, rowid ASC",
                MARKET_COLUMNS
            )
        } else {
            format!(
                "SELECT {} FROM market ORDER BY last_updated ASC, rowid ASC",
                MARKET_COLUMNS
            )
        };

        let mut query = sqlx::query(&query_str);

        if let Some(id) = coin_id {
            query = query.bind(id);
        }

        let rows = query.fetch_all(&self.pool).await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn record_call(&self, call: &CallRecord) -> Result<()> {
        #[cfg(debug_assertions)]
        if DF.log_storage {
            log::debug!(
                "STORE: call at {} success={} status={:?} records={} remaining={}",
                call.called_at_ms,
                call.success,
                call.status,
                call.records,
                call.remaining_calls
            );
        }

        sqlx::query(
            r#"
            INSERT INTO api_calls
            (session_id, called_at, success, status, records, remaining_calls, error)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(call.session_id.as_str())
        .bind(call.called_at_ms)
        .bind(call.success)
        .bind(call.status.map(i64::from))
        .bind(call.records as i64)
        .bind(call.remaining_calls)
        .bind(call.error.as_deref())
        .execute(&self.pool)
        .await
        .context("Failed to insert call record")?;

        Ok(())
    }

    async fn call_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS calls FROM api_calls")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("calls")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn storage() -> SqliteStorage {
        let storage = SqliteStorage::in_memory().await.unwrap();
        storage.initialize().await.unwrap();
        storage
    }

    fn record(id: &str, price: f64, last_updated: &str) -> MarketRecord {
        let mut r = MarketRecord::new(id, &id[..3], id);
        r.current_price = Some(price);
        r.last_updated = Some(last_updated.to_string());
        r
    }

    #[tokio::test]
    async fn test_insert_and_load_round_trip() {
        let storage = storage().await;
        let mut eth = record("ethereum", 3500.5, "2024-04-07T16:49:31.736Z");
        eth.market_cap_rank = Some(2);
        eth.roi = Some(Roi {
            times: 64.5,
            currency: "btc".to_string(),
            percentage: 6450.0,
        });
        eth.image = Some("https://example.com/eth.png".to_string());

        let inserted = storage.insert_records(std::slice::from_ref(&eth)).await.unwrap();
        assert_eq!(inserted, 1);

        let loaded = storage.load_records(None).await.unwrap();
        assert_eq!(loaded, vec![eth]);
    }

    #[tokio::test]
    async fn test_load_filters_and_orders() {
        let storage = storage().await;
        storage
            .insert_records(&[
                record("bitcoin", 2.0, "2024-01-01T00:10:00Z"),
                record("ethereum", 9.0, "2024-01-01T00:05:00Z"),
                record("bitcoin", 1.0, "2024-01-01T00:00:00Z"),
            ])
            .await
            .unwrap();

        let btc = storage.load_records(Some("bitcoin")).await.unwrap();
        let prices: Vec<_> = btc.iter().map(|r| r.current_price.unwrap()).collect();
        assert_eq!(prices, vec![1.0, 2.0]);

        assert_eq!(storage.load_records(None).await.unwrap().len(), 3);
        assert!(storage.load_records(Some("dogecoin")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_large_batch_is_chunked() {
        let storage = storage().await;
        let records: Vec<_> = (0..2_500)
            .map(|i| record("bitcoin", i as f64 + 1.0, "2024-01-01T00:00:00Z"))
            .collect();

        assert_eq!(storage.insert_records(&records).await.unwrap(), 2_500);
        assert_eq!(storage.load_records(None).await.unwrap().len(), 2_500);
    }

    #[tokio::test]
    async fn test_empty_insert_is_noop() {
        let storage = storage().await;
        assert_eq!(storage.insert_records(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_call() {
        let storage = storage().await;
        assert_eq!(storage.call_count().await.unwrap(), 0);

        storage
            .record_call(&CallRecord {
                session_id: "s-1".to_string(),
                called_at_ms: 1_700_000_000_000,
                success: false,
                status: Some(429),
                records: 0,
                remaining_calls: 9_999,
                error: Some("rate limited".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(storage.call_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let storage = storage().await;
        storage.initialize().await.unwrap();
        storage
            .insert_records(&[record("bitcoin", 1.0, "2024-01-01T00:00:00Z")])
            .await
            .unwrap();
        storage.initialize().await.unwrap();
        assert_eq!(storage.load_records(None).await.unwrap().len(), 1);
    }
}
