use anyhow::{Context, Result};
use clap::Parser;
use coin_pacer::config::PERSISTENCE;
use coin_pacer::data::{MarketDataStorage, SqliteStorage};
use coin_pacer::engine::{BacktestReport, StrategyKind, run_backtest};
use coin_pacer::log_builder;
use tabled::{Table, Tabled, settings::Style};

#[derive(Parser, Debug)]
#[command(about = "Backtest a placeholder strategy over stored market rows")]
struct BacktestCli {
    #[arg(long, default_value = PERSISTENCE.store.db_path)]
    db_path: String,

    /// Only this coin id (e.g. `bitcoin`)
    #[arg(long)]
    coin: Option<String>,

    #[arg(long, value_enum, default_value_t = StrategyKind::AlwaysLong)]
    strategy: StrategyKind,

    #[arg(long, default_value_t = 10_000.0)]
    capital: f64,
}

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "Coin")]
    coin: String,
    #[tabled(rename = "Strategy")]
    strategy: String,
    #[tabled(rename = "Periods")]
    periods: usize,
    #[tabled(rename = "End Value")]
    end_value: String,
    #[tabled(rename = "Return")]
    total_return: String,
    #[tabled(rename = "Max DD")]
    max_drawdown: String,
    #[tabled(rename = "Mean / Std (per period)")]
    period_stats: String,
}

impl From<&BacktestReport> for ReportRow {
    fn from(r: &BacktestReport) -> Self {
        Self {
            coin: r.coin_id.clone(),
            strategy: r.strategy.clone(),
            periods: r.periods,
            end_value: format!("{:.2}", r.end_portfolio_value),
            total_return: format!("{:+.2}%", r.total_return * 100.0),
            max_drawdown: format!("{:.2}%", r.max_drawdown * 100.0),
            period_stats: format!(
                "{:+.4}% / {:.4}%",
                r.mean_period_return * 100.0,
                r.period_return_std_dev * 100.0
            ),
        }
    }
}

fn init_log() {
    log_builder(log::LevelFilter::Info)
        .filter(Some("backtest"), log::LevelFilter::Info)
        .parse_default_env() // RUST_LOG wins
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_log();

    let args = BacktestCli::parse();

    log::info!("📈 Backtesting '{}' from {}", args.strategy, args.db_path);

    let storage = SqliteStorage::new(&args.db_path)
        .await
        .context("Failed to connect to SQLite DB. Run the poller first to populate data!")?;
    storage.initialize().await?;

    let records = storage.load_records(args.coin.as_deref()).await?;
    if records.is_empty() {
        log::warn!("⚠ No market rows found. Nothing to backtest.");
        return Ok(());
    }
    log::info!("Loaded {} market rows", records.len());

    let generator = args.strategy.generator();
    let reports = run_backtest(records, generator.as_ref(), args.capital);

    let rows: Vec<ReportRow> = reports.iter().map(ReportRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);

    Ok(())
}
