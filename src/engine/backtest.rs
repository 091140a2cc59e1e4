//! Simple signal-following backtester.
//!
//! Entry points: [`simple_backtest`] for one price series, [`run_backtest`] for every coin in a
//! batch of stored rows.
//!
//! # Approach
//! Prices are walked oldest to newest. Over each step `[t_i, t_i+1)` the portfolio holds the
//! exposure of the most recent [`Signal`] stamped at or before `t_i` (flat before the first
//! signal). The portfolio value compounds `1 + exposure * period_return` and never drops below
//! zero. No fees, no slippage, no position sizing beyond the exposure fraction.

use {
    crate::{
        domain::{MarketRecord, PricePoint, Signal},
        engine::SignalGenerator,
    },
    itertools::Itertools,
    statrs::statistics::Statistics,
};

#[cfg(debug_assertions)]
use crate::config::DF;

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestReport {
    pub coin_id: String,
    pub strategy: String,
    pub initial_capital: f64,
    pub end_portfolio_value: f64,
    /// Fractional, e.g. 0.02 = +2 %.
    pub total_return: f64,
    /// Largest peak-to-trough fall of the portfolio value, fractional.
    pub max_drawdown: f64,
    pub periods: usize,
    pub mean_period_return: f64,
    pub period_return_std_dev: f64,
}

impl BacktestReport {
    fn flat(initial_capital: f64) -> Self {
        Self {
            coin_id: String::new(),
            strategy: String::new(),
            initial_capital,
            end_portfolio_value: initial_capital,
            total_return: 0.0,
            max_drawdown: 0.0,
            periods: 0,
            mean_period_return: 0.0,
            period_return_std_dev: 0.0,
        }
    }
}

// ─── Main entry points ───────────────────────────────────────────────────────

/// Replay `signals` over `prices` starting from `initial_capital`.
pub fn simple_backtest(
    prices: &[PricePoint],
    signals: &[Signal],
    initial_capital: f64,
) -> BacktestReport {
    if prices.len() < 2 {
        return BacktestReport::flat(initial_capital);
    }

    let mut prices = prices.to_vec();
    prices.sort_by_key(|p| p.timestamp_ms);
    let mut signals = signals.to_vec();
    signals.sort_by_key(|s| s.timestamp_ms);

    let mut value = initial_capital;
    let mut peak = initial_capital;
    let mut max_drawdown: f64 = 0.0;
    let mut period_returns = Vec::with_capacity(prices.len() - 1);
    let mut next_signal = 0;
    let mut exposure = 0.0;

    for (prev, curr) in prices.iter().tuple_windows() {
        // Advance to the latest signal at or before the start of this step
        while next_signal < signals.len() && signals[next_signal].timestamp_ms <= prev.timestamp_ms
        {
            exposure = signals[next_signal].clamped_position();
            next_signal += 1;
        }

        let price_return = curr.price / prev.price - 1.0;
        let strategy_return = exposure * price_return;
        period_returns.push(strategy_return);

        value = (value * (1.0 + strategy_return)).max(0.0);
        peak = peak.max(value);
        if peak > 0.0 {
            max_drawdown = max_drawdown.max((peak - value) / peak);
        }

        #[cfg(debug_assertions)]
        if DF.log_backtest_steps {
            log::debug!(
                "[backtest] t={} price={:.6} exposure={:.2} value={:.2}",
                curr.timestamp_ms,
                curr.price,
                exposure,
                value
            );
        }
    }

    let mean_period_return = period_returns.iter().mean();
    let period_return_std_dev = if period_returns.len() > 1 {
        period_returns.iter().std_dev()
    } else {
        0.0
    };

    let total_return = if initial_capital != 0.0 {
        value / initial_capital - 1.0
    } else {
        0.0
    };

    BacktestReport {
        coin_id: String::new(),
        strategy: String::new(),
        initial_capital,
        end_portfolio_value: value,
        total_return,
        max_drawdown,
        periods: period_returns.len(),
        mean_period_return,
        period_return_std_dev,
    }
}

/// Backtest a single coin's rows (oldest first) with `generator`.
pub fn backtest_coin(
    coin_id: &str,
    records: &[MarketRecord],
    generator: &dyn SignalGenerator,
    initial_capital: f64,
) -> BacktestReport {
    let prices: Vec<PricePoint> = records.iter().filter_map(MarketRecord::price_point).collect();
    let signals = generator.generate(records);

    let mut report = simple_backtest(&prices, &signals, initial_capital);
    report.coin_id = coin_id.to_string();
    report.strategy = generator.name().to_string();
    report
}

/// Group rows by coin id and backtest each group. Reports come back sorted by coin id.
pub fn run_backtest(
    records: Vec<MarketRecord>,
    generator: &dyn SignalGenerator,
    initial_capital: f64,
) -> Vec<BacktestReport> {
    let by_coin = records.into_iter().into_group_map_by(|r| r.id.clone());

    let reports: Vec<BacktestReport> = by_coin
        .into_iter()
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .map(|(coin_id, rows)| backtest_coin(&coin_id, &rows, generator, initial_capital))
        .collect();

    for report in &reports {
        log::info!(
            "[backtest] {} | strategy={} | periods={} | end_value={:.2} | return={:.3}% | max_dd={:.3}%",
            report.coin_id,
            report.strategy,
            report.periods,
            report.end_portfolio_value,
            report.total_return * 100.0,
            report.max_drawdown * 100.0,
        );
    }

    reports
}
