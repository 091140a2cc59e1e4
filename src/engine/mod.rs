mod backtest;
mod poller;
mod strategy;

pub use backtest::{BacktestReport, backtest_coin, run_backtest, simple_backtest};
pub use poller::{DecrementPolicy, PollSummary, Poller, PollerConfig};
pub use strategy::{AlwaysLong, Flat, SignalGenerator, StrategyKind};
