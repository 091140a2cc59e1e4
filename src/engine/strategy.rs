//! Placeholder signal generators. Real strategy logic plugs in behind [`SignalGenerator`].
use {
    crate::domain::{MarketRecord, Signal},
    serde::{Deserialize, Serialize},
    strum_macros::{Display, EnumIter},
};

pub trait SignalGenerator {
    fn name(&self) -> &'static str;

    /// Signals for the rows of a single coin, oldest first.
    fn generate(&self, records: &[MarketRecord]) -> Vec<Signal>;
}

/// Emits nothing, so the backtest stays in cash.
pub struct Flat;

impl SignalGenerator for Flat {
    fn name(&self) -> &'static str {
        "flat"
    }

    fn generate(&self, _records: &[MarketRecord]) -> Vec<Signal> {
        Vec::new()
    }
}

/// One fully-long signal per row, all stamped at time zero (buy and hold).
pub struct AlwaysLong;

impl SignalGenerator for AlwaysLong {
    fn name(&self) -> &'static str {
        "always-long"
    }

    fn generate(&self, records: &[MarketRecord]) -> Vec<Signal> {
        records.iter().map(|_| Signal::new(0, 1.0)).collect()
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    clap::ValueEnum,
)]
#[strum(serialize_all = "kebab-case")]
pub enum StrategyKind {
    Flat,
    #[default]
    AlwaysLong,
}

impl StrategyKind {
    pub fn generator(self) -> Box<dyn SignalGenerator> {
        match self {
            StrategyKind::Flat => Box::new(Flat),
            StrategyKind::AlwaysLong => Box::new(AlwaysLong),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_always_long_one_signal_per_row() {
        let rows = vec![MarketRecord::new("bitcoin", "btc", "Bitcoin"); 3];
        let signals = AlwaysLong.generate(&rows);
        assert_eq!(signals, vec![Signal::new(0, 1.0); 3]);
    }

    #[test]
    fn test_flat_is_empty() {
        let rows = vec![MarketRecord::new("bitcoin", "btc", "Bitcoin"); 3];
        assert!(Flat.generate(&rows).is_empty());
    }

    #[test]
    fn test_kind_names_match_generators() {
        for kind in StrategyKind::iter() {
            assert_eq!(kind.to_string(), kind.generator().name());
        }
    }
}
