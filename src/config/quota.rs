//! Call quota and pacing configuration.
use {
    serde::{Deserialize, Serialize},
    strum_macros::{Display, EnumIter, EnumString},
};

/// Which pacing floor applies to this session.
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
    EnumString,
    clap::ValueEnum,
)]
#[strum(serialize_all = "kebab-case")]
pub enum PacingRegime {
    /// Process is expected to keep polling until the month rolls over.
    #[default]
    LongRun,
    /// Short sessions (minutes, not weeks). Only the per-minute cap matters.
    ShortRun,
}

impl PacingRegime {
    pub const fn floor_seconds(self) -> f64 {
        match self {
            PacingRegime::LongRun => QUOTA.long_run_floor_secs,
            PacingRegime::ShortRun => QUOTA.short_run_floor_secs,
        }
    }
}

/// Quota limits of the upstream API plus the named floor regimes.
pub struct QuotaLimits {
    pub max_calls_per_month: i64,
    pub max_calls_per_minute: u32,
    /// Floor used when running for >= 1 month.
    pub long_run_floor_secs: f64,
    /// Floor used when running for >= 1 minute but << 1 month.
    pub short_run_floor_secs: f64,
}

pub const QUOTA: QuotaLimits = QuotaLimits {
    max_calls_per_month: 10_000,
    max_calls_per_minute: 30,
    long_run_floor_secs: 256.0,
    short_run_floor_secs: 2.0,
};

/// Runtime quota configuration handed to the pacing governor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuotaConfig {
    pub monthly_cap: i64,
    pub per_minute_cap: u32,
    pub floor_seconds: f64,
}

impl QuotaConfig {
    pub fn for_regime(regime: PacingRegime) -> Self {
        Self {
            floor_seconds: regime.floor_seconds(),
            ..Self::default()
        }
    }

    /// Shortest gap between calls that still honours the per-minute cap.
    pub fn per_minute_spacing_secs(&self) -> f64 {
        if self.per_minute_cap == 0 {
            return f64::INFINITY;
        }
        60.0 / self.per_minute_cap as f64
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            monthly_cap: QUOTA.max_calls_per_month,
            per_minute_cap: QUOTA.max_calls_per_minute,
            floor_seconds: QUOTA.long_run_floor_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_regime_floors() {
        assert_eq!(PacingRegime::LongRun.floor_seconds(), 256.0);
        assert_eq!(PacingRegime::ShortRun.floor_seconds(), 2.0);
        assert_eq!(QuotaConfig::for_regime(PacingRegime::ShortRun).floor_seconds, 2.0);
        assert_eq!(QuotaConfig::for_regime(PacingRegime::ShortRun).monthly_cap, 10_000);
    }

    #[test]
    fn test_regime_names() {
        assert_eq!(PacingRegime::ShortRun.to_string(), "short-run");
        assert_eq!(PacingRegime::from_str("long-run").unwrap(), PacingRegime::LongRun);
    }

    #[test]
    fn test_short_run_floor_matches_per_minute_cap() {
        let config = QuotaConfig::default();
        assert_eq!(config.per_minute_spacing_secs(), QUOTA.short_run_floor_secs);

        let unlimited = QuotaConfig {
            per_minute_cap: 0,
            ..QuotaConfig::default()
        };
        assert!(unlimited.per_minute_spacing_secs().is_infinite());
    }
}
