use {
    crate::{
        config::QuotaConfig,
        utils::{TimeUtils, seconds_left_in_month},
    },
    chrono::NaiveDateTime,
    std::time::Duration,
};

#[cfg(debug_assertions)]
use crate::{config::DF, utils::format_duration};

/// Minimum seconds between two calls so the monthly quota lasts until `now`'s month rolls over,
/// never less than `floor_seconds`.
pub fn compute_delay(remaining_calls: i64, now: NaiveDateTime, floor_seconds: f64) -> f64 {
    delay_for_window(remaining_calls, seconds_left_in_month(now), floor_seconds)
}

/// Same rule with the time-to-rollover supplied directly.
///
/// Budget rate is `remaining_calls / seconds_left_in_month`. Zero or negative remaining calls
/// give a non-positive budget rate, so the floor wins.
pub fn delay_for_window(
    remaining_calls: i64,
    seconds_left_in_month: f64,
    floor_seconds: f64,
) -> f64 {
    let window = seconds_left_in_month.max(TimeUtils::MONTH_ROLLOVER_EPSILON_SECS);
    let budget_rate = remaining_calls as f64 / window;
    budget_rate.max(floor_seconds)
}

/// Decides how long the poll loop waits before each outbound call.
#[derive(Debug, Clone)]
pub struct PacingGovernor {
    config: QuotaConfig,
}

impl PacingGovernor {
    pub fn new(mut config: QuotaConfig) -> Self {
        if config.floor_seconds.is_nan() || config.floor_seconds < 0.0 {
            log::warn!(
                "Pacing floor {} is not a non-negative number. Using 0s.",
                config.floor_seconds
            );
            config.floor_seconds = 0.0;
        }

        let spacing = config.per_minute_spacing_secs();
        if config.floor_seconds < spacing {
            log::warn!(
                "Pacing floor {:.2}s is below {:.2}s: the monthly budget alone may exceed {} calls/minute.",
                config.floor_seconds,
                spacing,
                config.per_minute_cap
            );
        }

        Self { config }
    }

    pub fn config(&self) -> &QuotaConfig {
        &self.config
    }

    pub fn floor_seconds(&self) -> f64 {
        self.config.floor_seconds
    }

    pub fn seconds_between_calls(&self, remaining_calls: i64, now: NaiveDateTime) -> f64 {
        let seconds_left = seconds_left_in_month(now);
        let secs = delay_for_window(remaining_calls, seconds_left, self.config.floor_seconds);

        #[cfg(debug_assertions)]
        if DF.log_pacing {
            log::debug!(
                "Pacing: {} calls left, {} to rollover, waiting {:.3}s (floor {:.3}s)",
                remaining_calls,
                format_duration((seconds_left * 1000.0) as i64),
                secs,
                self.config.floor_seconds
            );
        }
        secs
    }

    pub fn delay(&self, remaining_calls: i64, now: NaiveDateTime) -> Duration {
        let secs = self.seconds_between_calls(remaining_calls, now).max(0.0);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}
