//! Debugging feature flags.

#[allow(dead_code)]
pub struct LogFlags {
    /// Log every pacing decision (remaining calls, seconds to rollover, chosen delay).
    pub log_pacing: bool,

    /// Log each quota file write.
    pub log_quota_writes: bool,

    /// Log request URLs and response sizes from the market data provider.
    pub log_provider: bool,

    /// Log batch inserts and call-log rows.
    pub log_storage: bool,

    pub log_backtest_steps: bool,
}

pub const DF: LogFlags = LogFlags {
    log_pacing: true,
    log_quota_writes: false,

    log_provider: false,
    log_storage: false,

    log_backtest_steps: false,
};
