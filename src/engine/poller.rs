use {
    crate::{
        config::PERSISTENCE,
        data::{
            CallRecord, FetchError, MarketDataProvider, MarketDataStorage, PacingGovernor,
            QuotaState,
        },
        domain::MarketRecord,
        utils::{TimeUtils, local_now, now_timestamp_ms, start_of_next_month},
    },
    anyhow::Result,
    serde::{Deserialize, Serialize},
    std::{future::Future, pin::Pin, sync::Arc},
    strum_macros::{Display, EnumIter},
    uuid::Uuid,
};

/// Which calls count against the monthly quota.
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
pub enum DecrementPolicy {
    /// Only calls that returned a decoded payload.
    #[default]
    OnSuccess,
    /// Every call that was sent, whatever came back.
    OnEveryAttempt,
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Stop after this many calls. `None` runs until shutdown.
    pub max_calls: Option<u64>,
    /// Write the quota file after this many counted calls. 0 = only on exit.
    pub persist_every: u64,
    pub decrement_policy: DecrementPolicy,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_calls: None,
            persist_every: PERSISTENCE.quota.persist_every,
            decrement_policy: DecrementPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub records_stored: u64,
    pub remaining_calls: i64,
}

/// Sequential poll loop: wait the paced delay, call once, store, account, repeat.
pub struct Poller {
    provider: Arc<dyn MarketDataProvider>,
    storage: Arc<dyn MarketDataStorage>,
    quota: QuotaState,
    governor: PacingGovernor,
    config: PollerConfig,
    session_id: String,
    counted_since_persist: u64,
}

impl Poller {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        storage: Arc<dyn MarketDataStorage>,
        quota: QuotaState,
        governor: PacingGovernor,
        config: PollerConfig,
    ) -> Self {
        Self {
            provider,
            storage,
            quota,
            governor,
            config,
            session_id: Uuid::new_v4().to_string(),
            counted_since_persist: 0,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Poll until `shutdown` resolves or `max_calls` is reached.
    ///
    /// The quota file is written on every exit path, including when a storage error ends the run.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<PollSummary>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        log::info!(
            "Poller session {} starting: {} calls left, floor {:.1}s, decrement {}",
            self.session_id,
            self.quota.current(),
            self.governor.floor_seconds(),
            self.config.decrement_policy
        );
        log::info!(
            "Quota window resets at {}",
            start_of_next_month(local_now()).format(TimeUtils::STANDARD_TIME_FORMAT)
        );

        let mut summary = PollSummary::default();
        let outcome = self.poll_loop(&mut shutdown, &mut summary).await;

        summary.remaining_calls = self.quota.current();
        let persisted = self.quota.persist();

        outcome?;
        persisted?;

        log::info!(
            "Poller session {} finished: {} calls ({} ok, {} failed), {} records stored, {} calls left",
            self.session_id,
            summary.attempts,
            summary.successes,
            summary.failures,
            summary.records_stored,
            summary.remaining_calls
        );

        Ok(summary)
    }

    async fn poll_loop<F>(
        &mut self,
        shutdown: &mut Pin<&mut F>,
        summary: &mut PollSummary,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut warned_exhausted = false;

        loop {
            if let Some(max_calls) = self.config.max_calls {
                if summary.attempts >= max_calls {
                    log::info!("Reached {} calls for this session. Stopping.", max_calls);
                    return Ok(());
                }
            }

            let remaining = self.quota.current();
            if remaining <= 0 && !warned_exhausted {
                log::warn!(
                    "Monthly quota exhausted ({} calls left). Continuing at the {:.1}s floor.",
                    remaining,
                    self.governor.floor_seconds()
                );
                warned_exhausted = true;
            }

            let delay = self.governor.delay(remaining, local_now());
            log::info!(
                "Next call in {:.1}s ({} calls left)",
                delay.as_secs_f64(),
                remaining
            );

            tokio::select! {
                biased;
                _ = shutdown.as_mut() => {
                    log::info!("Shutdown requested while waiting. Stopping.");
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let fetched = tokio::select! {
                biased;
                _ = shutdown.as_mut() => {
                    log::info!("Shutdown requested during a call. Stopping.");
                    // The request already left, so it costs quota under on-every-attempt
                    if self.config.decrement_policy == DecrementPolicy::OnEveryAttempt {
                        summary.attempts += 1;
                        summary.failures += 1;
                        self.quota.decrement();
                    }
                    return Ok(());
                }
                result = self.provider.fetch_markets() => result,
            };

            summary.attempts += 1;
            let called_at_ms = now_timestamp_ms();
            let counted = self.count_call(fetched.is_ok());

            let call = match fetched {
                Ok(records) => {
                    let stored = self.store(&records).await?;
                    summary.successes += 1;
                    summary.records_stored += stored;
                    self.call_record(called_at_ms, None, stored)
                }
                Err(e) => {
                    log::warn!("Market data call failed: {}", e);
                    summary.failures += 1;
                    self.call_record(called_at_ms, Some(&e), 0)
                }
            };

            self.storage.record_call(&call).await?;

            if counted {
                self.flush_if_due()?;
            }
        }
    }

    /// Decrement per policy. Returns whether the call was counted.
    fn count_call(&mut self, succeeded: bool) -> bool {
        let counted = succeeded || self.config.decrement_policy == DecrementPolicy::OnEveryAttempt;
        if counted {
            self.quota.decrement();
            self.counted_since_persist += 1;
        }
        counted
    }

    /// Write the counter once `persist_every` counted calls have built up.
    fn flush_if_due(&mut self) -> Result<()> {
        if self.config.persist_every > 0 && self.counted_since_persist >= self.config.persist_every
        {
            self.quota.persist()?;
            self.counted_since_persist = 0;
        }
        Ok(())
    }

    async fn store(&self, records: &[MarketRecord]) -> Result<u64> {
        let stored = self.storage.insert_records(records).await?;
        log::info!("Stored {} market records", stored);
        Ok(stored)
    }

    fn call_record(&self, called_at_ms: i64, error: Option<&FetchError>, records: u64) -> CallRecord {
        CallRecord {
            session_id: self.session_id.clone(),
            called_at_ms,
            success: error.is_none(),
            status: error.and_then(FetchError::status),
            records,
            remaining_calls: self.quota.current(),
            error: error.map(|e| e.to_string()),
        }
    }
}
