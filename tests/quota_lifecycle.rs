//! Quota tracker behaviour across simulated process restarts.

use chrono::NaiveDate;
use coin_pacer::config::{PacingRegime, QuotaConfig};
use coin_pacer::data::{QuotaError, QuotaOrigin, delay_for_window};
use coin_pacer::{PacingGovernor, QuotaState, compute_delay};
use std::fs;
use tempfile::tempdir;

const CAP: i64 = 10_000;

#[test]
fn test_counter_survives_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("remaining_calls.txt");

    // First run: no file, defaults to the cap
    let mut first = QuotaState::initialize(None, &path, CAP).unwrap();
    for _ in 0..3 {
        first.decrement();
    }
    first.persist().unwrap();
    drop(first);

    // Second run picks up where the first left off
    let second = QuotaState::initialize(None, &path, CAP).unwrap();
    assert_eq!(second.current(), 9_997);
    assert_eq!(second.origin(), QuotaOrigin::Disk);
}

#[test]
fn test_override_replaces_persisted_value() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("remaining_calls.txt");
    fs::write(&path, "5000").unwrap();

    let state = QuotaState::initialize(Some(1234), &path, CAP).unwrap();
    assert_eq!(state.current(), 1234);
    assert_eq!(fs::read_to_string(&path).unwrap(), "1234");

    let reloaded = QuotaState::initialize(None, &path, CAP).unwrap();
    assert_eq!(reloaded.current(), 1234);
}

#[test]
fn test_corrupt_tracker_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("remaining_calls.txt");
    fs::write(&path, "12abc").unwrap();

    let err = QuotaState::initialize(None, &path, CAP).unwrap_err();
    assert!(matches!(err, QuotaError::Corrupt { .. }));
    assert!(err.to_string().contains("remaining_calls.txt"));
}

#[test]
fn test_pacing_follows_regime() {
    let now = NaiveDate::from_ymd_opt(2024, 3, 2)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();

    let long_run = PacingGovernor::new(QuotaConfig::for_regime(PacingRegime::LongRun));
    let short_run = PacingGovernor::new(QuotaConfig::for_regime(PacingRegime::ShortRun));

    assert_eq!(long_run.seconds_between_calls(CAP, now), 256.0);
    assert_eq!(short_run.seconds_between_calls(CAP, now), 2.0);
    assert_eq!(compute_delay(CAP, now, 2.0), 2.0);
}

#[test]
fn test_thirty_day_window_scenario() {
    assert_eq!(delay_for_window(10_000, 2_592_000.0, 2.0), 2.0);
    assert_eq!(delay_for_window(0, 2_592_000.0, 2.0), 2.0);
}
