use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;

use crowd_domain::config::LimitsConfig;
use crowd_quota::{FixedClock, QuotaExceeded, UsageFile, UsageLimiter, UsageRecord};
use crowd_sessions::{SessionContext, SessionStore};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

fn config(dir: &Path, user: u64, total: u64) -> LimitsConfig {
    LimitsConfig {
        daily_user_limit: user,
        daily_total_limit: total,
        usage_path: dir.join("api_usage.json"),
    }
}

fn limiter(dir: &Path, user: u64, total: u64) -> UsageLimiter {
    UsageLimiter::with_clock(&config(dir, user, total), Arc::new(FixedClock::new(today())))
}

#[test]
fn two_sessions_share_the_global_limit() {
    let dir = tempfile::tempdir().unwrap();
    let limiter = limiter(dir.path(), 2, 3);
    let mut a = SessionContext::new("a");
    let mut b = SessionContext::new("b");

    assert!(limiter.check_limits(&mut a).is_ok());
    limiter.increment_usage(&mut a);
    assert_eq!((a.api_calls, limiter.record().total_calls), (1, 1));

    assert!(limiter.check_limits(&mut a).is_ok());
    limiter.increment_usage(&mut a);
    assert_eq!((a.api_calls, limiter.record().total_calls), (2, 2));

    assert_eq!(
        limiter.check_limits(&mut a),
        Err(QuotaExceeded::User { limit: 2 })
    );

    assert!(limiter.check_limits(&mut b).is_ok());
    limiter.increment_usage(&mut b);
    assert_eq!((b.api_calls, limiter.record().total_calls), (1, 3));

    // `b` is under its own limit but the day's total is spent.
    assert_eq!(
        limiter.check_limits(&mut b),
        Err(QuotaExceeded::Total { limit: 3 })
    );
}

#[test]
fn n_records_count_exactly_n() {
    let dir = tempfile::tempdir().unwrap();
    let limiter = limiter(dir.path(), 50, 100);
    let mut session = SessionContext::new("a");

    for _ in 0..37 {
        limiter.check_limits(&mut session).unwrap();
        limiter.increment_usage(&mut session);
    }

    assert_eq!(limiter.record().total_calls, 37);
    let on_disk = UsageFile::new(dir.path().join("api_usage.json"))
        .read()
        .unwrap()
        .unwrap();
    assert_eq!(on_disk.total_calls, 37);
}

#[test]
fn restart_keeps_total_but_not_session_counters() {
    let dir = tempfile::tempdir().unwrap();
    {
        let limiter = limiter(dir.path(), 2, 100);
        let mut session = SessionContext::new("a");
        limiter.try_acquire(&mut session).unwrap();
        limiter.try_acquire(&mut session).unwrap();
        assert!(limiter.check_limits(&mut session).is_err());
    }

    let limiter = limiter(dir.path(), 2, 100);
    assert_eq!(limiter.record().total_calls, 2);

    let mut session = SessionContext::new("a");
    assert!(limiter.check_limits(&mut session).is_ok());
}

#[test]
fn stale_file_from_previous_day_rolls_on_first_check() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("api_usage.json"),
        r#"{"date": "2026-10-12", "total_calls": 99}"#,
    )
    .unwrap();

    let limiter = limiter(dir.path(), 10, 100);
    // Lazy: nothing changes until the record is touched.
    assert_eq!(limiter.record().total_calls, 99);

    let mut session = SessionContext::new("a");
    limiter.check_limits(&mut session).unwrap();
    assert_eq!(limiter.record(), UsageRecord::fresh(today()));

    let on_disk = UsageFile::new(dir.path().join("api_usage.json"))
        .read()
        .unwrap()
        .unwrap();
    assert_eq!(on_disk, UsageRecord::fresh(today()));
}

#[test]
fn concurrent_acquire_never_exceeds_total() {
    let dir = tempfile::tempdir().unwrap();
    let limiter = Arc::new(limiter(dir.path(), 5, 20));
    let store = Arc::new(SessionStore::new());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let limiter = limiter.clone();
            let store = store.clone();
            std::thread::spawn(move || {
                let key = format!("client-{i}");
                let mut accepted = 0u64;
                for _ in 0..10 {
                    let ok = store.with_session(&key, |ctx| limiter.try_acquire(ctx).is_ok());
                    if ok {
                        accepted += 1;
                    }
                }
                accepted
            })
        })
        .collect();

    let accepted: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(accepted, 20);
    assert_eq!(limiter.record().total_calls, 20);
    for ctx in store.list() {
        assert!(ctx.api_calls <= 5);
    }
}

#[test]
fn garbage_file_is_replaced_on_first_write() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("api_usage.json"), "\u{0}\u{1}garbage").unwrap();

    let limiter = limiter(dir.path(), 10, 100);
    let mut session = SessionContext::new("a");
    limiter.try_acquire(&mut session).unwrap();

    let on_disk = UsageFile::new(dir.path().join("api_usage.json"))
        .read()
        .unwrap()
        .unwrap();
    assert_eq!(on_disk.total_calls, 1);
    assert_eq!(on_disk.date, today());
}
