use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};

use parsync_exec::retry::{
    decide_retry, parse_retry_after, RetryConfig, RetryDecision, RetryHeadersConfig, RetryReason,
};
use parsync_exec::OperationError;

#[test]
fn fatal_errors_are_never_retried() {
    let cfg = RetryConfig::default();
    let d = decide_retry(&cfg, 1, 4, &OperationError::fatal("bad payload"), || 0);
    assert_eq!(
        d,
        RetryDecision::Stop {
            reason: RetryReason::NotRetryable
        }
    );
}

#[test]
fn retryable_errors_stop_at_the_attempt_budget() {
    let cfg = RetryConfig::default();
    let err = OperationError::retryable("503");
    assert!(matches!(
        decide_retry(&cfg, 3, 4, &err, || 0),
        RetryDecision::RetryAfter { .. }
    ));
    assert_eq!(
        decide_retry(&cfg, 4, 4, &err, || 0),
        RetryDecision::Stop {
            reason: RetryReason::AttemptsExhausted
        }
    );
}

#[test]
fn zero_retry_budget_means_single_attempt() {
    let cfg = RetryConfig::default();
    let d = decide_retry(&cfg, 1, 1, &OperationError::timeout(Duration::from_secs(10)), || 0);
    assert_eq!(
        d,
        RetryDecision::Stop {
            reason: RetryReason::AttemptsExhausted
        }
    );
}

#[test]
fn backoff_jitter_is_bounded_by_exponential_delay() {
    let cfg = RetryConfig::default();
    let err = OperationError::retryable("flaky");
    // rand = u64::MAX picks the upper end of the jitter window.
    let delays: Vec<Duration> = (1..=4)
        .map(|attempt| match decide_retry(&cfg, attempt, 10, &err, || u64::MAX) {
            RetryDecision::RetryAfter { delay, reason } => {
                assert_eq!(reason, RetryReason::Backoff);
                delay
            }
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    for (i, delay) in delays.iter().enumerate() {
        assert!(*delay <= Duration::from_millis(500 * 2u64.pow(i as u32)));
    }

    let capped = decide_retry(&cfg, 30, 40, &err, || u64::MAX);
    match capped {
        RetryDecision::RetryAfter { delay, .. } => assert!(delay <= cfg.max_delay),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn retry_after_hint_wins_over_backoff_and_is_capped() {
    let cfg = RetryConfig::default();
    let err = OperationError::Retryable {
        message: "429".to_string(),
        retry_after: Some(Duration::from_secs(5)),
    };
    assert_eq!(
        decide_retry(&cfg, 1, 4, &err, || 0),
        RetryDecision::RetryAfter {
            delay: Duration::from_secs(5),
            reason: RetryReason::RetryAfterHint
        }
    );

    let err = OperationError::Retryable {
        message: "429".to_string(),
        retry_after: Some(Duration::from_secs(600)),
    };
    match decide_retry(&cfg, 1, 4, &err, || 0) {
        RetryDecision::RetryAfter { delay, .. } => assert_eq!(delay, cfg.max_delay),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn parses_standard_retry_after_in_seconds_and_http_date() {
    let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let cfg = RetryHeadersConfig::default();

    let mut headers = BTreeMap::new();
    headers.insert("retry-after".to_string(), "7".to_string());
    assert_eq!(parse_retry_after(&headers, &cfg, now), Some(Duration::from_secs(7)));

    let later = now + Duration::from_secs(30);
    let mut headers = BTreeMap::new();
    headers.insert("Retry-After".to_string(), httpdate::fmt_http_date(later));
    assert_eq!(parse_retry_after(&headers, &cfg, now), Some(Duration::from_secs(30)));
}

#[test]
fn falls_back_to_vendor_rate_limit_headers() {
    let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
    let cfg = RetryHeadersConfig::commerce_platforms();

    let mut headers = BTreeMap::new();
    headers.insert("x-rate-limit-time-reset-ms".to_string(), "1500".to_string());
    assert_eq!(parse_retry_after(&headers, &cfg, now), Some(Duration::from_millis(1500)));

    let mut headers = BTreeMap::new();
    headers.insert("X-RateLimit-Reset".to_string(), "1700000012".to_string());
    assert_eq!(parse_retry_after(&headers, &cfg, now), Some(Duration::from_secs(12)));

    let mut headers = BTreeMap::new();
    headers.insert("X-RateLimit-Reset".to_string(), "1600000000".to_string());
    assert_eq!(parse_retry_after(&headers, &cfg, now), None);
}
