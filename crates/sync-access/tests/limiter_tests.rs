//! Tests for the fixed-window call limiter

use std::time::{Duration, Instant};

use rstest::rstest;
use sync_access::CallLimiter;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn admits_up_to_limit_then_rejects_within_window() {
    let limiter = CallLimiter::new(3, 1000);
    let start = Instant::now();

    assert!(limiter.track_at("10.0.0.1", start));
    assert!(limiter.track_at("10.0.0.1", start + ms(100)));
    assert!(limiter.track_at("10.0.0.1", start + ms(200)));
    assert!(!limiter.track_at("10.0.0.1", start + ms(300)));
}

#[rstest]
#[case::exactly_at_window(1000)]
#[case::after_window(1500)]
fn window_resets_once_elapsed(#[case] offset: u64) {
    let limiter = CallLimiter::new(3, 1000);
    let start = Instant::now();
    for i in 0..4 {
        limiter.track_at("k", start + ms(i));
    }
    assert!(!limiter.track_at("k", start + ms(999)));

    assert!(limiter.track_at("k", start + ms(offset)));
}

#[test]
fn keys_are_counted_independently() {
    let limiter = CallLimiter::new(1, 1000);
    let now = Instant::now();

    assert!(limiter.track_at("a", now));
    assert!(!limiter.track_at("a", now));
    assert!(limiter.track_at("b", now));
}

/// Fixed-window behaviour: a burst straddling the boundary is admitted up
/// to twice the limit. Changing the limiting scheme must update this test.
#[test]
fn boundary_burst_admits_twice_the_limit() {
    let limiter = CallLimiter::new(3, 1000);
    let start = Instant::now();
    let mut admitted = 0;

    for offset in [0, 997, 998, 999, 1000, 1001, 1002, 1003] {
        if limiter.track_at("burst", start + ms(offset)) {
            admitted += 1;
        }
    }

    // Six calls inside roughly 10ms, against a limit of three per second.
    assert_eq!(admitted, 6);
}

#[test]
fn pair_tracking_uses_secondary_for_new_primary() {
    let limiter = CallLimiter::new(2, 1000);
    let now = Instant::now();

    // Same hardware address rotating through client addresses.
    assert!(limiter.track_pair_at("1.1.1.1", "mac", now));
    assert!(limiter.track_pair_at("2.2.2.2", "mac", now));
    assert!(!limiter.track_pair_at("3.3.3.3", "mac", now));
}

#[test]
fn pair_tracking_lets_known_primary_decide() {
    let limiter = CallLimiter::new(2, 1000);
    let now = Instant::now();

    assert!(limiter.track_pair_at("1.1.1.1", "mac", now));
    assert!(limiter.track_pair_at("1.1.1.1", "mac", now));
    assert!(!limiter.track_pair_at("1.1.1.1", "other-mac", now));
}

#[test]
fn concurrent_tracking_never_over_admits() {
    let limiter = std::sync::Arc::new(CallLimiter::new(50, 60_000));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let limiter = limiter.clone();
            std::thread::spawn(move || (0..20).filter(|_| limiter.track("shared")).count())
        })
        .collect();

    let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(admitted, 50);
}
