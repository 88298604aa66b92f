use bresser_rs::constants::LIGHTNING_COUNT_MAX_1600;
use bresser_rs::counters::{local_time, utc, BucketUpdate, History};
use bresser_rs::{CounterConfig, Lightning, MemoryStore, RainGauge, ResetFlags};
use chrono::FixedOffset;
use proptest::prelude::*;

// 2024-01-01 00:00:00 UTC, a Monday
const T0: i64 = 1_704_067_200;
const MIN: i64 = 60;
const HOUR: i64 = 3600;

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.05
}

#[test]
fn test_rain_small_increment() {
    let mut rain = RainGauge::new(100.0, CounterConfig::default());
    rain.update(T0, 10.0, false);
    rain.update(T0 + 6 * MIN, 10.1, false);
    assert!((rain.past_hour().rain_mm - 0.1).abs() <= 0.1);
}

#[test]
fn test_rain_increases_across_wrap() {
    let mut rain = RainGauge::new(100.0, CounterConfig::default());
    let mut last = 0.0;
    for (i, raw) in [10.0, 10.1, 60.3, 0.6, 10.0].into_iter().enumerate() {
        rain.update(T0 + i as i64 * 6 * MIN, raw, false);
        let h = rain.past_hour().rain_mm;
        assert!(h >= 0.0);
        if i > 0 {
            assert!(h > last, "step {i}: {h} <= {last}");
        }
        last = h;
    }
    assert!(approx(last, 100.0));
    assert!(approx(rain.total().unwrap(), 110.0));
}

#[test]
fn test_rain_full_hour_and_eviction() {
    let mut rain = RainGauge::new(100.0, CounterConfig::default());
    for i in 0..10 {
        rain.update(T0 + i * 6 * MIN, i as f32, false);
    }
    let h = rain.past_hour();
    assert_eq!(h.bucket_count, 10);
    assert!(h.valid);
    assert!(approx(h.rain_mm, 9.0));

    // minute 60 maps onto the bucket of the first update
    rain.update(T0 + HOUR, 12.0, false);
    assert_eq!(rain.past_hour().bucket_count, 10);
    assert!(approx(rain.past_hour().rain_mm, 12.0));

    // the bucket of the second update is replaced, not added to
    rain.update(T0 + HOUR + 6 * MIN, 14.0, false);
    assert_eq!(rain.past_hour().bucket_count, 10);
    assert!(approx(rain.past_hour().rain_mm, 13.0));
}

#[test]
fn test_rain_quality_with_gaps() {
    let mut rain = RainGauge::new(100.0, CounterConfig::default());
    rain.update(T0, 0.0, false);
    rain.update(T0 + 6 * MIN, 1.0, false);
    // skip four periods
    rain.update(T0 + 36 * MIN, 2.0, false);
    let h = rain.past_hour();
    assert_eq!(h.bucket_count, 3);
    assert!(!h.valid);
    assert!(approx(h.quality, 0.3));
    assert!(approx(h.rain_mm, 2.0));
}

#[test]
fn test_rain_long_gap_expires_hour_but_not_day() {
    let mut rain = RainGauge::new(100.0, CounterConfig::default());
    rain.update(T0, 0.0, false);
    rain.update(T0 + 6 * MIN, 1.0, false);
    rain.update(T0 + 3 * HOUR, 4.0, false);
    assert_eq!(rain.past_hour().bucket_count, 0);
    assert!(approx(rain.past_24h().rain_mm, 4.0));
    assert!(approx(rain.current_day().unwrap(), 4.0));
}

#[test]
fn test_rain_day_boundary_in_local_time() {
    let cet = FixedOffset::east_opt(HOUR as i32).unwrap();
    let mut rain = RainGauge::new(100.0, CounterConfig::default()).with_timezone(cet);
    rain.update(T0, 0.0, false);
    // 23:00 local, still Monday
    rain.update(T0 + 22 * HOUR, 3.0, false);
    assert!(approx(rain.current_day().unwrap(), 3.0));
    // 00:00 local on Tuesday
    rain.update(T0 + 23 * HOUR, 4.0, false);
    assert!(approx(rain.current_day().unwrap(), 0.0));
    assert!(approx(rain.current_week().unwrap(), 4.0));
}

#[test]
fn test_rain_reset_hour_keeps_baselines() {
    let mut rain = RainGauge::new(100.0, CounterConfig::default());
    rain.update(T0, 1.0, false);
    rain.update(T0 + 6 * MIN, 3.0, false);
    rain.reset(ResetFlags::HOUR);
    assert_eq!(rain.past_hour().bucket_count, 0);
    assert_eq!(rain.past_24h().bucket_count, 0);
    assert!(approx(rain.current_day().unwrap(), 2.0));
}

#[test]
fn test_rain_state_in_store() {
    let mut rain = RainGauge::new(100.0, CounterConfig::default()).with_store(Box::new(MemoryStore::new()));
    rain.update(T0, 1.0, false);
    rain.update(T0 + 6 * MIN, 99.5, false);
    rain.update(T0 + 12 * MIN, 0.5, false);
    let store = rain.into_store().unwrap();

    let mut rain = RainGauge::new(100.0, CounterConfig::default()).with_store(store);
    assert!(approx(rain.total().unwrap(), 100.5));
    rain.update(T0 + 18 * MIN, 1.5, false);
    assert!(approx(rain.past_hour().rain_mm, 100.5));
}

#[test]
fn test_lightning_overflow_sequence() {
    let mut lgt = Lightning::new(LIGHTNING_COUNT_MAX_1600, CounterConfig::default());
    lgt.update(T0, 1500, 0, false);
    lgt.update(T0 + 6 * MIN, 1502, 8, false);
    lgt.update(T0 + 12 * MIN, 10, 3, false);
    assert_eq!(lgt.past_hour().sum, 110);
    assert_eq!(lgt.total(), Some(1610));
    let ev = lgt.last_event().unwrap();
    assert_eq!((ev.timestamp, ev.events, ev.distance_km), (T0 + 12 * MIN, 108, 3));
}

#[test]
fn test_lightning_wrap_is_configurable() {
    let mut lgt = Lightning::new(100, CounterConfig::default());
    assert_eq!(lgt.count_max(), 100);
    lgt.update(T0, 95, 0, false);
    lgt.update(T0 + 6 * MIN, 5, 0, false);
    assert_eq!(lgt.last_cycle(), Some(10));
}

#[test]
fn test_lightning_event_survives_hour_expiry() {
    let mut lgt = Lightning::new(LIGHTNING_COUNT_MAX_1600, CounterConfig::default());
    lgt.update(T0, 5, 0, false);
    lgt.update(T0 + 2 * HOUR, 8, 11, false);
    assert_eq!(lgt.past_hour().bucket_count, 0);
    assert_eq!(lgt.last_cycle(), Some(3));
    assert_eq!(lgt.last_event().map(|e| e.distance_km), Some(11));
}

#[test]
fn test_history_helpers() {
    let mut hist = History::new(10, 6);
    let t = local_time(T0 + 13 * MIN, &utc()).unwrap();
    assert_eq!(hist.index(&t), 2);
    assert_eq!(hist.window_secs(), HOUR);

    assert_eq!(hist.update_bucket(&t, 5, 0, T0 + 13 * MIN), BucketUpdate::Accumulated);
    assert_eq!(hist.get(2), Some(5));

    hist.set_rate(6);
    assert_eq!(hist.get(2), Some(5));
    hist.set_rate(12);
    assert_eq!(hist.get(2), None);
    assert_eq!(hist.expected_buckets(), 5);
}

#[test]
fn test_mark_missed_with_zero_rate() {
    let mut hist = History::new(10, 0);
    hist.mark_missed(T0, T0 + HOUR, &utc());
    assert!(hist.buckets().iter().all(Option::is_none));
}

proptest! {
    #[test]
    fn prop_history_sum_is_idempotent(
        steps in proptest::collection::vec((1i64..20, 0i32..500), 1..40),
    ) {
        let tz = utc();
        let mut hist = History::new(10, 6);
        let mut last = T0;
        let mut now = T0;
        for (minutes, delta) in steps {
            now += minutes * MIN;
            let t = local_time(now, &tz).unwrap();
            if hist.update_bucket(&t, delta, now - last, last) == BucketUpdate::Expired {
                hist.reset();
            }
            last = now;
        }

        let a = hist.sum(0.8);
        let b = hist.sum(0.8);
        prop_assert_eq!(a, b);
        let manual: i64 = hist.buckets().iter().flatten().map(|v| *v as i64).sum();
        prop_assert_eq!(a.sum, manual);
        prop_assert_eq!(a.bucket_count, hist.buckets().iter().flatten().count());
    }

    #[test]
    fn prop_rain_total_is_monotonic(raws in proptest::collection::vec(0u32..400, 1..30)) {
        let mut rain = RainGauge::new(100.0, CounterConfig::default());
        let mut prev_total = 0.0f32;
        for (i, raw) in raws.iter().enumerate() {
            // quarter millimetres keep every sum exact in f32
            rain.update(T0 + i as i64 * 6 * MIN, *raw as f32 * 0.25, false);
            let total = rain.total().unwrap();
            prop_assert!(total >= prev_total);
            prop_assert!(rain.past_hour().rain_mm >= 0.0);
            prop_assert!(rain.past_24h().rain_mm >= 0.0);
            prev_total = total;
        }
    }
}
