//! # Lightning Statistics
//!
//! Strike count during the past hour and the most recent strike event,
//! derived from the wrapping strike counter of a lightning sensor.
//!
//! The wrap value depends on the sensor revision (the three BCD digits plus
//! the extended high digit allow up to 1599), so it is a constructor
//! argument rather than a constant.

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::constants::{HOURLY_HIST_SIZE, NVS_NAMESPACE_LIGHTNING};
use crate::counters::{
    load_state, local_time, save_state, utc, BucketUpdate, CounterConfig, History, HistorySum, WrapTracker,
};
use crate::storage::KeyValueStore;

/// The last update in which the strike counter increased
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightningEvent {
    pub timestamp: i64,
    /// Strikes since the previous update
    pub events: i64,
    /// Raw distance byte of that message
    pub distance_km: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LightningState {
    last_update: Option<i64>,
    counter: WrapTracker<i64>,
    hist: History,
    last_event: Option<LightningEvent>,
}

impl LightningState {
    fn new(rate: u8) -> Self {
        Self {
            last_update: None,
            counter: WrapTracker::default(),
            hist: History::new(HOURLY_HIST_SIZE, rate),
            last_event: None,
        }
    }
}

/// Lightning statistics for one sensor
#[derive(Debug)]
pub struct Lightning {
    state: LightningState,
    count_max: u16,
    quality_threshold: f32,
    tz: FixedOffset,
    /// Delta of the most recent update; not persisted
    last_cycle: Option<i64>,
    store: Option<Box<dyn KeyValueStore>>,
}

impl Lightning {
    /// Create a counter for a sensor whose strike count wraps at `count_max`
    pub fn new(count_max: u16, config: CounterConfig) -> Self {
        Self {
            state: LightningState::new(config.effective_rate()),
            count_max,
            quality_threshold: config.quality_threshold,
            tz: utc(),
            last_cycle: None,
            store: None,
        }
    }

    pub fn with_timezone(mut self, tz: FixedOffset) -> Self {
        self.tz = tz;
        self
    }

    /// Attach a persistent store and load any saved state from it
    pub fn with_store(mut self, store: Box<dyn KeyValueStore>) -> Self {
        if let Some(saved) = load_state::<LightningState>(&*store, NVS_NAMESPACE_LIGHTNING) {
            let rate = self.state.hist.rate();
            self.state = saved;
            self.state.hist.set_rate(rate);
            log::debug!("[{NVS_NAMESPACE_LIGHTNING}] state restored");
        }
        self.store = Some(store);
        self
    }

    pub fn into_store(self) -> Option<Box<dyn KeyValueStore>> {
        self.store
    }

    fn save(&mut self) {
        save_state(&mut self.store, NVS_NAMESPACE_LIGHTNING, &self.state);
    }

    pub fn count_max(&self) -> u16 {
        self.count_max
    }

    /// Forget all history, events and counter tracking
    pub fn reset(&mut self) {
        self.state = LightningState::new(self.state.hist.rate());
        self.last_cycle = None;
        self.save();
    }

    /// Feed a raw strike counter received at `timestamp`
    pub fn update(&mut self, timestamp: i64, count: u16, distance_km: u8, startup: bool) {
        let Some(t) = local_time(timestamp, &self.tz) else {
            log::warn!("Timestamp {timestamp} out of range, ignoring update");
            return;
        };

        if self.state.counter.prev.is_none() {
            self.state.last_update = Some(timestamp);
        }
        let last_update = self.state.last_update.unwrap_or(timestamp);
        let t_delta = timestamp - last_update;
        if t_delta < 0 {
            log::warn!("Negative time span since last update!?");
            return;
        }

        let raw = count as i64;
        let prev = self.state.counter.prev.unwrap_or(raw);
        let curr = self.state.counter.accumulate(raw, startup, self.count_max as i64);

        let delta = curr - prev;
        self.last_cycle = Some(delta);
        if delta > 0 {
            self.state.last_event = Some(LightningEvent {
                timestamp,
                events: delta,
                distance_km,
            });
        }

        let bucket = bucket_delta(delta);
        if self.state.hist.update_bucket(&t, bucket, t_delta, last_update) == BucketUpdate::Expired {
            log::warn!("History time frame expired, resetting!");
            self.state.hist.reset();
        }

        self.state.last_update = Some(timestamp);
        self.state.counter.prev = Some(curr);
        self.save();
    }

    /// Strike count delta of the most recent update
    pub fn last_cycle(&self) -> Option<i64> {
        self.last_cycle
    }

    /// The last update that saw new strikes
    pub fn last_event(&self) -> Option<LightningEvent> {
        self.state.last_event
    }

    /// Strikes during the past 60 minutes
    pub fn past_hour(&self) -> HistorySum {
        self.state.hist.sum(self.quality_threshold)
    }

    /// Accumulated strike total, corrected for overflows and restarts
    pub fn total(&self) -> Option<i64> {
        self.state.counter.prev
    }

    pub fn last_update(&self) -> Option<i64> {
        self.state.last_update
    }
}

/// Strike delta as stored in a history bucket
fn bucket_delta(delta: i64) -> i32 {
    i32::try_from(delta).unwrap_or_else(|_| {
        log::warn!("Strike delta {delta} out of range, clamping");
        if delta < 0 {
            i32::MIN
        } else {
            i32::MAX
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::LIGHTNING_COUNT_MAX_1600;
    use crate::storage::MemoryStore;

    const T0: i64 = 1_704_067_200;
    const MIN: i64 = 60;

    #[test]
    fn test_bucket_delta_clamps_out_of_range() {
        assert_eq!(bucket_delta(108), 108);
        assert_eq!(bucket_delta(-3), -3);
        assert_eq!(bucket_delta(i64::from(i32::MAX) + 1), i32::MAX);
        assert_eq!(bucket_delta(i64::MIN), i32::MIN);
    }

    #[test]
    fn test_overflow() {
        let mut l = Lightning::new(LIGHTNING_COUNT_MAX_1600, CounterConfig::default());
        l.update(T0, 1500, 0, false);
        assert_eq!(l.last_cycle(), Some(0));
        assert_eq!(l.last_event(), None);

        l.update(T0 + 6 * MIN, 1502, 7, false);
        assert_eq!(l.last_cycle(), Some(2));

        l.update(T0 + 12 * MIN, 10, 5, false);
        assert_eq!(l.last_cycle(), Some(108));
        assert_eq!(l.past_hour().sum, 110);
        assert_eq!(
            l.last_event(),
            Some(LightningEvent {
                timestamp: T0 + 12 * MIN,
                events: 108,
                distance_km: 5
            })
        );
    }

    #[test]
    fn test_last_event_kept_without_strikes() {
        let mut l = Lightning::new(LIGHTNING_COUNT_MAX_1600, CounterConfig::default());
        l.update(T0, 3, 0, false);
        l.update(T0 + 6 * MIN, 5, 12, false);
        l.update(T0 + 12 * MIN, 5, 0, false);
        assert_eq!(l.last_cycle(), Some(0));
        let ev = l.last_event().unwrap();
        assert_eq!(ev.timestamp, T0 + 6 * MIN);
        assert_eq!(ev.events, 2);
        assert_eq!(ev.distance_km, 12);
    }

    #[test]
    fn test_startup_after_battery_change() {
        let mut l = Lightning::new(100, CounterConfig::default());
        l.update(T0, 40, 0, false);
        l.update(T0 + 6 * MIN, 3, 0, true);
        assert_eq!(l.last_cycle(), Some(3));
        assert_eq!(l.total(), Some(43));
    }

    #[test]
    fn test_quality() {
        let mut l = Lightning::new(LIGHTNING_COUNT_MAX_1600, CounterConfig::default());
        for i in 0..8 {
            l.update(T0 + i * 6 * MIN, 0, 0, false);
        }
        let s = l.past_hour();
        assert_eq!(s.bucket_count, 8);
        assert!(s.valid);
    }

    #[test]
    fn test_reset_and_persistence() {
        let mut l = Lightning::new(LIGHTNING_COUNT_MAX_1600, CounterConfig::default())
            .with_store(Box::new(MemoryStore::new()));
        l.update(T0, 1, 0, false);
        l.update(T0 + 6 * MIN, 4, 9, false);
        let store = l.into_store().unwrap();

        let mut l = Lightning::new(LIGHTNING_COUNT_MAX_1600, CounterConfig::default()).with_store(store);
        assert_eq!(l.past_hour().sum, 3);
        assert_eq!(l.last_event().map(|e| e.events), Some(3));
        assert_eq!(l.last_cycle(), None);

        l.reset();
        assert_eq!(l.total(), None);
        assert_eq!(l.last_event(), None);
        assert_eq!(l.past_hour().bucket_count, 0);
    }
}
