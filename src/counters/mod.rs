//! # Rolling Counters
//!
//! Sensors report ever-growing raw counters (rain in mm, lightning strikes)
//! that wrap at a hardware maximum and restart at zero after a battery
//! change. The types here turn a stream of `(timestamp, raw value)` pairs
//! into monotonic totals and trailing window sums.
//!
//! ## Features
//!
//! - [`History`]: fixed-capacity circular buffer of per-bucket deltas with
//!   explicit "missing" buckets
//! - [`RainGauge`]: past hour, past 24 h, current day/week/month
//! - [`Lightning`]: past hour strike count and the last strike event
//!
//! Bucket index is a pure function of the timestamp: minute of hour divided
//! by the bucket length, or hour of day for buckets of 60 minutes and more.
//! All calendar arithmetic happens in the `FixedOffset` supplied by the
//! caller.

use chrono::{DateTime, FixedOffset, Offset, TimeZone, Timelike, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_QUALITY_THRESHOLD, DEFAULT_UPDATE_RATE, HOURLY_HIST_SIZE};
use crate::storage::{load_json, save_json, KeyValueStore};

pub mod lightning;
pub mod rain_gauge;

pub use lightning::{Lightning, LightningEvent};
pub use rain_gauge::{RainGauge, ResetFlags};

/// Rolling counter parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Bucket length in minutes
    pub update_rate: u8,
    /// Fraction of valid buckets required for a valid sum
    pub quality_threshold: f32,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            update_rate: DEFAULT_UPDATE_RATE,
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
        }
    }
}

impl CounterConfig {
    /// True if `rate` splits an hour into at most `HOURLY_HIST_SIZE` buckets
    pub fn is_valid_rate(rate: u8) -> bool {
        rate > 0 && rate < 60 && 60 % rate == 0 && (60 / rate) as usize <= HOURLY_HIST_SIZE
    }

    /// The configured rate, or the default if it cannot be used
    pub fn effective_rate(&self) -> u8 {
        if Self::is_valid_rate(self.update_rate) {
            self.update_rate
        } else {
            log::warn!(
                "Update rate {} min not usable, falling back to {DEFAULT_UPDATE_RATE} min",
                self.update_rate
            );
            DEFAULT_UPDATE_RATE
        }
    }
}

/// UTC as a fixed offset, the default counter time zone
pub fn utc() -> FixedOffset {
    Utc.fix()
}

/// Convert Unix seconds to local time in `tz`
pub fn local_time(timestamp: i64, tz: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    tz.timestamp_opt(timestamp, 0).single()
}

/// Bucket index for `time`
///
/// Hour of day for `rate >= 60`, else minute of hour / `rate`. A zero rate
/// maps everything to bucket 0.
pub fn index(time: &DateTime<FixedOffset>, rate: u8) -> usize {
    match rate {
        0 => 0,
        r if r >= 60 => time.hour() as usize,
        r => (time.minute() / r as u32) as usize,
    }
}

/// Outcome of [`History::update_bucket`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketUpdate {
    /// Same bucket as the previous update; delta added
    Accumulated,
    /// Next bucket; overwritten with delta
    Replaced,
    /// Skipped buckets marked missing, then delta written
    GapFilled,
    /// Gap spans the whole window; caller must reset
    Expired,
}

/// Result of [`History::sum`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySum {
    /// Sum of all present buckets, in stored units
    pub sum: i64,
    /// Number of present buckets
    pub bucket_count: usize,
    /// `bucket_count` / expected buckets
    pub quality: f32,
    /// `quality` reached the threshold
    pub valid: bool,
}

/// Circular history of per-bucket deltas
///
/// `None` marks a bucket with no data, which is different from a bucket
/// that saw a zero delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    buckets: Vec<Option<i32>>,
    /// Bucket length in minutes
    rate: u8,
}

impl History {
    pub fn new(capacity: usize, rate: u8) -> Self {
        Self {
            buckets: vec![None; capacity],
            rate,
        }
    }

    pub fn rate(&self) -> u8 {
        self.rate
    }

    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    pub fn buckets(&self) -> &[Option<i32>] {
        &self.buckets
    }

    pub fn get(&self, idx: usize) -> Option<i32> {
        self.buckets.get(idx).copied().flatten()
    }

    /// Mark all buckets missing
    pub fn reset(&mut self) {
        self.buckets.iter_mut().for_each(|b| *b = None);
    }

    /// Change the bucket length; resets the history if it differs
    pub fn set_rate(&mut self, rate: u8) {
        if rate != self.rate {
            self.rate = rate;
            self.reset();
        }
    }

    /// Bucket index for `time`, clamped to the capacity
    pub fn index(&self, time: &DateTime<FixedOffset>) -> usize {
        index(time, self.rate) % self.buckets.len().max(1)
    }

    fn period_secs(&self) -> i64 {
        self.rate as i64 * 60
    }

    /// Time span covered by the full buffer in seconds
    pub fn window_secs(&self) -> i64 {
        self.buckets.len() as i64 * self.period_secs()
    }

    /// Mark the buckets of all periods between `last_update` and `now`
    /// missing. The bucket containing `now` is left alone.
    pub fn mark_missed(&mut self, last_update: i64, now: i64, tz: &FixedOffset) {
        let step = self.period_secs();
        if step == 0 {
            return;
        }
        let mut ts = last_update + step;
        while ts < now {
            if let Some(t) = local_time(ts, tz) {
                let idx = self.index(&t);
                self.buckets[idx] = None;
                log::trace!("hist[{idx}] = missing");
            }
            ts += step;
        }
    }

    /// Store `delta` for the update at `now`.
    ///
    /// `t_delta` is the time since `last_update` in seconds and must not be
    /// negative.
    pub fn update_bucket(
        &mut self,
        now: &DateTime<FixedOffset>,
        delta: i32,
        t_delta: i64,
        last_update: i64,
    ) -> BucketUpdate {
        let idx = self.index(now);
        let tz = now.offset();

        if t_delta / 60 < self.rate as i64 {
            let prev_idx = local_time(last_update, tz).map(|t| self.index(&t));
            let bucket = self.buckets[idx].get_or_insert(0);
            if prev_idx == Some(idx) {
                *bucket = bucket.saturating_add(delta);
                log::trace!("hist[{idx}] = {} (upd)", *bucket);
                BucketUpdate::Accumulated
            } else {
                *bucket = delta;
                log::trace!("hist[{idx}] = {delta} (new)");
                BucketUpdate::Replaced
            }
        } else if t_delta >= self.window_secs() {
            BucketUpdate::Expired
        } else {
            self.mark_missed(last_update, now.timestamp(), tz);
            self.buckets[idx] = Some(delta);
            log::trace!("hist[{idx}] = {delta} (new)");
            BucketUpdate::GapFilled
        }
    }

    /// Number of buckets expected to be present in a full window
    pub fn expected_buckets(&self) -> usize {
        let cap = self.buckets.len();
        if self.rate == 0 || self.rate >= 60 {
            cap
        } else {
            (60 / self.rate as usize).min(cap)
        }
    }

    /// Sum of the present buckets of the current window
    pub fn sum(&self, quality_threshold: f32) -> HistorySum {
        let expected = self.expected_buckets();
        let (sum, bucket_count) = self.buckets[..expected]
            .iter()
            .flatten()
            .fold((0i64, 0usize), |(s, n), v| (s + *v as i64, n + 1));

        let quality = if expected == 0 {
            0.0
        } else {
            bucket_count as f32 / expected as f32
        };

        HistorySum {
            sum,
            bucket_count,
            quality,
            valid: expected > 0 && quality >= quality_threshold,
        }
    }
}

/// Overflow and restart tracking shared by both counters
///
/// `prev` is the last accumulated value; `None` until the first update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct WrapTracker<T> {
    pub acc: T,
    pub prev: Option<T>,
    pub startup_prev: bool,
    pub pre_startup: T,
}

impl<T> WrapTracker<T>
where
    T: Copy + PartialOrd + std::ops::Add<Output = T> + std::ops::AddAssign,
{
    /// Fold a raw reading into the running total and return it.
    ///
    /// A drop in the raw value is either the sensor restarting (startup flag
    /// rising) or the counter wrapping at `max`.
    pub fn accumulate(&mut self, raw: T, startup: bool, max: T) -> T {
        if self.prev.is_none() {
            self.prev = Some(raw);
        }
        let prev = self.prev.unwrap_or(raw);

        if self.acc + raw < prev {
            if !self.startup_prev && startup {
                log::debug!("Sensor restart detected");
                self.acc += self.pre_startup;
            } else {
                log::debug!("Counter overflow detected");
                self.acc += max;
            }
        }
        self.startup_prev = startup;
        self.pre_startup = raw;
        self.acc + raw
    }
}

const STATE_KEY: &str = "state";

/// Load persisted counter state; failures are logged and yield `None`
pub(crate) fn load_state<T: DeserializeOwned>(store: &dyn KeyValueStore, namespace: &str) -> Option<T> {
    match load_json(store, namespace, STATE_KEY) {
        Ok(state) => state,
        Err(e) => {
            log::warn!("[{namespace}] failed to load state, starting fresh: {e}");
            None
        }
    }
}

/// Persist counter state if a store is attached; failures are logged
pub(crate) fn save_state<T: Serialize>(store: &mut Option<Box<dyn KeyValueStore>>, namespace: &str, state: &T) {
    if let Some(store) = store.as_deref_mut() {
        if let Err(e) = save_json(store, namespace, STATE_KEY, state) {
            log::warn!("[{namespace}] failed to save state: {e}");
        }
    }
}
