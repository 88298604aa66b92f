//! # Rain Gauge Statistics
//!
//! Derives rainfall for the past hour, the past 24 hours and the current
//! day, week and month from the raw rain counter of a weather sensor.
//!
//! The raw counter wraps at a sensor specific maximum (for instance 100 mm
//! on some 6-in-1 stations) and restarts at zero after a battery change. An
//! accumulator keeps the total monotonic across both events.
//!
//! ## Usage
//!
//! ```rust
//! use bresser_rs::counters::{CounterConfig, RainGauge};
//!
//! let mut rain = RainGauge::new(100.0, CounterConfig::default());
//! rain.update(1_704_067_200, 10.0, false);
//! rain.update(1_704_067_200 + 360, 10.1, false);
//! assert!((rain.past_hour().rain_mm - 0.1).abs() < 0.01);
//! ```

use bitflags::bitflags;
use chrono::{Datelike, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::constants::{DAILY_HIST_SIZE, HOURLY_HIST_SIZE, NVS_NAMESPACE_RAIN};
use crate::counters::{load_state, local_time, save_state, utc, BucketUpdate, CounterConfig, History, WrapTracker};
use crate::storage::KeyValueStore;

bitflags! {
    /// Parts of the rain gauge state cleared by [`RainGauge::reset`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResetFlags: u8 {
        /// Past hour and past 24 h histories
        const HOUR = 0x01;
        const DAY = 0x02;
        const WEEK = 0x04;
        const MONTH = 0x08;
    }
}

/// Counter value captured at the start of a calendar period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Baseline {
    /// Day of week (0 = Sunday) or month (0 = January) it was taken in
    marker: u32,
    rain_mm: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RainState {
    last_update: Option<i64>,
    counter: WrapTracker<f32>,
    hist: History,
    hist_24h: History,
    day: Option<Baseline>,
    week: Option<Baseline>,
    month: Option<Baseline>,
    wday_prev: Option<u32>,
}

impl RainState {
    fn new(rate: u8) -> Self {
        Self {
            last_update: None,
            counter: WrapTracker::default(),
            hist: History::new(HOURLY_HIST_SIZE, rate),
            hist_24h: History::new(DAILY_HIST_SIZE, 60),
            day: None,
            week: None,
            month: None,
            wday_prev: None,
        }
    }
}

/// Rainfall over a trailing window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RainfallSum {
    pub rain_mm: f32,
    /// Buckets with data
    pub bucket_count: usize,
    /// Fraction of buckets with data
    pub quality: f32,
    /// Enough buckets carry data for `rain_mm` to be trusted
    pub valid: bool,
}

/// Rain statistics for one rain gauge
#[derive(Debug)]
pub struct RainGauge {
    state: RainState,
    raingauge_max: f32,
    quality_threshold: f32,
    tz: FixedOffset,
    store: Option<Box<dyn KeyValueStore>>,
}

impl RainGauge {
    /// Create a rain gauge whose raw counter wraps at `raingauge_max` mm
    pub fn new(raingauge_max: f32, config: CounterConfig) -> Self {
        Self {
            state: RainState::new(config.effective_rate()),
            raingauge_max,
            quality_threshold: config.quality_threshold,
            tz: utc(),
            store: None,
        }
    }

    /// Use `tz` for day/week/month boundaries and hour buckets
    pub fn with_timezone(mut self, tz: FixedOffset) -> Self {
        self.tz = tz;
        self
    }

    /// Attach a persistent store and load any saved state from it
    pub fn with_store(mut self, store: Box<dyn KeyValueStore>) -> Self {
        if let Some(saved) = load_state::<RainState>(&*store, NVS_NAMESPACE_RAIN) {
            let rate = self.state.hist.rate();
            self.state = saved;
            self.state.hist.set_rate(rate);
            log::debug!("[{NVS_NAMESPACE_RAIN}] state restored, last update {:?}", self.state.last_update);
        }
        self.store = Some(store);
        self
    }

    /// Detach the persistent store
    pub fn into_store(self) -> Option<Box<dyn KeyValueStore>> {
        self.store
    }

    fn save(&mut self) {
        save_state(&mut self.store, NVS_NAMESPACE_RAIN, &self.state);
    }

    /// Set the raw counter wrap value in mm
    pub fn set_max(&mut self, raingauge_max: f32) {
        self.raingauge_max = raingauge_max;
    }

    pub fn max(&self) -> f32 {
        self.raingauge_max
    }

    /// Change the past hour bucket length in minutes.
    ///
    /// An unusable rate falls back to the default. The past hour history is
    /// cleared if the rate actually changes.
    pub fn set_update_rate(&mut self, rate: u8) {
        let rate = CounterConfig {
            update_rate: rate,
            quality_threshold: self.quality_threshold,
        }
        .effective_rate();
        self.state.hist.set_rate(rate);
        self.save();
    }

    pub fn update_rate(&self) -> u8 {
        self.state.hist.rate()
    }

    /// Clear the selected parts of the state.
    ///
    /// Clearing everything also forgets the raw counter tracking, so the next
    /// update starts from scratch.
    pub fn reset(&mut self, flags: ResetFlags) {
        if flags.contains(ResetFlags::HOUR) {
            self.state.hist.reset();
            self.state.hist_24h.reset();
        }
        if flags.contains(ResetFlags::DAY) {
            self.state.day = None;
        }
        if flags.contains(ResetFlags::WEEK) {
            self.state.week = None;
        }
        if flags.contains(ResetFlags::MONTH) {
            self.state.month = None;
        }
        if flags.contains(ResetFlags::all()) {
            self.state.counter = WrapTracker::default();
        }
        self.save();
    }

    /// Feed a raw rain counter value (mm) received at `timestamp`.
    ///
    /// `startup` is the sensor's startup flag from the same message.
    pub fn update(&mut self, timestamp: i64, rain_mm: f32, startup: bool) {
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

        let prev = self.state.counter.prev.unwrap_or(rain_mm);
        let curr = self.state.counter.accumulate(rain_mm, startup, self.raingauge_max);
        let rain_delta = curr - prev;
        log::debug!("rain_delta: {rain_delta:.1}");

        let wday = t.weekday().num_days_from_sunday();
        if self.state.wday_prev.is_none() {
            self.state.wday_prev = Some(wday);
        }


        let delta = (rain_delta * 100.0).round() as i32;
        for hist in [&mut self.state.hist, &mut self.state.hist_24h] {
            if hist.update_bucket(&t, delta, t_delta, last_update) == BucketUpdate::Expired {
                log::warn!("History time frame expired, resetting!");
                hist.reset();
            }
        }

        if self.state.day.map(|b| b.marker) != Some(wday) {
            self.state.day = Some(Baseline { marker: wday, rain_mm: curr });
        }
        if (wday == 1 && self.state.wday_prev == Some(0)) || self.state.week.is_none() {
            self.state.week = Some(Baseline { marker: wday, rain_mm: curr });
        }
        self.state.wday_prev = Some(wday);

        let month = t.month0();
        if self.state.month.map(|b| b.marker) != Some(month) {
            self.state.month = Some(Baseline { marker: month, rain_mm: curr });
        }

        self.state.last_update = Some(timestamp);
        self.state.counter.prev = Some(curr);
        self.save();
    }

    /// Timestamp of the last accepted update
    pub fn last_update(&self) -> Option<i64> {
        self.state.last_update
    }

    /// Accumulated total in mm, corrected for overflows and restarts
    pub fn total(&self) -> Option<f32> {
        self.state.counter.prev
    }

    fn rainfall(&self, hist: &History) -> RainfallSum {
        let s = hist.sum(self.quality_threshold);
        RainfallSum {
            rain_mm: s.sum as f32 * 0.01,
            bucket_count: s.bucket_count,
            quality: s.quality,
            valid: s.valid,
        }
    }

    /// Rainfall during the past 60 minutes
    pub fn past_hour(&self) -> RainfallSum {
        self.rainfall(&self.state.hist)
    }

    /// Rainfall during the past 24 hours
    pub fn past_24h(&self) -> RainfallSum {
        self.rainfall(&self.state.hist_24h)
    }

    fn since(&self, baseline: Option<Baseline>) -> Option<f32> {
        let curr = self.state.counter.prev?;
        baseline.map(|b| curr - b.rain_mm)
    }

    /// Rainfall since the start of the current day
    pub fn current_day(&self) -> Option<f32> {
        self.since(self.state.day)
    }

    /// Rainfall since the start of the current week (Monday)
    pub fn current_week(&self) -> Option<f32> {
        self.since(self.state.week)
    }

    /// Rainfall since the start of the current month
    pub fn current_month(&self) -> Option<f32> {
        self.since(self.state.month)
    }

    /// Raw past hour history in 1/100 mm
    pub fn history(&self) -> &History {
        &self.state.hist
    }
}
