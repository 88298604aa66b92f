//! # Weather Sensor Receiver
//!
//! Ties a radio front-end to the decoders and the slot pool.
//!
//! The radio signals "packet ready" through a [`PacketReadyFlag`], typically
//! from an interrupt handler or a reader thread. [`WeatherSensor::get_message`]
//! clears the flag before reading the buffer so a packet arriving during
//! decoding raises it again instead of getting lost.
//!
//! ## Usage
//!
//! ```rust
//! use std::time::Duration;
//! use bresser_rs::receiver::{MockRadio, PacketReadyFlag, WeatherSensor};
//!
//! let flag = PacketReadyFlag::new();
//! let mut radio = MockRadio::new(flag.clone());
//! radio.push_hex("D4 C7703597040857700000000000000000 03FFFFFFFFFFFFFFFFFF", -71.0).unwrap();
//!
//! let mut ws = WeatherSensor::new(radio, flag);
//! assert!(ws.poll(Duration::from_millis(100)));
//! println!("{}", ws.slots()[0]);
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bitflags::bitflags;

use crate::config::ReceiverConfig;
use crate::constants::*;
use crate::decoders::{dispatch, DecoderFlags};
use crate::error::{DecodeStatus, RadioError, WeatherError};
use crate::sensor::{
    LeakageData, LightningData, Payload, PmData, Reading, SensorType, SlotManager, SoilData, WeatherData,
};
use crate::util::hex::parse_hex_lenient;
use crate::util::logging::{log_message_hex, LogThrottle};

bitflags! {
    /// Completion policy of [`WeatherSensor::get_data`]
    ///
    /// An empty set returns as soon as any slot is valid.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ReceiveFlags: u8 {
        /// Require the slot to be complete
        const COMPLETE = 0x01;
        /// Require a slot of the requested sensor type
        const TYPE = 0x02;
        /// Require every slot to be valid and complete
        const ALL_SLOTS = 0x08;
    }
}

impl Default for ReceiveFlags {
    fn default() -> Self {
        ReceiveFlags::COMPLETE
    }
}

/// Radio front-end delivering raw message buffers
pub trait Radio: Send {
    /// Copy the pending message into `buf`, returning its length
    fn read_data(&mut self, buf: &mut [u8]) -> Result<usize, RadioError>;

    /// Signal strength of the last message in dBm
    fn rssi(&self) -> f32;
}

/// "Packet ready" signal shared between the radio and the receiver
#[derive(Debug, Clone, Default)]
pub struct PacketReadyFlag(Arc<AtomicBool>);

impl PacketReadyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag; safe to call from another thread
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Check and clear in one step
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Radio replaying queued messages
///
/// Every queued message raises the packet ready flag, mimicking the receive
/// interrupt of real hardware.
#[derive(Debug, Default)]
pub struct MockRadio {
    queue: VecDeque<(Vec<u8>, f32)>,
    rssi: f32,
    flag: PacketReadyFlag,
    next_error: Option<RadioError>,
}

impl MockRadio {
    pub fn new(flag: PacketReadyFlag) -> Self {
        Self {
            flag,
            ..Default::default()
        }
    }

    /// Queue a raw buffer (including the preamble byte)
    pub fn push(&mut self, data: Vec<u8>, rssi: f32) {
        self.queue.push_back((data, rssi));
        self.flag.set();
    }

    /// Queue a buffer given as hex text
    pub fn push_hex(&mut self, hex: &str, rssi: f32) -> Result<(), WeatherError> {
        let data = parse_hex_lenient(hex)?;
        self.push(data, rssi);
        Ok(())
    }

    /// Fail the next read with `err`
    pub fn fail_next(&mut self, err: RadioError) {
        self.next_error = Some(err);
        self.flag.set();
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl Radio for MockRadio {
    fn read_data(&mut self, buf: &mut [u8]) -> Result<usize, RadioError> {
        if let Some(err) = self.next_error.take() {
            if !self.queue.is_empty() {
                self.flag.set();
            }
            return Err(err);
        }
        let Some((data, rssi)) = self.queue.pop_front() else {
            return Ok(0);
        };
        if buf.len() < data.len() {
            return Err(RadioError::BufferTooSmall(buf.len()));
        }
        buf[..data.len()].copy_from_slice(&data);
        self.rssi = rssi;
        if !self.queue.is_empty() {
            self.flag.set();
        }
        Ok(data.len())
    }

    fn rssi(&self) -> f32 {
        self.rssi
    }
}

/// Receive counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveStats {
    /// Buffers read from the radio
    pub received: u32,
    pub ok: u32,
    pub invalid: u32,
    pub skipped: u32,
    pub full: u32,
    /// Buffers without the 0xD4 preamble
    pub bad_preamble: u32,
    pub radio_errors: u32,
}

impl ReceiveStats {
    fn record(&mut self, status: DecodeStatus) {
        match status {
            DecodeStatus::Ok => self.ok += 1,
            DecodeStatus::Skip => self.skipped += 1,
            DecodeStatus::Full => self.full += 1,
            _ => self.invalid += 1,
        }
    }
}

/// Bresser weather sensor receiver
#[derive(Debug)]
pub struct WeatherSensor<R: Radio> {
    radio: R,
    ready: PacketReadyFlag,
    slots: SlotManager,
    decoders: DecoderFlags,
    rx_flags: ReceiveFlags,
    rx_type: SensorType,
    rssi: f32,
    stats: ReceiveStats,
    full_log: LogThrottle,
    invalid_log: LogThrottle,
    last_slot: Option<usize>,
}

impl<R: Radio> WeatherSensor<R> {
    /// Receiver with the default configuration
    pub fn new(radio: R, ready: PacketReadyFlag) -> Self {
        Self::with_config(radio, ready, &ReceiverConfig::default())
    }

    pub fn with_config(radio: R, ready: PacketReadyFlag, config: &ReceiverConfig) -> Self {
        let mut ws = Self {
            radio,
            ready,
            slots: SlotManager::new(DEFAULT_MAX_SENSORS),
            decoders: DecoderFlags::default(),
            rx_flags: ReceiveFlags::default(),
            rx_type: SensorType::Weather1,
            rssi: 0.0,
            stats: ReceiveStats::default(),
            full_log: LogThrottle::new(10_000, 3),
            invalid_log: LogThrottle::new(1_000, 5),
            last_slot: None,
        };
        ws.apply_config(config);
        ws
    }

    /// Apply slot count, filters, decoders and receive flags
    pub fn apply_config(&mut self, config: &ReceiverConfig) {
        self.set_max_sensors(config.max_sensors as usize);
        self.slots.set_include_ids(config.include_ids.clone());
        self.slots.set_exclude_ids(config.exclude_ids.clone());
        self.decoders = config.decoders;
        self.rx_flags = config.rx_flags;
    }

    /// Current settings as a storable configuration
    pub fn config(&self) -> ReceiverConfig {
        ReceiverConfig {
            max_sensors: self.slots.len().min(u8::MAX as usize) as u8,
            include_ids: self.slots.include_ids().to_vec(),
            exclude_ids: self.slots.exclude_ids().to_vec(),
            decoders: self.decoders,
            rx_flags: self.rx_flags,
        }
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn slots(&self) -> &[Reading] {
        self.slots.slots()
    }

    pub fn slot_manager(&self) -> &SlotManager {
        &self.slots
    }

    /// RSSI of the last received buffer
    pub fn rssi(&self) -> f32 {
        self.rssi
    }

    /// Slot written by the most recent successful decode
    pub fn last_decoded(&self) -> Option<&Reading> {
        self.last_slot.and_then(|i| self.slots.get(i))
    }

    pub fn stats(&self) -> ReceiveStats {
        self.stats
    }

    /// Zero the receive counters
    pub fn reset_status(&mut self) {
        self.stats = ReceiveStats::default();
    }

    pub fn decoders(&self) -> DecoderFlags {
        self.decoders
    }

    pub fn set_decoders(&mut self, decoders: DecoderFlags) {
        self.decoders = decoders;
    }

    pub fn rx_flags(&self) -> ReceiveFlags {
        self.rx_flags
    }

    /// Completion policy and sensor type used by [`poll`](Self::poll)
    pub fn set_rx_flags(&mut self, flags: ReceiveFlags, s_type: SensorType) {
        self.rx_flags = flags;
        self.rx_type = s_type;
    }

    /// Resize the slot pool. Readings in the kept slots survive.
    pub fn set_max_sensors(&mut self, max_sensors: usize) {
        if max_sensors == 0 {
            log::warn!("Ignoring slot pool size 0");
            return;
        }
        self.slots.resize(max_sensors);
    }

    pub fn include_ids(&self) -> &[u32] {
        self.slots.include_ids()
    }

    pub fn set_include_ids(&mut self, ids: Vec<u32>) {
        self.slots.set_include_ids(ids);
    }

    pub fn exclude_ids(&self) -> &[u32] {
        self.slots.exclude_ids()
    }

    pub fn set_exclude_ids(&mut self, ids: Vec<u32>) {
        self.slots.set_exclude_ids(ids);
    }

    /// Invalidate all slots, or those holding one sensor type
    pub fn clear_slots(&mut self, s_type: Option<SensorType>) {
        self.slots.clear(s_type);
    }

    pub fn find_id(&self, id: u32) -> Option<usize> {
        self.slots.find_id(id)
    }

    /// First valid slot of `s_type`, optionally on channel `chan`
    pub fn find_type(&self, s_type: SensorType, chan: Option<u8>) -> Option<usize> {
        self.slots.find_type(s_type, chan)
    }

    /// Decode a message with the preamble already removed
    pub fn decode_message(&mut self, msg: &[u8], rssi: f32) -> DecodeStatus {
        let result = dispatch(msg, rssi, &mut self.slots, self.decoders);
        self.last_slot = result.slot;
        match result.status {
            DecodeStatus::Ok => {
                if let Some(slot) = result.slot.and_then(|i| self.slots.get(i)) {
                    log::debug!("{slot}");
                }
            }
            DecodeStatus::Full => {
                let dropped = self.full_log.suppressed();
                crate::log_warn_throttled!(
                    self.full_log,
                    "No free slot for sensor ({} slots, {} messages dropped)",
                    self.slots.len(),
                    dropped
                );
            }
            DecodeStatus::Skip => {}
            status => {
                crate::log_debug_throttled!(self.invalid_log, "Message not decoded: {status}");
            }
        }
        result.status
    }

    /// One non-blocking receive cycle.
    ///
    /// Returns `Invalid` without touching the radio if no packet is pending.
    pub fn get_message(&mut self) -> DecodeStatus {
        if !self.ready.take() {
            return DecodeStatus::Invalid;
        }

        let mut buf = [0u8; MSG_BUF_SIZE];
        let len = match self.radio.read_data(&mut buf) {
            Ok(0) => return DecodeStatus::Invalid,
            Ok(len) => len,
            Err(e) => {
                self.stats.radio_errors += 1;
                log::debug!("Receive failed: {e}");
                return DecodeStatus::Invalid;
            }
        };
        self.rssi = self.radio.rssi();
        self.stats.received += 1;

        if buf[0] != PREAMBLE_BYTE {
            self.stats.bad_preamble += 1;
            log::trace!("Unexpected preamble [{:02X}]", buf[0]);
            return DecodeStatus::Invalid;
        }
        log_message_hex("Data", &buf[..len]);
        log::debug!("R [{:02X}] RSSI: {:.1}", buf[0], self.rssi);

        let status = self.decode_message(&buf[1..], self.rssi);
        self.stats.record(status);
        status
    }

    /// True if the slots satisfy `flags` (and `s_type` with `TYPE`).
    ///
    /// With `TYPE` set, slots of other types never satisfy the request on
    /// their own.
    pub fn data_ready(&self, flags: ReceiveFlags, s_type: SensorType) -> bool {
        let mut all_valid = true;
        let mut all_complete = true;

        for slot in self.slots.slots() {
            if !slot.valid {
                all_valid = false;
                continue;
            }
            if flags.is_empty() {
                return true;
            }
            if flags.contains(ReceiveFlags::TYPE) && slot.s_type == s_type {
                if slot.complete || !flags.contains(ReceiveFlags::COMPLETE) {
                    return true;
                }
            } else if flags.contains(ReceiveFlags::ALL_SLOTS) {
                all_complete &= slot.complete;
            } else if !flags.contains(ReceiveFlags::TYPE) && slot.complete {
                return true;
            }
        }

        flags.contains(ReceiveFlags::ALL_SLOTS) && all_valid && all_complete
    }

    /// Receive until the slots satisfy `flags` or `timeout` elapses
    pub fn get_data(&mut self, timeout: Duration, flags: ReceiveFlags, s_type: SensorType) -> bool {
        self.get_data_with(timeout, flags, s_type, || {})
    }

    /// Like [`get_data`](Self::get_data), calling `on_cycle` after every
    /// receive attempt
    pub fn get_data_with<F: FnMut()>(
        &mut self,
        timeout: Duration,
        flags: ReceiveFlags,
        s_type: SensorType,
        mut on_cycle: F,
    ) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            let pending = self.ready.is_set();
            let status = self.get_message();
            on_cycle();

            if status == DecodeStatus::Ok && self.data_ready(flags, s_type) {
                return true;
            }
            if !pending {
                std::thread::yield_now();
            }
        }
        log::debug!("get_data timed out after {timeout:?}");
        false
    }

    /// [`get_data`](Self::get_data) with the configured receive flags
    pub fn poll(&mut self, timeout: Duration) -> bool {
        self.get_data(timeout, self.rx_flags, self.rx_type)
    }

    /// Fill slot `index` with a synthetic reading
    pub fn gen_message(
        &mut self,
        index: usize,
        id: u32,
        s_type: SensorType,
        chan: u8,
        startup: bool,
    ) -> Result<(), WeatherError> {
        let size = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(WeatherError::SlotOutOfRange { index, size })?;

        slot.sensor_id = id;
        slot.s_type = s_type;
        slot.chan = chan;
        slot.startup = startup;
        slot.battery_ok = true;
        slot.rssi = 88.8;
        slot.valid = true;
        slot.complete = true;
        slot.payload = match s_type {
            SensorType::Weather0 | SensorType::Weather1 => Payload::Weather(WeatherData {
                temp_ok: true,
                temp_c: 22.2,
                humidity_ok: true,
                humidity: 55,
                wind_ok: true,
                wind_direction_deg: 111.1,
                wind_gust_meter_sec: 4.4,
                wind_avg_meter_sec: 3.3,
                rain_ok: true,
                rain_mm: 9.9,
                ..Default::default()
            }),
            SensorType::Lightning => Payload::Lightning(LightningData {
                strike_count: 42,
                distance_km: 22,
                ..Default::default()
            }),
            SensorType::Leakage => Payload::Leakage(LeakageData { alarm: false }),
            SensorType::Soil => Payload::Soil(SoilData {
                temp_c: 7.7,
                moisture: 50,
            }),
            SensorType::AirPm => Payload::ParticulateMatter(PmData {
                pm_2_5: 1234,
                pm_10: 1567,
                ..Default::default()
            }),
            _ => Payload::default(),
        };
        Ok(())
    }
}
