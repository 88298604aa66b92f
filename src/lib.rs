//! # bresser-rs - A Rust Crate for Bresser Weather Sensor Messages
//!
//! The bresser-rs crate receives and decodes the 868 MHz messages sent by
//! Bresser weather sensors (5-in-1, 6-in-1, 7-in-1/8-in-1 stations, soil,
//! thermo/hygro, air quality, lightning and water leakage sensors) and keeps
//! the most recent reading of each sensor in a fixed pool of slots.
//!
//! ## Features
//!
//! - Decoders for all Bresser message families with their integrity checks
//!   (complement/parity, LFSR digest, additive checksum, CRC16)
//! - Slot pool with include/exclude sensor id filters
//! - Receive loop with configurable completion policy over a [`Radio`] trait
//! - Rolling rain gauge and lightning statistics (past hour, past 24 h,
//!   day/week/month) with overflow and sensor restart handling
//! - Persistent configuration and counter state via [`KeyValueStore`]
//! - Derived weather values (dew point, wind chill, heat index, humidex,
//!   Beaufort scale, compass direction)
//! - Logging through the `log` facade, optional `tracing` spans
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! bresser-rs = "0.3.0"
//! ```
//!
//! ```rust
//! use bresser_rs::{DecodeStatus, MockRadio, PacketReadyFlag, WeatherSensor};
//!
//! let flag = PacketReadyFlag::new();
//! let mut radio = MockRadio::new(flag.clone());
//! radio
//!     .push_hex("D4 C7703597040857700000000000000000 03FFFFFFFFFFFFFFFFFF", -70.0)
//!     .unwrap();
//!
//! let mut ws = WeatherSensor::new(radio, flag);
//! assert_eq!(ws.get_message(), DecodeStatus::Ok);
//! assert_eq!(ws.slots()[0].sensor_id, 0x35970408);
//! ```

pub mod config;
pub mod constants;
pub mod counters;
pub mod decoders;
pub mod error;
pub mod integrity;
pub mod logging;
pub mod receiver;
pub mod sensor;
pub mod storage;
pub mod util;

pub use crate::error::{DecodeStatus, RadioError, StorageError, WeatherError};
pub use crate::logging::{init_logger_with_default, log_info};

// Receiving
pub use config::ReceiverConfig;
pub use decoders::{dispatch, DecodeResult, DecoderFlags, MessageDecoder};
pub use receiver::{MockRadio, PacketReadyFlag, Radio, ReceiveFlags, ReceiveStats, WeatherSensor};

// Sensor data
pub use sensor::{Payload, Reading, SensorType, SlotManager};

// Rolling counters
pub use counters::{CounterConfig, HistorySum, Lightning, LightningEvent, RainGauge, ResetFlags};

// Persistence
pub use storage::{FileStore, KeyValueStore, MemoryStore};
