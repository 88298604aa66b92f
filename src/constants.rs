//! Bresser Protocol Constants
//!
//! This module defines constants used by the Bresser weather sensor message
//! decoders, the slot manager and the rolling counters.

// ----------------------------------------------------------------------------
// Message framing
// ----------------------------------------------------------------------------

/// Size of a raw receive buffer including the leading preamble byte
pub const MSG_BUF_SIZE: usize = 27;

/// Size of the payload handed to the decoders (preamble removed)
pub const PAYLOAD_SIZE: usize = MSG_BUF_SIZE - 1;

/// Last sync/preamble byte which must lead every receive buffer
pub const PREAMBLE_BYTE: u8 = 0xD4;

/// XOR whitening constant used by 7-in-1 and lightning messages
pub const WHITENING_BYTE: u8 = 0xAA;

// ----------------------------------------------------------------------------
// Integrity parameters
// ----------------------------------------------------------------------------

/// LFSR generator shared by all digest protected formats
pub const LFSR_GENERATOR: u16 = 0x8810;

/// LFSR key for 6-in-1 messages
pub const LFSR_KEY_6IN1: u16 = 0x5412;

/// LFSR key for 7-in-1 messages
pub const LFSR_KEY_7IN1: u16 = 0xBA95;

/// Expected digest XOR result for 7-in-1 messages
pub const DIGEST_XOR_7IN1: u16 = 0x6DF1;

/// LFSR key for lightning messages
pub const LFSR_KEY_LIGHTNING: u16 = 0xABF9;

/// Expected digest XOR result for lightning messages
pub const DIGEST_XOR_LIGHTNING: u16 = 0x899E;

/// CRC16 polynomial (CCITT/XMODEM) for leakage messages
pub const CRC16_POLY: u16 = 0x1021;

/// CRC16 initial value for leakage messages
pub const CRC16_INIT: u16 = 0x0000;

// ----------------------------------------------------------------------------
// Sensor types (as transmitted)
// ----------------------------------------------------------------------------

/// Weather station, 5-in-1 professional rain gauge folds into this type
pub const SENSOR_TYPE_WEATHER0: u8 = 0;
/// Weather station (6-in-1/7-in-1)
pub const SENSOR_TYPE_WEATHER1: u8 = 1;
/// Thermo-/hygrometer
pub const SENSOR_TYPE_THERMO_HYGRO: u8 = 2;
/// Pool/spa thermometer
pub const SENSOR_TYPE_POOL_THERMO: u8 = 3;
/// Soil temperature and moisture
pub const SENSOR_TYPE_SOIL: u8 = 4;
/// Water leakage
pub const SENSOR_TYPE_LEAKAGE: u8 = 5;
/// Air quality, particulate matter
pub const SENSOR_TYPE_AIR_PM: u8 = 8;
/// Lightning sensor
pub const SENSOR_TYPE_LIGHTNING: u8 = 9;
/// Air quality, CO2
pub const SENSOR_TYPE_CO2: u8 = 10;
/// Air quality, HCHO and VOC
pub const SENSOR_TYPE_HCHO_VOC: u8 = 11;
/// Weather station with globe thermometer (8-in-1)
pub const SENSOR_TYPE_WEATHER2: u8 = 13;

/// 5-in-1 type byte range marking the professional rain gauge
pub const TYPE_5IN1_RAIN_GAUGE_MIN: u8 = 0x39;
pub const TYPE_5IN1_RAIN_GAUGE_MAX: u8 = 0x3B;
/// Legacy type value for the professional rain gauge
pub const TYPE_5IN1_RAIN_GAUGE_LEGACY: u8 = 0x09;

/// Soil moisture lookup, indexed by the transmitted value minus one
pub const SOIL_MOISTURE_MAP: [u8; 16] = [0, 7, 13, 20, 27, 33, 40, 47, 53, 60, 67, 73, 80, 87, 93, 99];

// ----------------------------------------------------------------------------
// Receiver defaults
// ----------------------------------------------------------------------------

/// Default number of sensor slots
pub const DEFAULT_MAX_SENSORS: usize = 1;

/// Default enabled decoder mask (all)
pub const DEFAULT_DECODERS: u8 = 0xFF;

// ----------------------------------------------------------------------------
// Rolling counters
// ----------------------------------------------------------------------------

/// Capacity of the past-hour history
pub const HOURLY_HIST_SIZE: usize = 10;

/// Capacity of the past-24h history
pub const DAILY_HIST_SIZE: usize = 24;

/// Default bucket length in minutes
pub const DEFAULT_UPDATE_RATE: u8 = 6;

/// Default fraction of valid buckets required for a valid aggregate
pub const DEFAULT_QUALITY_THRESHOLD: f32 = 0.8;

/// Default rain gauge wrap value in mm
pub const DEFAULT_RAINGAUGE_MAX: f32 = 100_000.0;

/// Lightning counter wrap seen on sensors with the extended BCD digit
pub const LIGHTNING_COUNT_MAX_1600: u16 = 1600;

/// Storage namespace for rain gauge state
pub const NVS_NAMESPACE_RAIN: &str = "BWS-RAIN";

/// Storage namespace for lightning state
pub const NVS_NAMESPACE_LIGHTNING: &str = "BWS-LGT";

/// Storage namespace for receiver configuration
pub const NVS_NAMESPACE_CONFIG: &str = "BWS-CFG";
