//! # Receiver Configuration
//!
//! Runtime settings of the [`WeatherSensor`](crate::receiver::WeatherSensor)
//! and their persistent form in a [`KeyValueStore`].
//!
//! ## Stored keys (namespace `BWS-CFG`)
//!
//! | Key | Value |
//! |-----|-------|
//! | `maxsensors` | 1 byte, number of slots |
//! | `ids_inc` | include list, big-endian u32 per id |
//! | `ids_exc` | exclude list, big-endian u32 per id |
//! | `decoders` | 1 byte, [`DecoderFlags`] |
//! | `rxflags` | 1 byte, [`ReceiveFlags`] |
//!
//! An empty id list is stored as four zero bytes. Anything that cannot be
//! read back falls back to its default; loading never fails.

use crate::constants::{DEFAULT_MAX_SENSORS, NVS_NAMESPACE_CONFIG};
use crate::decoders::DecoderFlags;
use crate::error::WeatherError;
use crate::receiver::ReceiveFlags;
use crate::storage::KeyValueStore;

const KEY_MAX_SENSORS: &str = "maxsensors";
const KEY_IDS_INC: &str = "ids_inc";
const KEY_IDS_EXC: &str = "ids_exc";
const KEY_DECODERS: &str = "decoders";
const KEY_RX_FLAGS: &str = "rxflags";

/// Receiver settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    /// Size of the slot pool
    pub max_sensors: u8,
    /// Only these ids are accepted if non-empty
    pub include_ids: Vec<u32>,
    /// These ids are always rejected
    pub exclude_ids: Vec<u32>,
    /// Enabled decoders
    pub decoders: DecoderFlags,
    /// Completion policy for polling
    pub rx_flags: ReceiveFlags,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            max_sensors: DEFAULT_MAX_SENSORS as u8,
            include_ids: Vec::new(),
            exclude_ids: Vec::new(),
            decoders: DecoderFlags::default(),
            rx_flags: ReceiveFlags::default(),
        }
    }
}

/// Encode an id list for storage
pub fn encode_id_list(ids: &[u32]) -> Vec<u8> {
    if ids.is_empty() {
        return vec![0; 4];
    }
    ids.iter().flat_map(|id| id.to_be_bytes()).collect()
}

/// Decode a stored id list.
///
/// Four leading zero bytes mean "empty". A length that is not a multiple of
/// four is treated as corrupt and also yields an empty list.
pub fn decode_id_list(bytes: &[u8]) -> Vec<u32> {
    if bytes.len() < 4 || bytes.len() % 4 != 0 {
        if !bytes.is_empty() {
            log::warn!("Corrupt sensor id list ({} bytes), using empty list", bytes.len());
        }
        return Vec::new();
    }
    if bytes[..4] == [0, 0, 0, 0] {
        return Vec::new();
    }
    bytes
        .chunks_exact(4)
        .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Parse a list of hex ids such as `"39582376, 0x1234"`
pub fn parse_id_list(text: &str) -> Result<Vec<u32>, WeatherError> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            let digits = s.trim_start_matches("0x").trim_start_matches("0X");
            u32::from_str_radix(digits, 16).map_err(|_| WeatherError::InvalidConfig(format!("invalid sensor id '{s}'")))
        })
        .collect()
}

fn read_byte(store: &dyn KeyValueStore, key: &str) -> Option<u8> {
    match store.get(NVS_NAMESPACE_CONFIG, key) {
        Ok(Some(v)) if v.len() == 1 => Some(v[0]),
        Ok(Some(v)) => {
            log::warn!("[{NVS_NAMESPACE_CONFIG}] '{key}' has {} bytes, expected 1", v.len());
            None
        }
        Ok(None) => None,
        Err(e) => {
            log::warn!("[{NVS_NAMESPACE_CONFIG}] failed to read '{key}': {e}");
            None
        }
    }
}

fn read_ids(store: &dyn KeyValueStore, key: &str) -> Option<Vec<u32>> {
    match store.get(NVS_NAMESPACE_CONFIG, key) {
        Ok(v) => v.map(|bytes| decode_id_list(&bytes)),
        Err(e) => {
            log::warn!("[{NVS_NAMESPACE_CONFIG}] failed to read '{key}': {e}");
            None
        }
    }
}

impl ReceiverConfig {
    /// Read the configuration, using defaults for missing or corrupt values
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let defaults = Self::default();
        let max_sensors = match read_byte(store, KEY_MAX_SENSORS) {
            Some(0) => {
                log::warn!("[{NVS_NAMESPACE_CONFIG}] max sensors 0 ignored");
                defaults.max_sensors
            }
            Some(n) => n,
            None => defaults.max_sensors,
        };

        let config = Self {
            max_sensors,
            include_ids: read_ids(store, KEY_IDS_INC).unwrap_or(defaults.include_ids),
            exclude_ids: read_ids(store, KEY_IDS_EXC).unwrap_or(defaults.exclude_ids),
            decoders: read_byte(store, KEY_DECODERS)
                .map(DecoderFlags::from_bits_retain)
                .unwrap_or(defaults.decoders),
            rx_flags: read_byte(store, KEY_RX_FLAGS)
                .map(ReceiveFlags::from_bits_retain)
                .unwrap_or(defaults.rx_flags),
        };
        log::debug!("Receiver configuration: {config:?}");
        config
    }

    /// Write all keys
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), WeatherError> {
        self.validate()?;
        store.put(NVS_NAMESPACE_CONFIG, KEY_MAX_SENSORS, &[self.max_sensors])?;
        store.put(NVS_NAMESPACE_CONFIG, KEY_IDS_INC, &encode_id_list(&self.include_ids))?;
        store.put(NVS_NAMESPACE_CONFIG, KEY_IDS_EXC, &encode_id_list(&self.exclude_ids))?;
        store.put(NVS_NAMESPACE_CONFIG, KEY_DECODERS, &[self.decoders.bits()])?;
        store.put(NVS_NAMESPACE_CONFIG, KEY_RX_FLAGS, &[self.rx_flags.bits()])?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), WeatherError> {
        if self.max_sensors == 0 {
            return Err(WeatherError::InvalidConfig("max_sensors must be at least 1".into()));
        }
        if self.include_ids.contains(&0) || self.exclude_ids.contains(&0) {
            return Err(WeatherError::InvalidConfig("sensor id 0 cannot be stored".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn test_id_list_encoding() {
        assert_eq!(encode_id_list(&[]), vec![0, 0, 0, 0]);
        assert_eq!(encode_id_list(&[0x39582376]), vec![0x39, 0x58, 0x23, 0x76]);
        assert_eq!(decode_id_list(&[0x39, 0x58, 0x23, 0x76, 0, 0, 0, 1]), vec![0x39582376, 1]);
        assert!(decode_id_list(&[0, 0, 0, 0]).is_empty());
        assert!(decode_id_list(&[0, 0, 0, 0, 1, 2, 3, 4]).is_empty());
        assert!(decode_id_list(&[1, 2, 3]).is_empty());
        assert!(decode_id_list(&[1, 2, 3, 4, 5]).is_empty());
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("39582376, 0x1234 ff").unwrap(), vec![0x39582376, 0x1234, 0xFF]);
        assert!(parse_id_list("").unwrap().is_empty());
        assert!(parse_id_list("xyz").is_err());
    }

    #[test]
    fn test_load_defaults_from_empty_store() {
        let store = MemoryStore::new();
        assert_eq!(ReceiverConfig::load(&store), ReceiverConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let mut store = MemoryStore::new();
        let cfg = ReceiverConfig {
            max_sensors: 4,
            include_ids: vec![0x1234, 0xDEADBEEF],
            exclude_ids: vec![],
            decoders: DecoderFlags::B6IN1 | DecoderFlags::B7IN1,
            rx_flags: ReceiveFlags::ALL_SLOTS | ReceiveFlags::COMPLETE,
        };
        cfg.save(&mut store).unwrap();
        assert_eq!(ReceiverConfig::load(&store), cfg);
    }

    #[test]
    fn test_corrupt_values_fall_back() {
        let mut store = MemoryStore::new();
        store.put(NVS_NAMESPACE_CONFIG, KEY_MAX_SENSORS, &[0]).unwrap();
        store.put(NVS_NAMESPACE_CONFIG, KEY_IDS_INC, &[1, 2, 3]).unwrap();
        store.put(NVS_NAMESPACE_CONFIG, KEY_DECODERS, &[1, 2]).unwrap();
        let cfg = ReceiverConfig::load(&store);
        assert_eq!(cfg.max_sensors, DEFAULT_MAX_SENSORS as u8);
        assert!(cfg.include_ids.is_empty());
        assert_eq!(cfg.decoders, DecoderFlags::default());
    }

    #[test]
    fn test_validate() {
        let cfg = ReceiverConfig {
            max_sensors: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(WeatherError::InvalidConfig(_))));
        let cfg = ReceiverConfig {
            include_ids: vec![0],
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
