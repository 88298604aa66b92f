//! # Bresser 5-in-1 Decoder
//!
//! Also used by the Bresser professional rain gauge.
//!
//! ```text
//! [00] .. [12]  inverted copy of [13] .. [25]
//! [13]          number of set bits in [14] .. [25]
//! [14]          id
//! [15]          STARTUP(inverted):1b TYPE:7b
//! [16] [17]     gust (12 bit, 0.1 m/s), [17] high nibble: direction in 22.5° steps
//! [18] [19]     average wind BCD, 0.1 m/s
//! [20] [21]     temperature BCD, 0.1 °C
//! [22]          humidity BCD
//! [23] [24]     rain BCD, 0.1 mm
//! [25]          BATT_LOW:1b ... SIGN:4b
//! ```

use crate::constants::*;
use crate::decoders::{bcd, check_len, claim_slot, hi, lo, DecodeResult, DecoderFlags, MessageDecoder};
use crate::error::DecodeStatus;
use crate::integrity::count_bits;
use crate::sensor::{Payload, SensorType, SlotManager, WeatherData};

const HALF: usize = 13;

#[derive(Debug, Clone, Copy, Default)]
pub struct Bresser5In1Decoder;

impl Bresser5In1Decoder {
    fn is_rain_gauge(type_raw: u8) -> bool {
        (TYPE_5IN1_RAIN_GAUGE_MIN..=TYPE_5IN1_RAIN_GAUGE_MAX).contains(&type_raw)
            || type_raw == TYPE_5IN1_RAIN_GAUGE_LEGACY
    }

    fn try_decode(&self, msg: &[u8], rssi: f32, slots: &mut SlotManager) -> Result<usize, DecodeStatus> {
        check_len(msg, PAYLOAD_SIZE, self.name())?;

        if let Some(col) = (0..HALF).find(|&col| msg[col] ^ msg[col + HALF] != 0xFF) {
            log::debug!("[{}] parity wrong at column {col}", self.name());
            return Err(DecodeStatus::ParityError);
        }

        let bits_set = count_bits(&msg[HALF + 1..PAYLOAD_SIZE]);
        let expected_bits = msg[HALF] as u32;
        if bits_set != expected_bits {
            log::debug!(
                "[{}] checksum wrong: actual [{bits_set:02X}] != expected [{expected_bits:02X}]",
                self.name()
            );
            return Err(DecodeStatus::ChecksumError);
        }

        let id = msg[14] as u32;
        let mut type_raw = msg[15] & 0x7F;
        let slot_idx = claim_slot(slots, id)?;

        let mut temp_raw = (lo(msg[20]) + hi(msg[20]) * 10 + lo(msg[21]) * 100) as i32;
        if lo(msg[25]) != 0 {
            temp_raw = -temp_raw;
        }

        let mut w = WeatherData {
            temp_ok: lo(msg[20]) <= 9,
            temp_c: temp_raw as f32 * 0.1,
            humidity: bcd(msg[22]) as u8,
            wind_direction_deg: (hi(msg[17]) * 225) as f32 * 0.1,
            wind_gust_meter_sec: ((lo(msg[17]) << 8) + msg[16] as u32) as f32 * 0.1,
            wind_avg_meter_sec: (lo(msg[18]) + hi(msg[18]) * 10 + lo(msg[19]) * 100) as f32 * 0.1,
            rain_mm: (bcd(msg[23]) + bcd(msg[24]) * 100) as f32 * 0.1,
            rain_ok: true,
            ..Default::default()
        };

        if Self::is_rain_gauge(type_raw) {
            w.rain_mm *= 2.5;
            type_raw = SENSOR_TYPE_WEATHER0;
            w.humidity_ok = false;
            w.wind_ok = false;
        } else {
            w.wind_ok = true;
            w.humidity_ok = lo(msg[22]) <= 9;
        }

        let slot = slots.get_mut(slot_idx).ok_or(DecodeStatus::Full)?;
        slot.sensor_id = id;
        slot.s_type = SensorType::from(type_raw);
        slot.chan = 0;
        slot.startup = msg[15] & 0x80 == 0;
        slot.battery_ok = msg[25] & 0x80 == 0;
        slot.rssi = rssi;
        slot.valid = true;
        slot.complete = true;
        slot.decoder = self.flag().bits();
        slot.payload = Payload::Weather(w);

        log::debug!("[{}] {}", self.name(), slot);
        Ok(slot_idx)
    }
}

impl MessageDecoder for Bresser5In1Decoder {
    fn decode(&self, msg: &[u8], rssi: f32, slots: &mut SlotManager) -> DecodeResult {
        match self.try_decode(msg, rssi, slots) {
            Ok(idx) => DecodeResult::ok(idx),
            Err(status) => status.into(),
        }
    }

    fn name(&self) -> &'static str {
        "5in1"
    }

    fn flag(&self) -> DecoderFlags {
        DecoderFlags::B5IN1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::hex::hex_to_bytes;

    const MSG: &str = "EAEC7FEB5FEEEFFAFE76BBFAFF 15138014A011100501894405 00";

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    #[test]
    fn test_decode_weather_station() {
        let msg = hex_to_bytes(MSG);
        let mut slots = SlotManager::new(1);
        let r = Bresser5In1Decoder.decode(&msg, -72.5, &mut slots);
        assert_eq!(r, DecodeResult::ok(0));

        let s = slots.get(0).unwrap();
        assert_eq!(s.sensor_id, 0x13);
        assert_eq!(s.s_type, SensorType::Weather0);
        assert_eq!(s.chan, 0);
        assert!(!s.startup);
        assert!(s.battery_ok);
        assert!(s.valid && s.complete);
        assert_eq!(s.rssi, -72.5);
        assert_eq!(s.decoder, DecoderFlags::B5IN1.bits());

        let w = s.weather().unwrap();
        assert!(w.temp_ok && w.humidity_ok && w.wind_ok && w.rain_ok);
        assert!(!w.uv_ok && !w.light_ok);
        assert!(approx(w.temp_c, 10.5));
        assert_eq!(w.humidity, 89);
        assert!(approx(w.wind_direction_deg, 225.0));
        assert!(approx(w.wind_gust_meter_sec, 2.0));
        assert!(approx(w.wind_avg_meter_sec, 1.1));
        assert!(approx(w.rain_mm, 54.4));
    }

    #[test]
    fn test_parity_error() {
        let mut msg = hex_to_bytes(MSG);
        msg[3] ^= 0x01;
        let mut slots = SlotManager::new(1);
        assert_eq!(Bresser5In1Decoder.decode(&msg, 0.0, &mut slots).status, DecodeStatus::ParityError);
        assert!(!slots.get(0).unwrap().valid);
    }

    #[test]
    fn test_bit_count_error() {
        let mut msg = hex_to_bytes(MSG);
        // keep halves complementary but break the bit count
        msg[13] ^= 0x01;
        msg[0] ^= 0x01;
        let mut slots = SlotManager::new(1);
        assert_eq!(Bresser5In1Decoder.decode(&msg, 0.0, &mut slots).status, DecodeStatus::ChecksumError);
    }

    #[test]
    fn test_short_buffer_is_invalid() {
        let msg = hex_to_bytes(MSG);
        let mut slots = SlotManager::new(1);
        assert_eq!(Bresser5In1Decoder.decode(&msg[..20], 0.0, &mut slots).status, DecodeStatus::Invalid);
    }

    #[test]
    fn test_rain_gauge_type_detection() {
        assert!(Bresser5In1Decoder::is_rain_gauge(0x39));
        assert!(Bresser5In1Decoder::is_rain_gauge(0x3B));
        assert!(Bresser5In1Decoder::is_rain_gauge(0x09));
        assert!(!Bresser5In1Decoder::is_rain_gauge(0x3C));
        assert!(!Bresser5In1Decoder::is_rain_gauge(0x00));
    }

    #[test]
    fn test_excluded_id_is_skipped() {
        let msg = hex_to_bytes(MSG);
        let mut slots = SlotManager::new(1);
        slots.set_exclude_ids(vec![0x13]);
        assert_eq!(Bresser5In1Decoder.decode(&msg, 0.0, &mut slots).status, DecodeStatus::Skip);
    }
}
