//! # Bresser 7-in-1 Decoder
//!
//! 7-in-1 and 8-in-1 weather stations plus the air quality sensors
//! (PM2.5/PM10, CO2, HCHO/VOC).
//!
//! Everything after the digest is whitened with 0xAA, except that the
//! TYPE/STARTUP/CH byte is read raw. The digest is LFSR-16 (generator
//! 0x8810, key 0xBA95) over de-whitened bytes 2..25, XORed with the
//! embedded digest; the result must equal 0x6DF1.
//!
//! ```text
//! Weather: DIGEST:8h8h ID:8h8h WDIR:8h4h ?4h STYPE:4h STARTUP:1b CH:3d
//!          WGUST:8h.4h WAVG:4h8h.4h RAIN:8h8h8h.4h? ?8h TEMP:8h.4h FLAGS:4h
//!          HUM:8h LIGHT:8h8h8h UV:8h.4h TGLOBE:8h.4h
//! ```
//!
//! Air quality sensors send all-F BCD digits in their first packets while
//! warming up; those fields are flagged as `*_init`.

use crate::constants::*;
use crate::decoders::{bcd, be16, check_len, claim_slot, hi, lo, DecodeResult, DecoderFlags, MessageDecoder};
use crate::error::DecodeStatus;
use crate::integrity::lfsr_digest16;
use crate::sensor::{Co2Data, Payload, PmData, SensorType, SlotManager, VocData, WeatherData};
use crate::util::logging::{log_integrity_result, log_message_hex};

const MIN_LEN: usize = 25;

#[derive(Debug, Clone, Copy, Default)]
pub struct Bresser7In1Decoder;

impl Bresser7In1Decoder {
    fn weather(w: &[u8], s_type: u8) -> WeatherData {
        let wdir = hi(w[4]) * 100 + lo(w[4]) * 10 + hi(w[5]);
        let gust_raw = hi(w[7]) * 100 + lo(w[7]) * 10 + hi(w[8]);
        let wavg_raw = lo(w[8]) * 100 + hi(w[9]) * 10 + lo(w[9]);
        let rain_raw = bcd(w[10]) * 10_000 + bcd(w[11]) * 100 + bcd(w[12]);

        let temp_raw = (hi(w[14]) * 100 + lo(w[14]) * 10 + hi(w[15])) as i32;
        // negative temperatures are sent as 1000 - |t|
        let temp_c = if temp_raw > 600 { temp_raw - 1000 } else { temp_raw } as f32 * 0.1;

        let light_raw = bcd(w[17]) * 10_000 + bcd(w[18]) * 100 + bcd(w[19]);
        let uv_raw = hi(w[20]) * 100 + lo(w[20]) * 10 + hi(w[21]);

        let mut data = WeatherData {
            temp_ok: true,
            humidity_ok: true,
            wind_ok: true,
            rain_ok: true,
            light_ok: true,
            uv_ok: true,
            temp_c,
            humidity: bcd(w[16]) as u8,
            wind_direction_deg: wdir as f32,
            wind_gust_meter_sec: gust_raw as f32 * 0.1,
            wind_avg_meter_sec: wavg_raw as f32 * 0.1,
            rain_mm: rain_raw as f32 * 0.1,
            light_lux: light_raw as f32,
            light_klx: light_raw as f32 * 0.001,
            uv: uv_raw as f32 * 0.1,
            ..Default::default()
        };

        if s_type == SENSOR_TYPE_WEATHER2 {
            data.tglobe_ok = hi(w[23]) < 10;
            data.tglobe_c = bcd(w[22]) as f32 + hi(w[23]) as f32 * 0.1;
        }
        data
    }

    fn particulate_matter(w: &[u8]) -> PmData {
        PmData {
            pm_1_0: (lo(w[8]) * 1000 + hi(w[9]) * 100 + lo(w[9]) * 10 + hi(w[10])) as u16,
            pm_2_5: (lo(w[10]) * 1000 + hi(w[11]) * 100 + lo(w[11]) * 10 + hi(w[12])) as u16,
            pm_10: (lo(w[12]) * 1000 + hi(w[13]) * 100 + lo(w[13]) * 10 + hi(w[14])) as u16,
            pm_1_0_init: hi(w[10]) == 0x0F,
            pm_2_5_init: hi(w[12]) == 0x0F,
            pm_10_init: hi(w[14]) == 0x0F,
        }
    }

    fn four_digits(w: &[u8]) -> u16 {
        (bcd(w[4]) * 100 + bcd(w[5])) as u16
    }

    fn try_decode(&self, msg: &[u8], rssi: f32, slots: &mut SlotManager) -> Result<usize, DecodeStatus> {
        check_len(msg, MIN_LEN, self.name())?;

        let w: Vec<u8> = msg.iter().map(|b| b ^ WHITENING_BYTE).collect();
        let expected = be16(&w, 0);
        let digest = lfsr_digest16(&w[2..25], LFSR_GENERATOR, LFSR_KEY_7IN1);
        if expected ^ digest != DIGEST_XOR_7IN1 {
            log_integrity_result(self.name(), DIGEST_XOR_7IN1, expected ^ digest);
            return Err(DecodeStatus::DigestError);
        }
        log_message_hex("De-whitened Data", &w);

        let id = be16(&w, 2) as u32;
        // raw, not de-whitened
        let s_type = msg[6] >> 4;
        let slot_idx = claim_slot(slots, id)?;

        let battery_low = (w[15] & 0x0F) & 0x06 == 0x06;

        let slot = slots.get_mut(slot_idx).ok_or(DecodeStatus::Full)?;
        slot.sensor_id = id;
        slot.s_type = SensorType::from(s_type);
        slot.startup = msg[6] & 0x08 == 0;
        slot.chan = msg[6] & 0x07;
        slot.decoder = self.flag().bits();
        slot.battery_ok = !battery_low;
        slot.valid = true;
        slot.complete = true;
        slot.rssi = rssi;

        slot.payload = match s_type {
            SENSOR_TYPE_WEATHER1 | SENSOR_TYPE_WEATHER2 => Payload::Weather(Self::weather(&w, s_type)),
            SENSOR_TYPE_AIR_PM => Payload::ParticulateMatter(Self::particulate_matter(&w)),
            SENSOR_TYPE_CO2 => Payload::Co2(Co2Data {
                co2_ppm: Self::four_digits(&w),
                co2_init: lo(w[5]) == 0x0F,
            }),
            SENSOR_TYPE_HCHO_VOC => Payload::Voc(VocData {
                hcho_ppb: Self::four_digits(&w),
                voc_level: w[22] & 0x0F,
                hcho_init: lo(w[5]) == 0x0F,
                voc_init: w[22] == 0x0F,
            }),
            other => {
                log::debug!("[{}] unhandled sensor type {other}", self.name());
                Payload::default()
            }
        };

        log::debug!("[{}] {}", self.name(), slot);
        Ok(slot_idx)
    }
}

impl MessageDecoder for Bresser7In1Decoder {
    fn decode(&self, msg: &[u8], rssi: f32, slots: &mut SlotManager) -> DecodeResult {
        match self.try_decode(msg, rssi, slots) {
            Ok(idx) => DecodeResult::ok(idx),
            Err(status) => status.into(),
        }
    }

    fn name(&self) -> &'static str {
        "7in1"
    }

    fn flag(&self) -> DecoderFlags {
        DecoderFlags::B7IN1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::hex::hex_to_bytes;

    const WEATHER_MSG: &str = "631d05c09e9a18abaabaaaaaaaaa8adacbacff9cafcaaaaaaa00";
    const LIGHT_MSG: &str = "9a59b4a5a3da10aaaaaaaaaaaaaa8bdac8afea28a8caaaaaaa00";
    const CO2_MSG: &str = "dab6d782acd9a1ad9aad9aad9aaaaaaaaaaaaaaaaae99aaaaa00";
    const VOC_MSG: &str = "3f2dc4a5aaafb1aaa8aaa8aaa8aaaaaaaaaaaaaaaae9feaaaa00";
    const PM_MSG: &str = "5302b89eaaaa89aaaaab8aa9eaafcaaaaaaaaaaaaaaaaaaaaaaa";
    const PM_INIT_MSG: &str = "6b3fb89eaaaa81aa55555555555555aaaaaaaaaaaaaaaaaaaaaa";

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 0.01
    }

    fn decode_one(hex: &str) -> crate::sensor::Reading {
        let mut slots = SlotManager::new(1);
        let r = Bresser7In1Decoder.decode(&hex_to_bytes(hex), -50.0, &mut slots);
        assert_eq!(r, DecodeResult::ok(0));
        slots.get(0).cloned().unwrap()
    }

    #[test]
    fn test_decode_weather_station() {
        let s = decode_one(WEATHER_MSG);
        assert_eq!(s.sensor_id, 0xAF6A);
        assert_eq!(s.s_type, SensorType::Weather1);
        assert!(!s.startup);
        assert_eq!(s.chan, 0);
        assert!(s.battery_ok);
        assert!(s.complete);

        let w = s.weather().unwrap();
        assert!(w.temp_ok && w.humidity_ok && w.wind_ok && w.rain_ok && w.light_ok && w.uv_ok);
        assert!(!w.tglobe_ok);
        assert!(approx(w.wind_direction_deg, 343.0));
        assert!(approx(w.wind_gust_meter_sec, 1.0));
        assert!(approx(w.wind_avg_meter_sec, 1.0));
        assert!(approx(w.rain_mm, 0.0));
        assert!(approx(w.temp_c, 20.7));
        assert_eq!(w.humidity, 61);
        assert!(approx(w.light_lux, 65536.0));
        assert!(approx(w.uv, 5.6));
    }

    #[test]
    fn test_decode_light_and_uv() {
        let s = decode_one(LIGHT_MSG);
        assert_eq!(s.sensor_id, 0x1E0F);
        assert!(s.startup);
        let w = s.weather().unwrap();
        assert!(approx(w.wind_direction_deg, 97.0));
        assert!(approx(w.temp_c, 21.7));
        assert_eq!(w.humidity, 62);
        assert!(approx(w.light_lux, 54082.0));
        assert!(approx(w.light_klx, 54.082));
        assert!(approx(w.uv, 2.6));
    }

    #[test]
    fn test_decode_co2() {
        let s = decode_one(CO2_MSG);
        assert_eq!(s.sensor_id, 0x7D28);
        assert_eq!(s.s_type, SensorType::Co2);
        assert!(s.startup);
        assert_eq!(s.chan, 1);
        let c = s.co2().unwrap();
        assert_eq!(c.co2_ppm, 673);
        assert!(!c.co2_init);
    }

    #[test]
    fn test_decode_hcho_voc() {
        let s = decode_one(VOC_MSG);
        assert_eq!(s.sensor_id, 0x6E0F);
        assert_eq!(s.s_type, SensorType::HchoVoc);
        assert_eq!(s.chan, 1);
        let v = s.voc().unwrap();
        assert_eq!(v.hcho_ppb, 5);
        assert_eq!(v.voc_level, 4);
        assert!(!v.hcho_init && !v.voc_init);
    }

    #[test]
    fn test_decode_particulate_matter() {
        let s = decode_one(PM_MSG);
        assert_eq!(s.sensor_id, 0x1234);
        assert_eq!(s.s_type, SensorType::AirPm);
        assert_eq!(s.chan, 1);
        assert!(!s.startup);
        let pm = s.pm().unwrap();
        assert_eq!((pm.pm_1_0, pm.pm_2_5, pm.pm_10), (12, 34, 56));
        assert!(!pm.pm_1_0_init && !pm.pm_2_5_init && !pm.pm_10_init);
    }

    #[test]
    fn test_particulate_matter_warm_up_packet() {
        let s = decode_one(PM_INIT_MSG);
        assert!(s.startup);
        let pm = s.pm().unwrap();
        assert!(pm.pm_1_0_init && pm.pm_2_5_init && pm.pm_10_init);
    }

    #[test]
    fn test_digest_error() {
        let mut msg = hex_to_bytes(WEATHER_MSG);
        msg[10] ^= 0x10;
        let mut slots = SlotManager::new(1);
        assert_eq!(Bresser7In1Decoder.decode(&msg, 0.0, &mut slots).status, DecodeStatus::DigestError);
    }

    #[test]
    fn test_weather_globe_temperature() {
        let mut w = vec![0u8; 26];
        w[22] = 0x23;
        w[23] = 0x40;
        let data = Bresser7In1Decoder::weather(&w, SENSOR_TYPE_WEATHER2);
        assert!(data.tglobe_ok);
        assert!(approx(data.tglobe_c, 23.4));

        w[23] = 0xF0;
        assert!(!Bresser7In1Decoder::weather(&w, SENSOR_TYPE_WEATHER2).tglobe_ok);
    }

    #[test]
    fn test_weather_negative_temperature() {
        let mut w = vec![0u8; 26];
        // 1000 - 52 = 948 -> -5.2 °C
        w[14] = 0x94;
        w[15] = 0x80;
        let data = Bresser7In1Decoder::weather(&w, SENSOR_TYPE_WEATHER1);
        assert!(approx(data.temp_c, -5.2));
    }
}
