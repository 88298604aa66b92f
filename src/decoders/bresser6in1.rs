//! # Bresser 6-in-1 Decoder
//!
//! Weather stations (3-in-1, 6-in-1), thermo/hygro sensors, pool
//! thermometers and soil probes.
//!
//! A weather station splits its reading over two alternating messages,
//! selected by FLAGS: `0` carries temperature, humidity and UV, `1` carries
//! rain. Wind is in both. Field validity is OR-merged into the slot, and the
//! slot becomes complete once temperature and rain have both been seen.
//!
//! ```text
//! DIGEST:8h8h ID:8h8h8h8h TYPE:4h STARTUP(inv):1b CH:3d
//! WSPEED:~8h~4h ~4h~8h WDIR:12h ?4h TEMP:8h.4h ?2b BATT:1b ?1b HUM:8h
//! UV?~12h ?4h FLAGS:4h CHKSUM:8h
//! ```

use crate::constants::*;
use crate::decoders::{bcd, be16, be32, check_len, claim_slot, hi, lo, DecodeResult, DecoderFlags, MessageDecoder};
use crate::error::DecodeStatus;
use crate::integrity::{add_bytes, lfsr_digest16};
use crate::sensor::{Payload, SensorType, SlotManager, SoilData, WeatherData};
use crate::util::logging::log_integrity_result;

const MIN_LEN: usize = 18;

#[derive(Debug, Clone, Copy, Default)]
pub struct Bresser6In1Decoder;

/// Fields carried by one 6-in-1 message, before merging into the slot
#[derive(Debug, Default)]
struct Fields {
    temp_ok: bool,
    humidity_ok: bool,
    uv_ok: bool,
    wind_ok: bool,
    rain_ok: bool,
    temp_c: f32,
    humidity: u8,
    uv: f32,
    gust: f32,
    wavg: f32,
    wdir: f32,
    rain_mm: f32,
}

impl Bresser6In1Decoder {
    fn extract(msg: &[u8], type_raw: u8, flags: u8) -> Fields {
        let mut f = Fields::default();

        if flags == 0 {
            f.temp_ok = true;
            f.humidity_ok = true;

            let sign = (msg[13] >> 3) & 1 != 0;
            let temp_raw = (hi(msg[12]) * 100 + lo(msg[12]) * 10 + hi(msg[13])) as i32;
            let mut temp = if sign { temp_raw - 1000 } else { temp_raw } as f32 * 0.1;
            // above 50.0 °C the sign bit is set without the value being negative
            if temp < -50.0 {
                temp = -(temp_raw as f32) * 0.1;
            }
            f.temp_c = temp;
            f.humidity = bcd(msg[14]) as u8;

            let uv15 = !msg[15];
            let uv16 = !msg[16];
            f.uv_ok = uv15 <= 0x99 && (uv16 & 0xF0) <= 0x90;
            if f.uv_ok {
                f.uv = (hi(uv15) * 100 + lo(uv15) * 10 + hi(uv16)) as f32 * 0.1;
            }
        }

        let (i7, i8, i9) = (!msg[7], !msg[8], !msg[9]);
        f.wind_ok = i7 <= 0x99 && i8 <= 0x99 && i9 <= 0x99;
        if f.wind_ok {
            f.gust = (hi(i7) * 100 + lo(i7) * 10 + hi(i8)) as f32 * 0.1;
            f.wavg = (hi(i9) * 100 + lo(i9) * 10 + lo(i8)) as f32 * 0.1;
            f.wdir = (hi(msg[10]) * 100 + lo(msg[10]) * 10 + hi(msg[11])) as f32;
        }

        f.rain_ok = flags == 1 && type_raw == SENSOR_TYPE_WEATHER1;
        if f.rain_ok {
            let (i12, i13, i14) = (!msg[12], !msg[13], !msg[14]);
            let rain_raw = bcd(i12) * 10_000 + bcd(i13) * 100 + bcd(i14);
            f.rain_mm = rain_raw as f32 * 0.1;
        }

        match type_raw {
            SENSOR_TYPE_POOL_THERMO => f.humidity_ok = false,
            SENSOR_TYPE_SOIL => {
                f.wind_ok = false;
                f.uv_ok = false;
            }
            _ => {}
        }
        f
    }

    fn try_decode(&self, msg: &[u8], rssi: f32, slots: &mut SlotManager) -> Result<usize, DecodeStatus> {
        check_len(msg, MIN_LEN, self.name())?;

        let expected = be16(msg, 0);
        let digest = lfsr_digest16(&msg[2..17], LFSR_GENERATOR, LFSR_KEY_6IN1);
        if expected != digest {
            log_integrity_result(self.name(), expected, digest);
            return Err(DecodeStatus::DigestError);
        }

        let sum = add_bytes(&msg[2..18]);
        if sum & 0xFF != 0xFF {
            log::debug!("[{}] checksum error: {sum:02X}", self.name());
            return Err(DecodeStatus::ChecksumError);
        }

        let id = be32(msg, 2);
        let type_raw = msg[6] >> 4;
        let flags = msg[16] & 0x0F;
        let slot_idx = claim_slot(slots, id)?;

        let f = Self::extract(msg, type_raw, flags);

        let slot = slots.get_mut(slot_idx).ok_or(DecodeStatus::Full)?;
        if !slot.valid {
            slot.payload = Payload::default();
        }
        slot.sensor_id = id;
        slot.s_type = SensorType::from(type_raw);
        slot.chan = msg[6] & 0x07;
        slot.startup = msg[6] & 0x08 == 0;
        slot.battery_ok = (msg[13] >> 1) & 1 != 0;
        slot.decoder = self.flag().bits();
        slot.rssi = rssi;

        if type_raw == SENSOR_TYPE_SOIL {
            if !matches!(slot.payload, Payload::Soil(_)) {
                slot.payload = Payload::Soil(SoilData::default());
            }
            if let Payload::Soil(soil) = &mut slot.payload {
                if f.temp_ok && (1..=16).contains(&f.humidity) {
                    soil.moisture = SOIL_MOISTURE_MAP[(f.humidity - 1) as usize];
                    soil.temp_c = f.temp_c;
                }
            }
            slot.complete = true;
        } else {
            if !matches!(slot.payload, Payload::Weather(_)) {
                slot.payload = Payload::Weather(WeatherData::default());
            }
            if let Payload::Weather(w) = &mut slot.payload {
                if f.temp_ok {
                    w.temp_c = f.temp_c;
                    w.humidity = f.humidity;
                }
                if f.uv_ok {
                    w.uv = f.uv;
                }
                if f.wind_ok {
                    w.wind_gust_meter_sec = f.gust;
                    w.wind_avg_meter_sec = f.wavg;
                    w.wind_direction_deg = f.wdir;
                }
                if f.rain_ok {
                    w.rain_mm = f.rain_mm;
                }
                w.temp_ok |= f.temp_ok;
                w.humidity_ok |= f.humidity_ok;
                w.uv_ok |= f.uv_ok;
                w.wind_ok |= f.wind_ok;
                w.rain_ok |= f.rain_ok;

                // a weather station needs both message kinds
                if type_raw != SENSOR_TYPE_WEATHER1 || (w.temp_ok && w.rain_ok) {
                    slot.complete = true;
                }
            }
        }
        slot.valid = true;

        log::debug!("[{}] flags={flags} {}", self.name(), slot);
        Ok(slot_idx)
    }
}

impl MessageDecoder for Bresser6In1Decoder {
    fn decode(&self, msg: &[u8], rssi: f32, slots: &mut SlotManager) -> DecodeResult {
        match self.try_decode(msg, rssi, slots) {
            Ok(idx) => DecodeResult::ok(idx),
            Err(status) => status.into(),
        }
    }

    fn name(&self) -> &'static str {
        "6in1"
    }

    fn flag(&self) -> DecoderFlags {
        DecoderFlags::B6IN1
    }
}
