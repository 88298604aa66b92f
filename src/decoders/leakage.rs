//! # Bresser Water Leakage Decoder
//!
//! ```text
//! CRC:8h8h ID:8h8h8h8h TYPE:4h NSTARTUP:1b CH:3d ALARM:1b NALARM:1b BATT:2b ?4h
//! ```
//!
//! Bytes 0..2 carry a CRC16/XMODEM over bytes 2..7. A message that passes
//! the CRC is only accepted if the type nibble says "leakage", the two
//! alarm bits disagree and the channel is not zero; otherwise it is
//! reported as `Invalid`.

use crate::constants::*;
use crate::decoders::{be16, be32, check_len, claim_slot, DecodeResult, DecoderFlags, MessageDecoder};
use crate::error::DecodeStatus;
use crate::integrity::crc16;
use crate::sensor::{LeakageData, Payload, SensorType, SlotManager};
use crate::util::logging::log_integrity_result;

const MIN_LEN: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
pub struct LeakageDecoder;

impl LeakageDecoder {
    fn try_decode(&self, msg: &[u8], rssi: f32, slots: &mut SlotManager) -> Result<usize, DecodeStatus> {
        check_len(msg, MIN_LEN, self.name())?;

        let expected = be16(msg, 0);
        let calculated = crc16(&msg[2..7], CRC16_POLY, CRC16_INIT);
        if calculated != expected {
            log_integrity_result(self.name(), expected, calculated);
            return Err(DecodeStatus::ChecksumError);
        }

        let id = be32(msg, 2);
        let s_type = msg[6] >> 4;
        let chan = msg[6] & 0x07;
        let alarm = msg[7] & 0x80 != 0;
        let no_alarm = msg[7] & 0x40 != 0;

        if s_type != SENSOR_TYPE_LEAKAGE || alarm == no_alarm || chan == 0 {
            log::debug!(
                "[{}] implausible content: type {s_type} ch {chan} alarm {} no_alarm {}",
                self.name(),
                alarm as u8,
                no_alarm as u8
            );
            return Err(DecodeStatus::Invalid);
        }

        let slot_idx = claim_slot(slots, id)?;
        let slot = slots.get_mut(slot_idx).ok_or(DecodeStatus::Full)?;
        slot.sensor_id = id;
        slot.s_type = SensorType::from(s_type);
        slot.chan = chan;
        slot.decoder = self.flag().bits();
        slot.startup = msg[6] & 0x08 == 0;
        slot.battery_ok = msg[7] & 0x30 != 0;
        slot.rssi = rssi;
        slot.valid = true;
        slot.complete = true;
        slot.payload = Payload::Leakage(LeakageData {
            alarm: alarm && !no_alarm,
        });

        log::debug!("[{}] {}", self.name(), slot);
        Ok(slot_idx)
    }
}

impl MessageDecoder for LeakageDecoder {
    fn decode(&self, msg: &[u8], rssi: f32, slots: &mut SlotManager) -> DecodeResult {
        match self.try_decode(msg, rssi, slots) {
            Ok(idx) => DecodeResult::ok(idx),
            Err(status) => status.into(),
        }
    }

    fn name(&self) -> &'static str {
        "Leakage"
    }

    fn flag(&self) -> DecoderFlags {
        DecoderFlags::LEAKAGE
    }
}
