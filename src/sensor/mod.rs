//! # Sensor Readings
//!
//! Typed readings produced by the message decoders. Every [`Reading`] lives
//! in one slot of the [`SlotManager`] and carries exactly one [`Payload`]
//! variant, selected by the sensor type.
//!
//! ## Features
//!
//! - Common header: sensor id, type, channel, battery, startup, RSSI
//! - Per-field validity flags for partially transmitted weather data
//! - Completeness flag for formats that split a reading over two messages

use serde::{Deserialize, Serialize};

use crate::constants::*;

pub mod slots;

pub use slots::{SlotManager, SlotResolution};

/// Sensor type as transmitted in the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorType {
    Weather0,
    Weather1,
    ThermoHygro,
    PoolThermo,
    Soil,
    Leakage,
    AirPm,
    Lightning,
    Co2,
    HchoVoc,
    Weather2,
    Other(u8),
}

impl From<u8> for SensorType {
    fn from(raw: u8) -> Self {
        match raw {
            SENSOR_TYPE_WEATHER0 => SensorType::Weather0,
            SENSOR_TYPE_WEATHER1 => SensorType::Weather1,
            SENSOR_TYPE_THERMO_HYGRO => SensorType::ThermoHygro,
            SENSOR_TYPE_POOL_THERMO => SensorType::PoolThermo,
            SENSOR_TYPE_SOIL => SensorType::Soil,
            SENSOR_TYPE_LEAKAGE => SensorType::Leakage,
            SENSOR_TYPE_AIR_PM => SensorType::AirPm,
            SENSOR_TYPE_LIGHTNING => SensorType::Lightning,
            SENSOR_TYPE_CO2 => SensorType::Co2,
            SENSOR_TYPE_HCHO_VOC => SensorType::HchoVoc,
            SENSOR_TYPE_WEATHER2 => SensorType::Weather2,
            other => SensorType::Other(other),
        }
    }
}

impl From<SensorType> for u8 {
    fn from(t: SensorType) -> u8 {
        match t {
            SensorType::Weather0 => SENSOR_TYPE_WEATHER0,
            SensorType::Weather1 => SENSOR_TYPE_WEATHER1,
            SensorType::ThermoHygro => SENSOR_TYPE_THERMO_HYGRO,
            SensorType::PoolThermo => SENSOR_TYPE_POOL_THERMO,
            SensorType::Soil => SENSOR_TYPE_SOIL,
            SensorType::Leakage => SENSOR_TYPE_LEAKAGE,
            SensorType::AirPm => SENSOR_TYPE_AIR_PM,
            SensorType::Lightning => SENSOR_TYPE_LIGHTNING,
            SensorType::Co2 => SENSOR_TYPE_CO2,
            SensorType::HchoVoc => SENSOR_TYPE_HCHO_VOC,
            SensorType::Weather2 => SENSOR_TYPE_WEATHER2,
            SensorType::Other(raw) => raw,
        }
    }
}

impl Default for SensorType {
    fn default() -> Self {
        SensorType::Weather0
    }
}

impl std::fmt::Display for SensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorType::Other(raw) => write!(f, "Unknown({raw})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Weather station and thermo/hygro data
///
/// The `*_ok` flags mark which fields carry a value. For 6-in-1 sensors they
/// accumulate across the two alternating message kinds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    pub temp_ok: bool,
    pub humidity_ok: bool,
    pub light_ok: bool,
    pub uv_ok: bool,
    pub wind_ok: bool,
    pub rain_ok: bool,
    pub tglobe_ok: bool,
    /// Temperature in °C
    pub temp_c: f32,
    /// Relative humidity in %
    pub humidity: u8,
    /// Wind gust in m/s
    pub wind_gust_meter_sec: f32,
    /// Average wind speed in m/s
    pub wind_avg_meter_sec: f32,
    /// Wind direction in degrees
    pub wind_direction_deg: f32,
    /// Raw rain gauge counter in mm
    pub rain_mm: f32,
    /// UV index
    pub uv: f32,
    /// Illuminance in klx
    pub light_klx: f32,
    /// Illuminance in lux
    pub light_lux: f32,
    /// Globe temperature in °C (8-in-1 only)
    pub tglobe_c: f32,
}

/// Soil probe data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilData {
    pub temp_c: f32,
    /// Moisture in %
    pub moisture: u8,
}

/// Lightning sensor data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightningData {
    /// Raw strike counter (wraps at the sensor specific maximum)
    pub strike_count: u16,
    /// Raw distance byte
    pub distance_km: u8,
    pub unknown1: u16,
    pub unknown2: u16,
}

/// Water leakage sensor data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeakageData {
    pub alarm: bool,
}

/// Particulate matter concentrations in µg/m³
///
/// The `*_init` flags are set while the sensor is still warming up and the
/// corresponding value carries no measurement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PmData {
    pub pm_1_0: u16,
    pub pm_2_5: u16,
    pub pm_10: u16,
    pub pm_1_0_init: bool,
    pub pm_2_5_init: bool,
    pub pm_10_init: bool,
}

/// CO2 concentration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Co2Data {
    /// CO2 in ppm
    pub co2_ppm: u16,
    pub co2_init: bool,
}

/// Formaldehyde and VOC levels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VocData {
    /// HCHO in ppb
    pub hcho_ppb: u16,
    /// VOC level (1 = good ... 5 = bad)
    pub voc_level: u8,
    pub hcho_init: bool,
    pub voc_init: bool,
}

/// Per-type measurement payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Payload {
    Weather(WeatherData),
    Soil(SoilData),
    Lightning(LightningData),
    Leakage(LeakageData),
    ParticulateMatter(PmData),
    Co2(Co2Data),
    Voc(VocData),
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Weather(WeatherData::default())
    }
}

/// The most recent reading of one sensor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub sensor_id: u32,
    pub s_type: SensorType,
    pub chan: u8,
    /// Sensor reset flag; true right after power-on or battery change
    pub startup: bool,
    pub battery_ok: bool,
    /// Signal strength in dBm at reception
    pub rssi: f32,
    /// Slot holds a decoded reading
    pub valid: bool,
    /// All parts of a split reading have been received
    pub complete: bool,
    /// `DecoderFlags` bit of the decoder that produced this reading
    pub decoder: u8,
    pub payload: Payload,
}

impl Reading {
    /// Weather payload, if this reading carries one
    pub fn weather(&self) -> Option<&WeatherData> {
        match &self.payload {
            Payload::Weather(w) => Some(w),
            _ => None,
        }
    }

    pub fn soil(&self) -> Option<&SoilData> {
        match &self.payload {
            Payload::Soil(s) => Some(s),
            _ => None,
        }
    }

    pub fn lightning(&self) -> Option<&LightningData> {
        match &self.payload {
            Payload::Lightning(l) => Some(l),
            _ => None,
        }
    }

    pub fn leakage(&self) -> Option<&LeakageData> {
        match &self.payload {
            Payload::Leakage(l) => Some(l),
            _ => None,
        }
    }

    pub fn pm(&self) -> Option<&PmData> {
        match &self.payload {
            Payload::ParticulateMatter(p) => Some(p),
            _ => None,
        }
    }

    pub fn co2(&self) -> Option<&Co2Data> {
        match &self.payload {
            Payload::Co2(c) => Some(c),
            _ => None,
        }
    }

    pub fn voc(&self) -> Option<&VocData> {
        match &self.payload {
            Payload::Voc(v) => Some(v),
            _ => None,
        }
    }
}

impl std::fmt::Display for Reading {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Id: [{:08X}] Typ: [{}] Ch: [{}] St: [{}] Bat: [{}] RSSI: [{:.1}dBm]",
            self.sensor_id,
            u8::from(self.s_type),
            self.chan,
            self.startup as u8,
            if self.battery_ok { "OK " } else { "Low" },
            self.rssi
        )?;
        match &self.payload {
            Payload::Weather(w) => {
                if w.temp_ok {
                    write!(f, " Temp: [{:.1}C]", w.temp_c)?;
                }
                if w.humidity_ok {
                    write!(f, " Hum: [{}%]", w.humidity)?;
                }
                if w.wind_ok {
                    write!(
                        f,
                        " Wmax: [{:.1}m/s] Wavg: [{:.1}m/s] Wdir: [{:.1}deg]",
                        w.wind_gust_meter_sec, w.wind_avg_meter_sec, w.wind_direction_deg
                    )?;
                }
                if w.rain_ok {
                    write!(f, " Rain: [{:.1}mm]", w.rain_mm)?;
                }
                if w.uv_ok {
                    write!(f, " UV: [{:.1}]", w.uv)?;
                }
                if w.light_ok {
                    write!(f, " Light: [{:.3}klx]", w.light_klx)?;
                }
                if w.tglobe_ok {
                    write!(f, " Tglobe: [{:.1}C]", w.tglobe_c)?;
                }
                Ok(())
            }
            Payload::Soil(s) => write!(f, " Temp: [{:.1}C] Moisture: [{}%]", s.temp_c, s.moisture),
            Payload::Lightning(l) => write!(
                f,
                " Count: [{}] Distance: [{}] Unknown1: [0x{:03X}] Unknown2: [0x{:04X}]",
                l.strike_count, l.distance_km, l.unknown1, l.unknown2
            ),
            Payload::Leakage(l) => write!(f, " Leakage: [{}]", if l.alarm { "ALARM" } else { "OK" }),
            Payload::ParticulateMatter(p) => {
                let show = |v: u16, init: bool| if init { "--".to_string() } else { v.to_string() };
                write!(
                    f,
                    " PM1.0: [{}ug/m3] PM2.5: [{}ug/m3] PM10: [{}ug/m3]",
                    show(p.pm_1_0, p.pm_1_0_init),
                    show(p.pm_2_5, p.pm_2_5_init),
                    show(p.pm_10, p.pm_10_init)
                )
            }
            Payload::Co2(c) if c.co2_init => write!(f, " CO2: [--ppm]"),
            Payload::Co2(c) => write!(f, " CO2: [{}ppm]", c.co2_ppm),
            Payload::Voc(v) => {
                if v.hcho_init {
                    write!(f, " HCHO: [--ppb]")?;
                } else {
                    write!(f, " HCHO: [{}ppb]", v.hcho_ppb)?;
                }
                if v.voc_init {
                    write!(f, " VOC: [--]")
                } else {
                    write!(f, " VOC: [{}]", v.voc_level)
                }
            }
        }
    }
}
