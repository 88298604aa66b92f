//! # Derived Weather Values
//!
//! Conversions computed from decoded readings: Beaufort scale, compass
//! labels, dew point, wind chill, heat index, humidex and perceived
//! temperature. Inputs use the units the decoders produce (°C, %, m/s).

const COMPASS_POINTS: [&str; 17] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW", "N",
];

/// Beaufort upper bounds in m/s for forces 0..=11
const BEAUFORT_LIMITS: [f32; 12] = [
    0.9, 1.6, 3.4, 5.5, 8.0, 10.8, 13.9, 17.2, 20.8, 24.5, 28.5, 32.7,
];

/// Convert wind speed in m/s to Beaufort force (0..=12)
pub fn windspeed_ms_to_bft(ms: f32) -> u8 {
    BEAUFORT_LIMITS
        .iter()
        .position(|&limit| ms < limit)
        .unwrap_or(BEAUFORT_LIMITS.len()) as u8
}

/// Convert wind direction in degrees to a 16-point compass label
pub fn winddir_to_compass(dir_deg: f32) -> &'static str {
    let normalized = dir_deg.rem_euclid(360.0);
    let idx = ((normalized + 11.25) / 22.5) as usize;
    COMPASS_POINTS[idx.min(COMPASS_POINTS.len() - 1)]
}

/// Dew point in °C (Magnus formula), rounded to 0.1 °C
pub fn dew_point(celsius: f32, humidity: f32) -> f32 {
    let (a, b) = if celsius >= 0.0 { (7.5, 237.3) } else { (7.6, 240.7) };
    let sdd = 6.1078 * 10f32.powf((a * celsius) / (b + celsius));
    let dd = sdd * (humidity / 100.0);
    let v = (dd / 6.1078).log10();
    let td = (b * v) / (a - v);
    (td * 10.0).round() / 10.0
}

/// Wind chill in °C
///
/// Meaningful for temperatures ≤ 10 °C and wind speeds > 4.8 km/h.
pub fn wind_chill(celsius: f32, windspeed_ms: f32) -> f32 {
    let v = (windspeed_ms * 3.6).powf(0.16);
    13.12 + 0.6215 * celsius - 11.37 * v + 0.3965 * celsius * v
}

/// Heat index in °C
///
/// Meaningful for temperatures ≥ 16.7 °C and humidity > 40 %.
pub fn heat_index(celsius: f32, humidity: f32) -> f32 {
    let t = celsius;
    let h = humidity;
    -8.784695 + 1.61139411 * t + 2.338549 * h
        - 0.14611605 * t * h
        - 0.012308094 * t * t
        - 0.016424828 * h * h
        + 0.002211732 * t * t * h
        + 0.00072546 * t * h * h
        - 0.000003582 * t * t * h * h
}

/// Humidex in °C
pub fn humidex(celsius: f32, humidity: f32) -> f32 {
    let vapor_pressure = 6.112 * 10f32.powf(7.5 * celsius / (237.7 + celsius)) * humidity / 100.0;
    celsius + 0.555_555_55 * (vapor_pressure - 10.0)
}

/// Perceived temperature in °C
///
/// Wind chill when cold and windy, heat index when warm and humid,
/// otherwise the air temperature.
pub fn perceived_temperature(celsius: f32, windspeed_ms: f32, humidity: f32) -> f32 {
    if celsius <= 10.0 && windspeed_ms * 3.6 > 4.8 {
        wind_chill(celsius, windspeed_ms)
    } else if celsius >= 16.7 && humidity > 40.0 {
        heat_index(celsius, humidity)
    } else {
        celsius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() < eps
    }

    #[test]
    fn test_beaufort_boundaries() {
        assert_eq!(windspeed_ms_to_bft(0.0), 0);
        assert_eq!(windspeed_ms_to_bft(0.9), 1);
        assert_eq!(windspeed_ms_to_bft(5.4), 3);
        assert_eq!(windspeed_ms_to_bft(5.5), 4);
        assert_eq!(windspeed_ms_to_bft(17.1), 7);
        assert_eq!(windspeed_ms_to_bft(32.6), 11);
        assert_eq!(windspeed_ms_to_bft(40.0), 12);
    }

    #[test]
    fn test_compass() {
        assert_eq!(winddir_to_compass(0.0), "N");
        assert_eq!(winddir_to_compass(11.0), "N");
        assert_eq!(winddir_to_compass(11.25), "NNE");
        assert_eq!(winddir_to_compass(225.0), "SW");
        assert_eq!(winddir_to_compass(355.0), "N");
        assert_eq!(winddir_to_compass(-90.0), "W");
    }

    #[test]
    fn test_dew_point() {
        assert!(approx(dew_point(20.0, 50.0), 9.3, 0.01));
        assert!(approx(dew_point(-5.0, 80.0), -7.9, 0.01));
    }

    #[test]
    fn test_wind_chill_and_heat() {
        assert!(approx(wind_chill(0.0, 5.0), -4.94, 0.02));
        assert!(approx(heat_index(30.0, 60.0), 32.83, 0.02));
        assert!(approx(humidex(30.0, 60.0), 38.56, 0.05));
    }

    #[test]
    fn test_perceived_temperature_ranges() {
        assert!(approx(perceived_temperature(0.0, 5.0, 50.0), wind_chill(0.0, 5.0), 1e-4));
        assert!(approx(perceived_temperature(30.0, 5.0, 60.0), heat_index(30.0, 60.0), 1e-4));
        assert_eq!(perceived_temperature(12.0, 1.0, 30.0), 12.0);
    }
}
