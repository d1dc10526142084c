use crate::error::{BoilerError, BoilerResult};
use bytemuck::{Pod, Zeroable};
use chrono::{DateTime, SecondsFormat, Utc};

/// Number of temperature sensors mounted on the cylinder.
pub const SENSOR_COUNT: usize = 3;

/// One timestamped measurement of every sensor on the cylinder.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Reading {
    /// UTC microseconds since the Unix epoch.
    pub timestamp_us: i64,
    pub sensors: [f64; SENSOR_COUNT],
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, sensors: [f64; SENSOR_COUNT]) -> Self {
        Self {
            timestamp_us: timestamp.timestamp_micros(),
            sensors,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.timestamp_us).unwrap_or_default()
    }

    /// Sum of all sensor values, the scalar used for trend detection.
    #[inline(always)]
    pub fn sensor_sum(&self) -> f64 {
        self.sensors.iter().sum()
    }
}

/// Checks that `values` holds exactly one finite value per sensor.
pub fn validate_sensors(values: &[f64]) -> BoilerResult<[f64; SENSOR_COUNT]> {
    let sensors: [f64; SENSOR_COUNT] = values
        .try_into()
        .map_err(|_| BoilerError::WrongSensorCount(values.len()))?;

    if let Some((index, &value)) = sensors.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(BoilerError::NonFiniteReading { index, value });
    }

    Ok(sensors)
}

/// ISO-8601 / RFC 3339 in UTC with microsecond precision, e.g. `2026-10-18T07:30:00.000000Z`.
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_validate_rejects_wrong_count() {
        assert!(matches!(
            validate_sensors(&[1.0, 2.0]),
            Err(BoilerError::WrongSensorCount(2))
        ));
        assert!(matches!(
            validate_sensors(&[1.0, 2.0, 3.0, 4.0]),
            Err(BoilerError::WrongSensorCount(4))
        ));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let err = validate_sensors(&[1.0, f64::NAN, 3.0]).unwrap_err();
        assert!(matches!(err, BoilerError::NonFiniteReading { index: 1, .. }));
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_timestamp_text_keeps_microseconds() {
        let ts = Utc.with_ymd_and_hms(2026, 10, 18, 7, 30, 0).unwrap()
            + chrono::Duration::microseconds(123_456);
        let text = format_timestamp(ts);
        assert_eq!(text, "2026-10-18T07:30:00.123456Z");
        assert_eq!(parse_timestamp(&text), Some(ts));
    }

    #[test]
    fn test_parse_accepts_offsets() {
        let parsed = parse_timestamp("2026-10-18T09:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 10, 18, 7, 30, 0).unwrap());
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_sensor_sum() {
        let reading = Reading::new(Utc::now(), [10.0, 20.0, 30.5]);
        assert_eq!(reading.sensor_sum(), 60.5);
    }
}
