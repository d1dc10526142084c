use crate::reading::{Reading, format_timestamp};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

/// Aggregate fields shared by the live state and the response handed to callers.
pub trait BoilerStatus {
    fn last_updated(&self) -> Option<DateTime<Utc>>;
    fn warmth_fraction(&self) -> f64;
    fn estimated_minutes(&self) -> f64;
}

/// The aggregate derived from the newest reading.
///
/// `last_updated` is `None` until the first reading is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StateSnapshot {
    pub last_updated: Option<DateTime<Utc>>,
    pub warmth_fraction: f64,
    pub estimated_minutes: f64,
}

impl BoilerStatus for StateSnapshot {
    fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    fn warmth_fraction(&self) -> f64 {
        self.warmth_fraction
    }

    fn estimated_minutes(&self) -> f64 {
        self.estimated_minutes
    }
}

/// Point-in-time view returned to the boundary layer: the snapshot, the
/// trend flag and a suffix window of readings, all taken from the same state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoilerResponse {
    #[serde(serialize_with = "serialize_last_updated")]
    pub last_updated: Option<DateTime<Utc>>,
    pub warmth_fraction: f64,
    pub estimated_minutes: f64,
    pub is_heating: bool,
    /// Oldest first.
    #[serde(serialize_with = "serialize_readings")]
    pub readings: Vec<Reading>,
}

impl BoilerResponse {
    pub fn project(snapshot: &StateSnapshot, is_heating: bool, readings: Vec<Reading>) -> Self {
        Self {
            last_updated: snapshot.last_updated,
            warmth_fraction: snapshot.warmth_fraction,
            estimated_minutes: snapshot.estimated_minutes,
            is_heating,
            readings,
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            last_updated: self.last_updated,
            warmth_fraction: self.warmth_fraction,
            estimated_minutes: self.estimated_minutes,
        }
    }
}

impl BoilerStatus for BoilerResponse {
    fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    fn warmth_fraction(&self) -> f64 {
        self.warmth_fraction
    }

    fn estimated_minutes(&self) -> f64 {
        self.estimated_minutes
    }
}

fn serialize_last_updated<S: Serializer>(
    last_updated: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match last_updated {
        Some(ts) => serializer.serialize_str(&format_timestamp(*ts)),
        None => serializer.serialize_none(),
    }
}

// A JSON object keyed by timestamp; serializing through the map API keeps
// insertion order, so the object reads oldest to newest.
fn serialize_readings<S: Serializer>(
    readings: &[Reading],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(readings.len()))?;
    for reading in readings {
        map.serialize_entry(&format_timestamp(reading.timestamp()), &reading.sensors)?;
    }
    map.end()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_response_json_shape() {
        let t0 = Utc.with_ymd_and_hms(2026, 10, 18, 6, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 10, 18, 6, 1, 0).unwrap();
        let snapshot = StateSnapshot {
            last_updated: Some(t1),
            warmth_fraction: 0.5,
            estimated_minutes: 13.5,
        };
        let response = BoilerResponse::project(
            &snapshot,
            true,
            vec![
                Reading::new(t0, [40.0, 37.0, 29.0]),
                Reading::new(t1, [41.0, 38.0, 30.0]),
            ],
        );

        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(
            json,
            concat!(
                r#"{"lastUpdated":"2026-10-18T06:01:00.000000Z","warmthFraction":0.5,"#,
                r#""estimatedMinutes":13.5,"isHeating":true,"readings":{"#,
                r#""2026-10-18T06:00:00.000000Z":[40.0,37.0,29.0],"#,
                r#""2026-10-18T06:01:00.000000Z":[41.0,38.0,30.0]}}"#
            )
        );
        assert_eq!(response.snapshot(), snapshot);
    }

    #[test]
    fn test_cold_start_serializes_null_timestamp() {
        let response = BoilerResponse::project(&StateSnapshot::default(), false, vec![]);
        let value = serde_json::to_value(&response).unwrap();
        assert!(value["lastUpdated"].is_null());
        assert_eq!(value["readings"], serde_json::json!({}));
        assert_eq!(value["warmthFraction"], 0.0);
    }
}
