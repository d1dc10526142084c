use crate::error::{BoilerError, BoilerResult};
use crate::reading::{Reading, SENSOR_COUNT};
use crate::snapshot::StateSnapshot;

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Per-sensor temperature bounds and weights used to turn raw readings into a
/// single warmth fraction.
///
/// Sensors sit at different heights in the cylinder, so each has its own cold
/// and warm bound and contributes with its own weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub weights: [f64; SENSOR_COUNT],
    /// Temperature at or above which a sensor counts as fully warm.
    pub warm: [f64; SENSOR_COUNT],
    /// Temperature at or below which a sensor counts as cold.
    pub cold: [f64; SENSOR_COUNT],
    /// Minutes of comfortable showering available at full warmth.
    pub time_to_cool: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            weights: [0.15, 0.6, 0.25],
            warm: [48.0, 48.0, 36.0],
            cold: [34.0, 28.0, 24.0],
            time_to_cool: 27.0,
        }
    }
}

impl Calibration {
    /// Same bounds on every sensor, combined as a plain mean.
    pub fn uniform(cold: f64, warm: f64, time_to_cool: f64) -> Self {
        Self {
            weights: [1.0 / SENSOR_COUNT as f64; SENSOR_COUNT],
            warm: [warm; SENSOR_COUNT],
            cold: [cold; SENSOR_COUNT],
            time_to_cool,
        }
    }

    pub fn validate(&self) -> BoilerResult<()> {
        for i in 0..SENSOR_COUNT {
            let (cold, warm, weight) = (self.cold[i], self.warm[i], self.weights[i]);
            if !cold.is_finite() || !warm.is_finite() || warm <= cold {
                return Err(BoilerError::InvalidConfig(format!(
                    "sensor {i}: warm bound {warm} must be finite and above cold bound {cold}"
                )));
            }
            if !weight.is_finite() || weight < 0.0 {
                return Err(BoilerError::InvalidConfig(format!(
                    "sensor {i}: weight {weight} must be a non-negative number"
                )));
            }
        }

        let total: f64 = self.weights.iter().sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(BoilerError::InvalidConfig(format!(
                "weights must sum to 1, got {total}"
            )));
        }

        if !self.time_to_cool.is_finite() || self.time_to_cool < 0.0 {
            return Err(BoilerError::InvalidConfig(format!(
                "time to cool {} must be a non-negative number",
                self.time_to_cool
            )));
        }
        Ok(())
    }

    /// Clamps sensor `index` into its bounds and maps it onto `[0, 1]`.
    #[inline(always)]
    pub fn normalize(&self, index: usize, raw: f64) -> f64 {
        let (cold, warm) = (self.cold[index], self.warm[index]);
        (raw.clamp(cold, warm) - cold) / (warm - cold)
    }

    pub fn warmth_fraction(&self, sensors: &[f64; SENSOR_COUNT]) -> f64 {
        let weighted: f64 = sensors
            .iter()
            .enumerate()
            .map(|(i, &raw)| self.weights[i] * self.normalize(i, raw))
            .sum();
        // Float error in the weights may push the sum a hair outside the unit range.
        weighted.clamp(0.0, 1.0)
    }

    pub fn snapshot(&self, reading: &Reading) -> StateSnapshot {
        let warmth_fraction = self.warmth_fraction(&reading.sensors);
        StateSnapshot {
            last_updated: Some(reading.timestamp()),
            warmth_fraction,
            estimated_minutes: warmth_fraction * self.time_to_cool,
        }
    }
}

/// True when the sensor sums of the last three readings strictly increase.
pub fn is_heating<'a>(tail: impl Iterator<Item = &'a Reading>) -> bool {
    let mut sums = tail.map(Reading::sensor_sum);
    match (sums.next(), sums.next(), sums.next()) {
        (Some(a), Some(b), Some(c)) => a < b && b < c,
        _ => false,
    }
}
