use crate::calibration::Calibration;
use crate::error::{BoilerError, BoilerResult};
use crate::history::MAX_ENTRIES;
use std::path::PathBuf;

pub struct AggregatorOptions {
    /// Location of the durable store file.
    pub store_path: PathBuf,
    /// Maximum number of readings kept in memory and on disk.
    pub capacity: usize,
    /// Skip loading and persisting; state lives only as long as the process.
    pub in_memory: bool,
    pub calibration: Calibration,
}

impl Default for AggregatorOptions {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("data/boiler.store"),
            capacity: MAX_ENTRIES,
            in_memory: false,
            calibration: Calibration::default(),
        }
    }
}

impl AggregatorOptions {
    pub fn in_memory() -> Self {
        Self {
            in_memory: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> BoilerResult<()> {
        if self.capacity == 0 {
            return Err(BoilerError::InvalidConfig(
                "capacity must be greater than 0".into(),
            ));
        }
        if !self.in_memory && self.store_path.as_os_str().is_empty() {
            return Err(BoilerError::InvalidConfig(
                "store path is required unless running in memory".into(),
            ));
        }
        self.calibration.validate()
    }
}
