mod aggregator;
pub mod calibration;
pub mod durable_store;
mod error;
pub mod history;
pub mod measure;
mod options;
mod persistence;
pub mod reading;
pub mod snapshot;

pub use crate::aggregator::Aggregator;
pub use crate::calibration::Calibration;
pub use crate::durable_store::{DurableStore, LoadedState};
pub use crate::error::{BoilerError, BoilerResult};
pub use crate::history::{MAX_ENTRIES, ReadingHistory};
pub use crate::options::AggregatorOptions;
pub use crate::reading::{Reading, SENSOR_COUNT};
pub use crate::snapshot::{BoilerResponse, BoilerStatus, StateSnapshot};
