use crate::calibration::{Calibration, is_heating};
use crate::durable_store::{DurableStore, LoadedState};
use crate::error::{BoilerError, BoilerResult};
use crate::history::ReadingHistory;
use crate::options::AggregatorOptions;
use crate::persistence::PersistenceWorker;
use crate::reading::{Reading, SENSOR_COUNT, validate_sensors};
use crate::snapshot::{BoilerResponse, StateSnapshot};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use spdlog::{info, warn};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Everything guarded by the aggregator lock. Readers always see the four
/// fields as left by one completed ingest.
#[derive(Debug)]
pub(crate) struct BoilerState {
    pub(crate) history: ReadingHistory<Reading>,
    pub(crate) snapshot: StateSnapshot,
    pub(crate) is_heating: bool,
    /// Bumped once per accepted reading.
    pub(crate) generation: u64,
}

impl BoilerState {
    fn new(capacity: usize) -> BoilerResult<Self> {
        Ok(Self {
            history: ReadingHistory::new(capacity)?,
            snapshot: StateSnapshot::default(),
            is_heating: false,
            generation: 0,
        })
    }

    fn restore(&mut self, loaded: LoadedState, calibration: &Calibration) {
        self.history.extend(loaded.readings);
        self.snapshot = match loaded.snapshot {
            Some(snapshot) if snapshot.last_updated.is_some() => snapshot,
            _ => self
                .history
                .last()
                .map(|newest| calibration.snapshot(newest))
                .unwrap_or_default(),
        };
        self.is_heating = is_heating(self.history.tail(3));
    }

    fn push(
        &mut self,
        sensors: [f64; SENSOR_COUNT],
        now: DateTime<Utc>,
        calibration: &Calibration,
    ) {
        // Timestamps key the readings map, so they must strictly increase.
        let mut timestamp_us = now.timestamp_micros();
        if let Some(newest) = self.history.last() {
            timestamp_us = timestamp_us.max(newest.timestamp_us + 1);
        }

        let reading = Reading {
            timestamp_us,
            sensors,
        };
        self.history.append(reading);
        self.snapshot = calibration.snapshot(&reading);
        self.is_heating = is_heating(self.history.tail(3));
        self.generation += 1;
    }
}

/// The single writable authority for live boiler state.
///
/// Construct one per process with [`Aggregator::open`] and share it behind an
/// `Arc`. Ingest takes the lock exclusively; every read takes it shared.
pub struct Aggregator {
    state: Arc<RwLock<BoilerState>>,
    calibration: Calibration,
    worker: Option<PersistenceWorker>,
}

impl Aggregator {
    pub fn open(options: AggregatorOptions) -> BoilerResult<Self> {
        options.validate()?;
        let mut state = BoilerState::new(options.capacity)?;

        let store = (!options.in_memory).then(|| DurableStore::new(&options.store_path));
        if let Some(store) = &store {
            state.restore(store.load(options.capacity), &options.calibration);
        }
        info!(
            "[Aggregator] Ready with {}/{} reading(s){}",
            state.history.len(),
            state.history.capacity(),
            if options.in_memory { ", in memory" } else { "" }
        );

        let state = Arc::new(RwLock::new(state));
        let worker = store
            .map(|store| PersistenceWorker::spawn(store, state.clone()))
            .transpose()?;

        Ok(Self {
            state,
            calibration: options.calibration,
            worker,
        })
    }

    /// Accepts one reading stamped with the current time.
    ///
    /// Anything other than exactly [`SENSOR_COUNT`] finite values is rejected
    /// and leaves the state untouched.
    pub fn ingest(&self, values: &[f64]) -> BoilerResult<()> {
        self.ingest_at(values, Utc::now())
    }

    /// Like [`Aggregator::ingest`] with a caller supplied capture time. The
    /// stored timestamp never goes backwards past the newest reading.
    pub fn ingest_at(&self, values: &[f64], captured_at: DateTime<Utc>) -> BoilerResult<()> {
        let sensors = validate_sensors(values).inspect_err(|e: &BoilerError| {
            warn!("[Aggregator] Rejected reading: {}", e);
        })?;

        self.state.write().push(sensors, captured_at, &self.calibration);

        if let Some(worker) = &self.worker {
            worker.notify();
        }
        Ok(())
    }

    pub fn snapshot(&self) -> StateSnapshot {
        self.state.read().snapshot
    }

    pub fn is_heating(&self) -> bool {
        self.state.read().is_heating
    }

    /// Snapshot, trend and the newest `count` readings (all when `None`),
    /// taken together under one read lock.
    pub fn window(&self, count: Option<usize>) -> BoilerResponse {
        let state = self.state.read();
        BoilerResponse::project(&state.snapshot, state.is_heating, state.history.window(count))
    }

    /// Boundary form of [`Aggregator::window`]: a negative size means all readings.
    pub fn get_snapshot(&self, window_size: i64) -> BoilerResponse {
        self.window(usize::try_from(window_size).ok())
    }

    pub fn len(&self) -> usize {
        self.state.read().history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.state.read().history.capacity()
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Waits until every accepted reading has been written to disk.
    /// Returns `false` if `timeout` elapsed first.
    pub fn await_idle(&self, timeout: Duration) -> bool {
        let Some(worker) = &self.worker else {
            return true;
        };
        let start = Instant::now();
        loop {
            if worker.flushed_generation() >= self.state.read().generation {
                return true;
            }
            if start.elapsed() > timeout {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Stops the persistence worker after a final flush of pending changes.
    pub fn shutdown(mut self) {
        if let Some(mut worker) = self.worker.take() {
            worker.shutdown();
        }
        info!("[Aggregator] Shut down");
    }
}
