use crate::aggregator::BoilerState;
use crate::durable_store::{DurableStore, encode};
use crate::error::BoilerResult;
use crate::measure::LatencyMeasurer;
use parking_lot::{Condvar, Mutex, RwLock};
use spdlog::{error, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

#[derive(Debug, Default)]
struct SignalState {
    pending: bool,
    stopped: bool,
}

/// Level-triggered wake-up: raising it twice before the worker wakes still
/// produces a single flush.
#[derive(Debug, Default)]
pub(crate) struct FlushSignal {
    state: Mutex<SignalState>,
    condvar: Condvar,
}

impl FlushSignal {
    pub(crate) fn raise(&self) {
        self.state.lock().pending = true;
        self.condvar.notify_one();
    }

    pub(crate) fn stop(&self) {
        self.state.lock().stopped = true;
        self.condvar.notify_one();
    }

    /// Parks until raised or stopped. Returns `(pending, stopped)` and clears `pending`.
    fn wait(&self) -> (bool, bool) {
        let mut state = self.state.lock();
        while !state.pending && !state.stopped {
            self.condvar.wait(&mut state);
        }
        let pending = std::mem::take(&mut state.pending);
        (pending, state.stopped)
    }
}

/// Background thread that rewrites the durable store after every change.
///
/// The worker only ever takes the state lock shared, and only while encoding,
/// so writers never wait on disk I/O.
pub(crate) struct PersistenceWorker {
    signal: Arc<FlushSignal>,
    flushed_generation: Arc<AtomicU64>,
    handle: Option<thread::JoinHandle<()>>,
}

impl PersistenceWorker {
    pub(crate) fn spawn(
        store: DurableStore,
        state: Arc<RwLock<BoilerState>>,
    ) -> BoilerResult<Self> {
        let signal = Arc::new(FlushSignal::default());
        let flushed_generation = Arc::new(AtomicU64::new(state.read().generation));

        let handle = {
            let signal = signal.clone();
            let flushed_generation = flushed_generation.clone();
            thread::Builder::new()
                .name("boiler-persistence".into())
                .spawn(move || run(store, state, signal, flushed_generation))?
        };

        Ok(Self {
            signal,
            flushed_generation,
            handle: Some(handle),
        })
    }

    #[inline(always)]
    pub(crate) fn notify(&self) {
        self.signal.raise();
    }

    /// Generation of the newest state that reached disk.
    pub(crate) fn flushed_generation(&self) -> u64 {
        self.flushed_generation.load(Ordering::Acquire)
    }

    pub(crate) fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.signal.stop();
        if handle.join().is_err() {
            error!("[Persistence] Worker panicked before shutdown");
        }
    }
}

impl Drop for PersistenceWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(
    store: DurableStore,
    state: Arc<RwLock<BoilerState>>,
    signal: Arc<FlushSignal>,
    flushed_generation: Arc<AtomicU64>,
) {
    info!("[Persistence] Worker started, writing to {:?}", store.path());
    let mut measurer = LatencyMeasurer::new();
    let mut failures = 0u64;

    loop {
        let (pending, stopped) = signal.wait();
        // A stop also covers a change whose earlier flush failed.
        let dirty = stopped && flushed_generation.load(Ordering::Acquire) < state.read().generation;
        if (pending || dirty) && !flush(&store, &state, &flushed_generation, &mut measurer) {
            failures += 1;
        }
        if stopped {
            break;
        }
    }

    info!(
        "[Persistence] Worker stopped, {} failed flush(es). Latency:{}",
        failures,
        measurer.format_stats()
    );
}

fn flush(
    store: &DurableStore,
    state: &RwLock<BoilerState>,
    flushed_generation: &AtomicU64,
    measurer: &mut LatencyMeasurer,
) -> bool {
    let (contents, generation) = {
        let state = state.read();
        (
            encode(&state.snapshot, state.history.iter()),
            state.generation,
        )
    };

    let result = {
        let _latency_guard = measurer.measure_with_guard();
        store.write(&contents)
    };

    match result {
        Ok(()) => {
            flushed_generation.fetch_max(generation, Ordering::AcqRel);
            true
        }
        Err(e) => {
            error!(
                "[Persistence] Flush of generation {} to {:?} failed, retrying on next change: {}",
                generation,
                store.path(),
                e
            );
            false
        }
    }
}
