use hdrhistogram::Histogram;
use std::time::{Duration, Instant};

/// Highest trackable latency: one hour, in microseconds.
const MAX_MICROS: u64 = 3_600_000_000;

/// Summary of recorded latencies, all values in microseconds.
#[derive(Debug, Clone, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p99: u64,
}

pub struct LatencyMeasurerGuard<'a> {
    measurer: &'a mut LatencyMeasurer,
    start: Instant,
}

impl Drop for LatencyMeasurerGuard<'_> {
    fn drop(&mut self) {
        self.measurer.measure(self.start.elapsed());
    }
}

/// Microsecond latency histogram for store flushes and benchmarks.
pub struct LatencyMeasurer {
    histogram: Histogram<u64>,
}

impl LatencyMeasurer {
    pub fn new() -> Self {
        let histogram = Histogram::<u64>::new_with_bounds(1, MAX_MICROS, 3)
            .expect("constant histogram bounds are valid");
        Self { histogram }
    }

    pub fn measure(&mut self, duration: Duration) {
        let micros = (duration.as_micros() as u64).clamp(1, MAX_MICROS);
        self.histogram.saturating_record(micros);
    }

    /// Records the time until the returned guard is dropped.
    pub fn measure_with_guard(&mut self) -> LatencyMeasurerGuard<'_> {
        LatencyMeasurerGuard {
            measurer: self,
            start: Instant::now(),
        }
    }

    pub fn reset(&mut self) {
        self.histogram.reset();
    }

    pub fn get_stats(&self) -> LatencyStats {
        let count = self.histogram.len();
        if count == 0 {
            return LatencyStats::default();
        }

        LatencyStats {
            count,
            min: self.histogram.min(),
            max: self.histogram.max(),
            mean: self.histogram.mean(),
            p50: self.histogram.value_at_quantile(0.5),
            p99: self.histogram.value_at_quantile(0.99),
        }
    }

    pub fn format_stats(&self) -> String {
        let stats = self.get_stats();
        if stats.count == 0 {
            return "No stats collected yet".into();
        }

        format!(
            "\tcount={},\tmin={},\tmax={},\tmean={},\tp50={},\tp99={}",
            stats.count,
            Self::format_duration(stats.min as f64),
            Self::format_duration(stats.max as f64),
            Self::format_duration(stats.mean),
            Self::format_duration(stats.p50 as f64),
            Self::format_duration(stats.p99 as f64),
        )
    }

    fn format_duration(micros: f64) -> String {
        if micros < 1000.0 {
            format!("{:.1}us", micros)
        } else if micros < 1_000_000.0 {
            format!("{:.1}ms", micros / 1000.0)
        } else {
            format!("{:.2}s", micros / 1_000_000.0)
        }
    }
}

impl Default for LatencyMeasurer {
    fn default() -> Self {
        Self::new()
    }
}
