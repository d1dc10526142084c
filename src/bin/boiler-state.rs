use boiler_state::{Aggregator, AggregatorOptions, MAX_ENTRIES};
use chrono::{Duration as ChronoDuration, Utc};
use clap::{Parser, Subcommand};
use spdlog::{Level, LevelFilter, info, warn};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Hot-water cylinder telemetry: ingest sensor readings and report how warm the tank is.
#[derive(Parser)]
#[command(version)]
struct Args {
    /// Durable store file.
    #[arg(long, default_value = "data/boiler.store")]
    store: PathBuf,

    /// Maximum readings to retain.
    #[arg(long, default_value_t = MAX_ENTRIES)]
    capacity: usize,

    /// Neither load nor persist state.
    #[arg(long)]
    in_memory: bool,

    /// Readings to include in the printed snapshot, negative for all.
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    window: i64,

    /// Log at info level instead of warnings only.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read one reading per stdin line (3 numbers, comma or space separated).
    Ingest,
    /// Print the persisted snapshot.
    Show,
    /// Feed a synthetic heating and cooling cycle.
    Demo {
        #[arg(long, default_value_t = 20)]
        steps: usize,
        #[arg(long, default_value_t = 3000)]
        interval_ms: u64,
        #[arg(long, default_value_t = 0x9E37_79B9_7F4A_7C15)]
        seed: u64,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let level = if args.verbose { Level::Info } else { Level::Warn };
    spdlog::default_logger().set_level_filter(LevelFilter::MoreSevereEqual(level));

    let aggregator = Aggregator::open(AggregatorOptions {
        store_path: args.store,
        capacity: args.capacity,
        in_memory: args.in_memory,
        ..AggregatorOptions::default()
    })?;

    match args.command {
        Command::Ingest => ingest_stdin(&aggregator)?,
        Command::Show => {}
        Command::Demo {
            steps,
            interval_ms,
            seed,
        } => run_demo(&aggregator, steps, Duration::from_millis(interval_ms), seed),
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&aggregator.get_snapshot(args.window))?
    );
    aggregator.shutdown();
    Ok(())
}

fn ingest_stdin(aggregator: &Aggregator) -> io::Result<()> {
    let (mut accepted, mut rejected) = (0usize, 0usize);
    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let values: Result<Vec<f64>, _> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|field| !field.is_empty())
            .map(str::parse::<f64>)
            .collect();

        match values {
            Ok(values) if aggregator.ingest(&values).is_ok() => accepted += 1,
            Ok(_) => rejected += 1,
            Err(e) => {
                warn!("[Ingest] Unparseable line {:?}: {}", line, e);
                rejected += 1;
            }
        }
    }
    info!("[Ingest] Accepted {} reading(s), rejected {}", accepted, rejected);
    Ok(())
}

/// Warm-up ramp seeded one minute apart, oldest first.
const RAMP: [[f64; 3]; 10] = [
    [20.0, 20.0, 20.0],
    [25.0, 20.0, 20.0],
    [30.0, 20.0, 20.0],
    [35.0, 25.0, 20.0],
    [40.0, 30.0, 20.0],
    [45.0, 30.0, 20.0],
    [50.0, 35.0, 20.0],
    [50.0, 35.0, 25.0],
    [50.0, 40.0, 25.0],
    [50.0, 40.0, 30.0],
];

fn run_demo(aggregator: &Aggregator, steps: usize, interval: Duration, seed: u64) {
    let now = Utc::now();
    for (i, values) in RAMP.iter().enumerate() {
        let minutes_ago = (RAMP.len() - 1 - i) as i64;
        let at = now - ChronoDuration::minutes(minutes_ago);
        if let Err(e) = aggregator.ingest_at(values, at) {
            warn!("[Demo] Ramp reading {} not accepted: {}", i, e);
        }
    }

    let mut rng = XorShift::new(seed);
    let mut last = RAMP[RAMP.len() - 1];
    let mut drift = 2.0;
    for step in 0..steps {
        thread::sleep(interval);
        let next = last.map(|v| v + rng.next_f64() * 3.0 - drift);
        if let Err(e) = aggregator.ingest(&next) {
            warn!("[Demo] Step {} not accepted: {}", step + 1, e);
        }

        let total: f64 = next.iter().sum();
        if (total < 60.0 && drift > 0.0) || (total > 165.0 && drift < 0.0) {
            drift = -drift;
        }
        last = next;

        let snapshot = aggregator.snapshot();
        info!(
            "[Demo] Step {}: {:.1}% warm, {:.0} min, heating={}",
            step + 1,
            snapshot.warmth_fraction * 100.0,
            snapshot.estimated_minutes,
            aggregator.is_heating()
        );
    }
}

/// Small deterministic generator for the demo feed.
struct XorShift(u64);

impl XorShift {
    fn new(seed: u64) -> Self {
        Self(seed | 1)
    }

    fn next_f64(&mut self) -> f64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        (x >> 11) as f64 / (1u64 << 53) as f64
    }
}
