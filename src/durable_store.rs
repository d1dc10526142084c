//! The on-disk record of the aggregator: one header line with the last
//! aggregate followed by one line per retained reading.
//!
//! ```text
//! estimatedMinutes|warmthFraction|lastUpdated
//! timestamp|sensor0|sensor1|sensor2
//! ...
//! ```
//!
//! The file is replaced wholesale on every flush by writing a sibling temp
//! file and renaming it over the old one.

use crate::history::MAX_ENTRIES;
use crate::reading::{Reading, SENSOR_COUNT, format_timestamp, parse_timestamp};
use crate::snapshot::StateSnapshot;
use spdlog::{info, warn};
use std::ffi::OsString;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

const DELIMITER: char = '|';

/// What survived a load. Corrupt lines are dropped and counted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedState {
    pub snapshot: Option<StateSnapshot>,
    pub readings: Vec<Reading>,
    pub skipped_lines: usize,
}

#[derive(Debug, Clone)]
pub struct DurableStore {
    path: PathBuf,
}

impl DurableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the store, keeping at most the newest `capacity` readings.
    /// A missing or unreadable file yields an empty state.
    pub fn load(&self, capacity: usize) -> LoadedState {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("[Store] No store at {:?}, starting empty", self.path);
                return LoadedState::default();
            }
            Err(e) => {
                warn!("[Store] Could not open {:?}, starting empty: {}", self.path, e);
                return LoadedState::default();
            }
        };

        let loaded = decode(BufReader::new(file), capacity);
        if loaded.skipped_lines > 0 {
            warn!(
                "[Store] Skipped {} malformed line(s) in {:?}",
                loaded.skipped_lines, self.path
            );
        }
        info!(
            "[Store] Loaded {} reading(s) from {:?}",
            loaded.readings.len(),
            self.path
        );
        loaded
    }

    /// Replaces the store contents in one rename.
    pub fn write(&self, contents: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.tmp_path();
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(contents.as_bytes())?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &self.path)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name: OsString = self.path.clone().into_os_string();
        name.push(".tmp");
        name.into()
    }
}

pub fn encode<'a>(
    snapshot: &StateSnapshot,
    readings: impl Iterator<Item = &'a Reading>,
) -> String {
    let mut out = String::new();
    let last_updated = snapshot
        .last_updated
        .map(format_timestamp)
        .unwrap_or_default();
    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        "{}{DELIMITER}{}{DELIMITER}{}",
        snapshot.estimated_minutes, snapshot.warmth_fraction, last_updated
    );
    for reading in readings {
        let [s0, s1, s2] = reading.sensors;
        let _ = writeln!(
            out,
            "{}{DELIMITER}{s0}{DELIMITER}{s1}{DELIMITER}{s2}",
            format_timestamp(reading.timestamp())
        );
    }
    out
}

/// Parses a store line by line without holding more than `capacity` readings.
///
/// Lines that fail to parse, and readings that do not come strictly after the
/// previously accepted one, are skipped and counted.
pub fn decode(reader: impl BufRead, capacity: usize) -> LoadedState {
    let mut loaded = LoadedState::default();
    let mut readings: VecDeque<Reading> = VecDeque::with_capacity(capacity.min(MAX_ENTRIES));
    let mut newest_us: Option<i64> = None;

    for (index, line) in reader.lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                loaded.skipped_lines += 1;
                continue;
            }
            Err(e) => {
                warn!("[Store] Stopped reading after {} line(s): {}", index, e);
                break;
            }
        };

        if index == 0 {
            match decode_header(&line) {
                Some(snapshot) => loaded.snapshot = Some(snapshot),
                None => loaded.skipped_lines += 1,
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        match decode_reading(&line) {
            Some(reading) if newest_us.is_none_or(|newest| reading.timestamp_us > newest) => {
                newest_us = Some(reading.timestamp_us);
                if capacity == 0 {
                    continue;
                }
                if readings.len() == capacity {
                    readings.pop_front();
                }
                readings.push_back(reading);
            }
            _ => loaded.skipped_lines += 1,
        }
    }

    loaded.readings = readings.into();
    loaded
}

fn decode_header(line: &str) -> Option<StateSnapshot> {
    let mut fields = line.split(DELIMITER);
    let estimated_minutes = parse_number(fields.next()?)?;
    let warmth_fraction = parse_number(fields.next()?)?;
    if estimated_minutes < 0.0 || !(0.0..=1.0).contains(&warmth_fraction) {
        return None;
    }
    let raw_updated = fields.next()?.trim();
    if fields.next().is_some() {
        return None;
    }
    let last_updated = if raw_updated.is_empty() {
        None
    } else {
        Some(parse_timestamp(raw_updated)?)
    };

    Some(StateSnapshot {
        last_updated,
        warmth_fraction,
        estimated_minutes,
    })
}

fn decode_reading(line: &str) -> Option<Reading> {
    let mut fields = line.split(DELIMITER);
    let timestamp = parse_timestamp(fields.next()?)?;
    let mut sensors = [0.0; SENSOR_COUNT];
    for sensor in sensors.iter_mut() {
        *sensor = parse_number(fields.next()?)?;
    }
    if fields.next().is_some() {
        return None;
    }
    Some(Reading::new(timestamp, sensors))
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
