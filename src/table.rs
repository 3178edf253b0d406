//! Row tables for a flight, rendered as CSV or JSON.
//!
//! This is the thin layer between the record streams and a file: it checks the
//! upstream validity verdict, converts Unix timestamps to UTC datetimes and
//! decides what to do with thermals that have no climb rate.

use std::io::Write;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{FlightTableError, Result};
use crate::thermals::ThermalSummary;
use crate::{annotate, AnnotatedFix, Flight, Thermal};

/// What to do with a zero-duration thermal when building the thermal table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Leave the thermal out of the table
    Skip,
    /// Fail the whole table with `DegenerateInterval`
    Fail,
    /// Keep the row with an empty vertical velocity
    Blank,
}

/// Configuration for table building.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Add a `flight_id` column to every row.
    /// Default: true
    pub include_flight_id: bool,

    /// Handling of zero-duration thermals.
    /// Default: Blank
    pub degenerate_policy: DegeneratePolicy,

    /// Minimum thermal count before summaries run in parallel
    /// (only with the `parallel` feature). Default: 1000
    pub parallel_threshold: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            include_flight_id: true,
            degenerate_policy: DegeneratePolicy::Blank,
            parallel_threshold: 1_000,
        }
    }
}

/// One row of the per-fix table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub bearing: f64,
    pub bearing_change_rate: f64,
    pub ground_speed: f64,
    pub altitude: f64,
    pub flying: bool,
    pub circling: bool,
    pub in_thermal: bool,
    pub phase_start: DateTime<Utc>,
}

impl FixRow {
    fn from_record(record: &AnnotatedFix, flight_id: Option<&str>) -> Result<Self> {
        let fix = &record.fix;
        Ok(Self {
            flight_id: flight_id.map(str::to_string),
            timestamp: to_utc(fix.timestamp)?,
            lat: fix.lat,
            lon: fix.lon,
            bearing: fix.bearing,
            bearing_change_rate: fix.bearing_change_rate,
            ground_speed: fix.ground_speed,
            altitude: fix.altitude,
            flying: fix.flying,
            circling: fix.circling,
            in_thermal: record.in_thermal,
            phase_start: to_utc(record.phase_start)?,
        })
    }
}

/// One row of the per-thermal table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_id: Option<String>,
    pub enter_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub enter_lat: f64,
    pub enter_lon: f64,
    pub exit_lat: f64,
    pub exit_lon: f64,
    /// Seconds
    pub duration: i64,
    pub altitude_change: f64,
    /// Empty for a zero-duration thermal kept under `DegeneratePolicy::Blank`
    pub vertical_velocity: Option<f64>,
    pub enter_altitude: f64,
    pub exit_altitude: f64,
    pub drift_distance: f64,
}

impl ThermalRow {
    fn from_summary(summary: &ThermalSummary, flight_id: Option<&str>) -> Result<Self> {
        Ok(Self {
            flight_id: flight_id.map(str::to_string),
            enter_time: to_utc(summary.enter_time)?,
            exit_time: to_utc(summary.exit_time)?,
            enter_lat: summary.enter_lat,
            enter_lon: summary.enter_lon,
            exit_lat: summary.exit_lat,
            exit_lon: summary.exit_lon,
            duration: summary.duration,
            altitude_change: summary.altitude_change,
            vertical_velocity: Some(summary.vertical_velocity),
            enter_altitude: summary.enter_altitude,
            exit_altitude: summary.exit_altitude,
            drift_distance: summary.drift_distance,
        })
    }

    fn blank(thermal: &Thermal, flight_id: Option<&str>) -> Result<Self> {
        let enter = &thermal.enter_fix;
        let exit = &thermal.exit_fix;
        Ok(Self {
            flight_id: flight_id.map(str::to_string),
            enter_time: to_utc(enter.timestamp)?,
            exit_time: to_utc(exit.timestamp)?,
            enter_lat: enter.lat,
            enter_lon: enter.lon,
            exit_lat: exit.lat,
            exit_lon: exit.lon,
            duration: thermal.duration(),
            altitude_change: thermal.altitude_change(),
            vertical_velocity: None,
            enter_altitude: enter.altitude,
            exit_altitude: exit.altitude,
            drift_distance: thermal.drift_distance(),
        })
    }
}

/// Per-fix table of a flight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixTable {
    pub rows: Vec<FixRow>,
}

impl FixTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the table as CSV with a header row. An empty table writes nothing.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        write_csv_rows(&self.rows, writer)
    }

    /// Render the rows as a JSON array.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.rows)?)
    }
}

/// Per-thermal table of a flight.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThermalTable {
    pub rows: Vec<ThermalRow>,
}

impl ThermalTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the table as CSV with a header row. An empty table writes nothing.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        write_csv_rows(&self.rows, writer)
    }

    /// Render the rows as a JSON array.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.rows)?)
    }
}

/// Build the per-fix table: every fix with its thermal membership and phase start.
///
/// # Errors
/// `InvalidFlight` if the upstream validator rejected the flight, `InvalidInput`
/// for out-of-range thermals and `InvalidTimestamp` for unrepresentable times.
pub fn fix_table(flight: &Flight, config: &TableConfig) -> Result<FixTable> {
    ensure_valid(flight)?;

    let records = annotate(&flight.fixes, &flight.thermals)?;
    let flight_id = config
        .include_flight_id
        .then_some(flight.flight_id.as_str());

    let rows = records
        .iter()
        .map(|record| FixRow::from_record(record, flight_id))
        .collect::<Result<Vec<_>>>()?;

    info!(
        "[Table] Built fix table for '{}': {} rows",
        flight.flight_id,
        rows.len()
    );

    Ok(FixTable { rows })
}

/// Build the per-thermal table, applying `config.degenerate_policy` to
/// zero-duration thermals.
pub fn thermal_table(flight: &Flight, config: &TableConfig) -> Result<ThermalTable> {
    ensure_valid(flight)?;

    #[cfg(feature = "parallel")]
    let summaries =
        crate::thermals::summarize_parallel(&flight.thermals, config.parallel_threshold);
    #[cfg(not(feature = "parallel"))]
    let summaries = crate::thermals::summarize(&flight.thermals);

    let flight_id = config
        .include_flight_id
        .then_some(flight.flight_id.as_str());

    let mut rows = Vec::with_capacity(summaries.len());
    for (thermal, summary) in flight.thermals.iter().zip(summaries) {
        let row = match summary {
            Ok(summary) => ThermalRow::from_summary(&summary, flight_id)?,
            Err(err) => match config.degenerate_policy {
                DegeneratePolicy::Fail => return Err(err),
                DegeneratePolicy::Skip => {
                    warn!("[Table] Skipping thermal in '{}': {}", flight.flight_id, err);
                    continue;
                }
                DegeneratePolicy::Blank => ThermalRow::blank(thermal, flight_id)?,
            },
        };
        rows.push(row);
    }

    info!(
        "[Table] Built thermal table for '{}': {} of {} thermals",
        flight.flight_id,
        rows.len(),
        flight.thermals.len()
    );

    Ok(ThermalTable { rows })
}

fn ensure_valid(flight: &Flight) -> Result<()> {
    if flight.valid {
        Ok(())
    } else {
        Err(FlightTableError::InvalidFlight {
            flight_id: flight.flight_id.clone(),
            notes: flight.notes.clone(),
        })
    }
}

fn to_utc(timestamp: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp, 0).ok_or(FlightTableError::InvalidTimestamp { timestamp })
}

fn write_csv_rows<T: Serialize, W: Write>(rows: &[T], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
