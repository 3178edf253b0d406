//! # Flight Tables
//!
//! Converts a parsed flight track into tables suitable for analysis.
//!
//! This library provides:
//! - Per-fix annotation: thermal membership and the start of the current flight phase
//! - Per-thermal summaries: timing, position, altitude change and climb rate
//! - Phase segmentation and CSV/JSON rendering of both tables
//!
//! ## Features
//!
//! - **`parallel`** - Summarize thermals in parallel with rayon
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use flight_tables::{annotate, summarize, Fix, Flight};
//!
//! let fixes: Vec<Fix> = (0..6)
//!     .map(|i| Fix::new(i, 1_560_000_000 + i as i64 * 4, 46.0, 8.0, 1000.0 + i as f64 * 10.0))
//!     .collect();
//!
//! let mut flight = Flight::new("example.igc", fixes);
//! flight.add_thermal(1, 4).unwrap();
//!
//! let records = annotate(&flight.fixes, &flight.thermals).unwrap();
//! assert_eq!(records.len(), 6);
//! assert!(records[1].in_thermal && !records[4].in_thermal);
//!
//! let summaries = summarize(&flight.thermals);
//! assert_eq!(summaries[0].as_ref().unwrap().altitude_change, 30.0);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{FlightTableError, OptionExt, Result};

// Thermal marking, boundary detection and phase forward-fill
pub mod annotate;
pub use annotate::{annotate, detect_boundaries, forward_fill, mark_thermals, AnnotatedFix};

// Per-thermal summaries
pub mod thermals;
#[cfg(feature = "parallel")]
pub use thermals::summarize_parallel;
pub use thermals::{summarize, ThermalSummary};

// Maximal runs of equal (in_thermal, flying) state
pub mod phases;
pub use phases::{segment_phases, Phase, PhaseKind};

// Row tables, CSV and JSON rendering
pub mod table;
pub use table::{
    fix_table, thermal_table, DegeneratePolicy, FixRow, FixTable, TableConfig, ThermalRow,
    ThermalTable,
};

// ============================================================================
// Core Types
// ============================================================================

/// One GNSS sample with the flight-state flags derived upstream.
///
/// `altitude` is the single canonical altitude (pressure or GNSS) picked by
/// whoever built the flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Ordinal position in the flight's fix sequence
    pub index: usize,
    /// Seconds since the Unix epoch
    pub timestamp: i64,
    pub lat: f64,
    pub lon: f64,
    /// Bearing in degrees
    pub bearing: f64,
    /// Bearing change in degrees per second
    pub bearing_change_rate: f64,
    /// Ground speed in km/h
    pub ground_speed: f64,
    /// Altitude in meters
    pub altitude: f64,
    pub flying: bool,
    pub circling: bool,
}

impl Fix {
    /// Create a flying, non-circling fix with zeroed motion fields.
    pub fn new(index: usize, timestamp: i64, lat: f64, lon: f64, altitude: f64) -> Self {
        Self {
            index,
            timestamp,
            lat,
            lon,
            bearing: 0.0,
            bearing_change_rate: 0.0,
            ground_speed: 0.0,
            altitude,
            flying: true,
            circling: false,
        }
    }

    pub fn with_flags(mut self, flying: bool, circling: bool) -> Self {
        self.flying = flying;
        self.circling = circling;
        self
    }

    pub fn with_motion(mut self, bearing: f64, bearing_change_rate: f64, ground_speed: f64) -> Self {
        self.bearing = bearing;
        self.bearing_change_rate = bearing_change_rate;
        self.ground_speed = ground_speed;
        self
    }
}

/// A climbing segment bounded by the fix it was entered at and the fix it
/// was exited by.
///
/// Both fixes are read-only copies; their `index` locates them in the flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thermal {
    pub enter_fix: Fix,
    pub exit_fix: Fix,
}

impl Thermal {
    /// Build a thermal from positions in a fix sequence.
    ///
    /// Returns `None` if either index is out of range or `enter_index > exit_index`.
    pub fn from_fixes(fixes: &[Fix], enter_index: usize, exit_index: usize) -> Option<Self> {
        if enter_index > exit_index {
            return None;
        }
        Some(Self {
            enter_fix: *fixes.get(enter_index)?,
            exit_fix: *fixes.get(exit_index)?,
        })
    }

    /// Time spent in the thermal in seconds.
    pub fn duration(&self) -> i64 {
        self.exit_fix.timestamp - self.enter_fix.timestamp
    }

    /// Altitude gained (negative if lost) in meters.
    pub fn altitude_change(&self) -> f64 {
        self.exit_fix.altitude - self.enter_fix.altitude
    }

    /// Average climb rate in m/s, or `None` for a zero-duration thermal.
    pub fn vertical_velocity(&self) -> Option<f64> {
        let duration = self.duration();
        if duration > 0 {
            Some(self.altitude_change() / duration as f64)
        } else {
            None
        }
    }

    /// Great-circle distance in meters between the enter and exit positions.
    pub fn drift_distance(&self) -> f64 {
        use geo::{Distance, Haversine, Point};
        let enter = Point::new(self.enter_fix.lon, self.enter_fix.lat);
        let exit = Point::new(self.exit_fix.lon, self.exit_fix.lat);
        Haversine::distance(enter, exit)
    }
}

/// A parsed flight: its fixes and the thermals detected in them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    /// Identifier of the source track log (usually its file name)
    pub flight_id: String,
    pub fixes: Vec<Fix>,
    /// Ordered, non-overlapping thermals
    pub thermals: Vec<Thermal>,
    /// Verdict of the upstream validator
    pub valid: bool,
    /// Reasons the upstream validator gave, if any
    pub notes: Vec<String>,
}

impl Flight {
    /// Create a valid flight with no thermals.
    pub fn new(flight_id: &str, fixes: Vec<Fix>) -> Self {
        Self {
            flight_id: flight_id.to_string(),
            fixes,
            thermals: Vec::new(),
            valid: true,
            notes: Vec::new(),
        }
    }

    /// Append a thermal spanning the given fix positions.
    pub fn add_thermal(&mut self, enter_index: usize, exit_index: usize) -> Result<()> {
        let thermal = Thermal::from_fixes(&self.fixes, enter_index, exit_index)
            .ok_or_invalid_input(
                self.thermals.len(),
                enter_index,
                exit_index,
                self.fixes.len(),
            )?;
        self.thermals.push(thermal);
        Ok(())
    }

    /// Mark the flight invalid with a reason, as an upstream validator would.
    pub fn invalidate(&mut self, note: &str) {
        self.valid = false;
        self.notes.push(note.to_string());
    }
}

// ============================================================================
// Tests
// ============================================================================
