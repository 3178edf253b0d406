//! Per-thermal summaries.
//!
//! Each thermal is summarized independently: enter/exit timing and position,
//! altitude change and average climb rate. A zero-duration thermal has no
//! climb rate and is reported as `DegenerateInterval` for that record only.
//!
//! ## Example
//! ```rust
//! use flight_tables::{summarize, Fix, Thermal};
//!
//! let enter = Fix::new(0, 0, 46.0, 8.0, 1000.0);
//! let exit = Fix::new(1, 100, 46.0, 8.0, 1500.0);
//! let summaries = summarize(&[Thermal { enter_fix: enter, exit_fix: exit }]);
//! assert_eq!(summaries[0].as_ref().unwrap().vertical_velocity, 5.0);
//! ```

use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{OptionExt, Result};
use crate::Thermal;
use log::debug;

/// Summary of a single thermal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalSummary {
    /// Unix timestamp of the enter fix
    pub enter_time: i64,
    /// Unix timestamp of the exit fix
    pub exit_time: i64,
    pub enter_lat: f64,
    pub enter_lon: f64,
    pub exit_lat: f64,
    pub exit_lon: f64,
    /// Seconds between enter and exit
    pub duration: i64,
    /// Exit altitude minus enter altitude, meters
    pub altitude_change: f64,
    /// Average climb rate in m/s (negative when sinking)
    pub vertical_velocity: f64,
    pub enter_altitude: f64,
    pub exit_altitude: f64,
    /// Great-circle distance between enter and exit positions, meters
    pub drift_distance: f64,
}

impl ThermalSummary {
    /// Summarize the thermal at position `ordinal` of its flight.
    ///
    /// # Errors
    /// `DegenerateInterval` when enter and exit share a timestamp.
    pub fn from_thermal(ordinal: usize, thermal: &Thermal) -> Result<Self> {
        let enter = &thermal.enter_fix;
        let exit = &thermal.exit_fix;

        let vertical_velocity = thermal
            .vertical_velocity()
            .ok_or_degenerate(ordinal, enter.timestamp)?;

        Ok(Self {
            enter_time: enter.timestamp,
            exit_time: exit.timestamp,
            enter_lat: enter.lat,
            enter_lon: enter.lon,
            exit_lat: exit.lat,
            exit_lon: exit.lon,
            duration: thermal.duration(),
            altitude_change: thermal.altitude_change(),
            vertical_velocity,
            enter_altitude: enter.altitude,
            exit_altitude: exit.altitude,
            drift_distance: thermal.drift_distance(),
        })
    }
}

/// Summarize every thermal, one result per thermal in input order.
pub fn summarize(thermals: &[Thermal]) -> Vec<Result<ThermalSummary>> {
    let summaries: Vec<Result<ThermalSummary>> = thermals
        .iter()
        .enumerate()
        .map(|(i, thermal)| ThermalSummary::from_thermal(i, thermal))
        .collect();

    debug!(
        "[Thermals] Summarized {} thermals ({} degenerate)",
        summaries.len(),
        summaries.iter().filter(|s| s.is_err()).count()
    );

    summaries
}

/// Summarize thermals using parallel processing.
/// Falls back to sequential below `min_parallel_len` thermals.
#[cfg(feature = "parallel")]
pub fn summarize_parallel(thermals: &[Thermal], min_parallel_len: usize) -> Vec<Result<ThermalSummary>> {
    if thermals.len() < min_parallel_len {
        return summarize(thermals);
    }

    // Indexed parallel iterators collect in input order
    let summaries: Vec<Result<ThermalSummary>> = thermals
        .par_iter()
        .enumerate()
        .map(|(i, thermal)| ThermalSummary::from_thermal(i, thermal))
        .collect();

    debug!(
        "[Thermals] Summarized {} thermals in parallel",
        summaries.len()
    );

    summaries
}

// ============================================================================
// Tests
// ============================================================================
