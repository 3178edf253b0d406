//! Unified error handling for the flight-tables library.
//!
//! Annotation failures abort the whole call, while degenerate thermals are
//! reported per record so a caller can decide whether to drop, blank or fail.

use std::fmt;

/// Unified error type for flight-tables operations.
#[derive(Debug, Clone, PartialEq)]
pub enum FlightTableError {
    /// A thermal references fixes outside the flight's fix sequence
    InvalidInput {
        thermal: usize,
        enter_index: usize,
        exit_index: usize,
        fix_count: usize,
    },
    /// A thermal with zero duration, so no vertical velocity exists
    DegenerateInterval { thermal: usize, enter_time: i64 },
    /// A fix timestamp that cannot be represented as a UTC datetime
    InvalidTimestamp { timestamp: i64 },
    /// The upstream validator rejected the flight
    InvalidFlight {
        flight_id: String,
        notes: Vec<String>,
    },
    /// CSV/JSON rendering error
    Export { message: String },
}

impl fmt::Display for FlightTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlightTableError::InvalidInput {
                thermal,
                enter_index,
                exit_index,
                fix_count,
            } => {
                write!(
                    f,
                    "Thermal {} spans fixes {}..{}, but the flight has {} fixes",
                    thermal, enter_index, exit_index, fix_count
                )
            }
            FlightTableError::DegenerateInterval {
                thermal,
                enter_time,
            } => {
                write!(
                    f,
                    "Thermal {} at t={} has zero duration",
                    thermal, enter_time
                )
            }
            FlightTableError::InvalidTimestamp { timestamp } => {
                write!(f, "Timestamp {} is out of range", timestamp)
            }
            FlightTableError::InvalidFlight { flight_id, notes } => {
                if notes.is_empty() {
                    write!(f, "Flight '{}' is invalid", flight_id)
                } else {
                    write!(f, "Flight '{}' is invalid: {}", flight_id, notes.join("; "))
                }
            }
            FlightTableError::Export { message } => {
                write!(f, "Export error: {}", message)
            }
        }
    }
}

impl std::error::Error for FlightTableError {}

impl From<csv::Error> for FlightTableError {
    fn from(err: csv::Error) -> Self {
        FlightTableError::Export {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for FlightTableError {
    fn from(err: serde_json::Error) -> Self {
        FlightTableError::Export {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for FlightTableError {
    fn from(err: std::io::Error) -> Self {
        FlightTableError::Export {
            message: err.to_string(),
        }
    }
}

/// Result type alias for flight-tables operations.
pub type Result<T> = std::result::Result<T, FlightTableError>;

/// Extension trait for converting Option to FlightTableError.
pub trait OptionExt<T> {
    /// Convert Option to Result with an invalid input error for a thermal.
    fn ok_or_invalid_input(
        self,
        thermal: usize,
        enter_index: usize,
        exit_index: usize,
        fix_count: usize,
    ) -> Result<T>;

    /// Convert Option to Result with a degenerate interval error.
    fn ok_or_degenerate(self, thermal: usize, enter_time: i64) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_invalid_input(
        self,
        thermal: usize,
        enter_index: usize,
        exit_index: usize,
        fix_count: usize,
    ) -> Result<T> {
        self.ok_or(FlightTableError::InvalidInput {
            thermal,
            enter_index,
            exit_index,
            fix_count,
        })
    }

    fn ok_or_degenerate(self, thermal: usize, enter_time: i64) -> Result<T> {
        self.ok_or(FlightTableError::DegenerateInterval {
            thermal,
            enter_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FlightTableError::InvalidInput {
            thermal: 2,
            enter_index: 10,
            exit_index: 40,
            fix_count: 30,
        };
        assert!(err.to_string().contains("Thermal 2"));
        assert!(err.to_string().contains("30 fixes"));

        let err = FlightTableError::InvalidFlight {
            flight_id: "2019-07-01.igc".to_string(),
            notes: vec!["no takeoff".to_string(), "gaps".to_string()],
        };
        assert!(err.to_string().contains("no takeoff; gaps"));
    }

    #[test]
    fn test_option_ext() {
        let none: Option<f64> = None;
        let result = none.ok_or_degenerate(0, 100);
        assert!(matches!(
            result,
            Err(FlightTableError::DegenerateInterval { thermal: 0, .. })
        ));

        let some = Some(3usize).ok_or_invalid_input(0, 1, 2, 3);
        assert_eq!(some, Ok(3));
    }
}
