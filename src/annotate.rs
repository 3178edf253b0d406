//! Per-fix annotation: thermal membership and phase start.
//!
//! ## Algorithm
//! 1. Mark every fix inside a thermal's half-open range `[enter, exit)`
//! 2. Flag a boundary wherever `in_thermal` or `flying` changes (the first fix always is one)
//! 3. Forward-fill the timestamp of the most recent boundary onto every fix
//!
//! The forward-fill is a strict left-to-right fold, so this is a serial O(n) scan.

use serde::{Deserialize, Serialize};

use crate::error::{FlightTableError, Result};
use crate::{Fix, Thermal};
use log::debug;

/// A fix together with its thermal membership and the start of its phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedFix {
    #[serde(flatten)]
    pub fix: Fix,
    /// Whether the fix lies inside a thermal (exit fix excluded)
    pub in_thermal: bool,
    /// Timestamp of the fix at which the current phase began
    pub phase_start: i64,
}

/// Mark which of `fix_count` fixes fall inside a thermal.
///
/// Each thermal covers `[enter_fix.index, exit_fix.index)`. Thermals are assumed
/// ordered and non-overlapping; overlapping ones are simply marked twice.
///
/// # Errors
/// `InvalidInput` if a thermal's indices fall outside `0..fix_count` or are reversed.
pub fn mark_thermals(fix_count: usize, thermals: &[Thermal]) -> Result<Vec<bool>> {
    let mut in_thermal = vec![false; fix_count];

    for (i, thermal) in thermals.iter().enumerate() {
        let enter = thermal.enter_fix.index;
        let exit = thermal.exit_fix.index;

        if enter >= fix_count || exit >= fix_count || enter > exit {
            return Err(FlightTableError::InvalidInput {
                thermal: i,
                enter_index: enter,
                exit_index: exit,
                fix_count,
            });
        }

        in_thermal[enter..exit].fill(true);
    }

    Ok(in_thermal)
}

/// Flag the fixes at which a new phase begins.
///
/// A fix is a boundary when its thermal membership or its `flying` flag
/// differs from the previous fix. The first fix has no predecessor and is
/// always a boundary.
pub fn detect_boundaries(fixes: &[Fix], in_thermal: &[bool]) -> Vec<bool> {
    let mut previous: Option<(bool, bool)> = None;

    fixes
        .iter()
        .zip(in_thermal)
        .map(|(fix, &thermalling)| {
            let boundary = match previous {
                None => true,
                Some((prev_thermalling, prev_flying)) => {
                    thermalling != prev_thermalling || fix.flying != prev_flying
                }
            };
            previous = Some((thermalling, fix.flying));
            boundary
        })
        .collect()
}

/// Carry the most recent boundary timestamp forward.
///
/// Takes `(timestamp, is_boundary)` pairs and an initial phase timestamp.
/// Returns the phase start for every item and the final state, so a long track
/// can be processed in chunks by feeding the state of one call into the next.
pub fn forward_fill<I>(initial: Option<i64>, items: I) -> (Vec<i64>, Option<i64>)
where
    I: IntoIterator<Item = (i64, bool)>,
{
    let items = items.into_iter();
    let mut phase_starts = Vec::with_capacity(items.size_hint().0);

    let last = items.fold(initial, |current, (timestamp, boundary)| {
        let phase_start = match current {
            Some(start) if !boundary => start,
            _ => timestamp,
        };
        phase_starts.push(phase_start);
        Some(phase_start)
    });

    (phase_starts, last)
}

/// Annotate every fix with thermal membership and phase start.
///
/// Output record `i` corresponds to `fixes[i]`. An empty fix sequence yields
/// an empty result.
///
/// # Errors
/// `InvalidInput` if any thermal references a fix outside `fixes`. Nothing is
/// returned for the other fixes in that case.
pub fn annotate(fixes: &[Fix], thermals: &[Thermal]) -> Result<Vec<AnnotatedFix>> {
    let in_thermal = mark_thermals(fixes.len(), thermals)?;
    let boundaries = detect_boundaries(fixes, &in_thermal);

    let (phase_starts, _) = forward_fill(
        None,
        fixes
            .iter()
            .map(|fix| fix.timestamp)
            .zip(boundaries.iter().copied()),
    );

    debug!(
        "[Annotate] {} fixes, {} thermals, {} phase boundaries",
        fixes.len(),
        thermals.len(),
        boundaries.iter().filter(|&&b| b).count()
    );

    Ok(fixes
        .iter()
        .zip(in_thermal)
        .zip(phase_starts)
        .map(|((fix, in_thermal), phase_start)| AnnotatedFix {
            fix: *fix,
            in_thermal,
            phase_start,
        })
        .collect())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixes 10s apart, with `flying` taken from the pattern.
    fn make_fixes(flying: &[bool]) -> Vec<Fix> {
        flying
            .iter()
            .enumerate()
            .map(|(i, &f)| Fix::new(i, 100 + i as i64 * 10, 46.0, 8.0, 1000.0).with_flags(f, false))
            .collect()
    }

    fn thermal(fixes: &[Fix], enter: usize, exit: usize) -> Thermal {
        Thermal::from_fixes(fixes, enter, exit).unwrap()
    }

    #[test]
    fn test_empty_input() {
        let records = annotate(&[], &[]).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_length_and_order_preserved() {
        let fixes = make_fixes(&[true; 12]);
        let thermals = vec![thermal(&fixes, 2, 5), thermal(&fixes, 7, 10)];
        let records = annotate(&fixes, &thermals).unwrap();

        assert_eq!(records.len(), fixes.len());
        for (record, fix) in records.iter().zip(&fixes) {
            assert_eq!(record.fix, *fix);
        }
    }

    #[test]
    fn test_half_open_marking() {
        let fixes = make_fixes(&[true; 8]);
        let in_thermal = mark_thermals(fixes.len(), &[thermal(&fixes, 2, 5)]).unwrap();
        assert_eq!(
            in_thermal,
            vec![false, false, true, true, true, false, false, false]
        );
    }

    #[test]
    fn test_adjacent_thermals_share_boundary_fix() {
        let fixes = make_fixes(&[true; 8]);
        let thermals = vec![thermal(&fixes, 1, 4), thermal(&fixes, 4, 6)];
        let in_thermal = mark_thermals(fixes.len(), &thermals).unwrap();

        // Fix 4 exits the first thermal and enters the second: covered once
        assert_eq!(
            in_thermal,
            vec![false, true, true, true, true, true, false, false]
        );

        let records = annotate(&fixes, &thermals).unwrap();
        // No boundary between the two thermals since membership never changes
        assert!(records[1..6].iter().all(|r| r.phase_start == fixes[1].timestamp));
    }

    #[test]
    fn test_zero_length_thermal_is_inert() {
        let fixes = make_fixes(&[true; 5]);
        let records = annotate(&fixes, &[thermal(&fixes, 3, 3)]).unwrap();
        assert!(records.iter().all(|r| !r.in_thermal));
        assert!(records.iter().all(|r| r.phase_start == fixes[0].timestamp));
    }

    #[test]
    fn test_out_of_range_thermal_rejected() {
        let fixes = make_fixes(&[true; 5]);
        let mut bad = thermal(&fixes, 1, 4);
        bad.exit_fix.index = 5;

        let result = annotate(&fixes, &[thermal(&fixes, 0, 1), bad]);
        assert_eq!(
            result,
            Err(FlightTableError::InvalidInput {
                thermal: 1,
                enter_index: 1,
                exit_index: 5,
                fix_count: 5,
            })
        );
    }

    #[test]
    fn test_reversed_thermal_rejected() {
        let fixes = make_fixes(&[true; 5]);
        let mut bad = thermal(&fixes, 1, 3);
        std::mem::swap(&mut bad.enter_fix, &mut bad.exit_fix);
        assert!(matches!(
            annotate(&fixes, &[bad]),
            Err(FlightTableError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_first_fix_is_boundary() {
        let fixes = make_fixes(&[false, false, true]);
        let boundaries = detect_boundaries(&fixes, &[false, false, false]);
        assert_eq!(boundaries, vec![true, false, true]);

        let records = annotate(&fixes, &[]).unwrap();
        assert_eq!(records[0].phase_start, fixes[0].timestamp);
    }

    #[test]
    fn test_boundary_on_either_signal() {
        let fixes = make_fixes(&[false, true, true, true, true, true, false]);
        let in_thermal = [false, false, false, true, true, false, false];
        let boundaries = detect_boundaries(&fixes, &in_thermal);
        assert_eq!(
            boundaries,
            vec![true, true, false, true, false, true, true]
        );
    }

    #[test]
    fn test_no_thermals_phases_follow_flying() {
        let fixes = make_fixes(&[false, false, true, true, true, false]);
        let records = annotate(&fixes, &[]).unwrap();

        let starts: Vec<i64> = records.iter().map(|r| r.phase_start).collect();
        assert_eq!(starts, vec![100, 100, 120, 120, 120, 150]);
        assert!(records.iter().all(|r| !r.in_thermal));
    }

    #[test]
    fn test_constant_state_single_phase() {
        let fixes = make_fixes(&[true; 20]);
        let records = annotate(&fixes, &[]).unwrap();
        assert!(records.iter().all(|r| r.phase_start == fixes[0].timestamp));
    }

    #[test]
    fn test_phase_start_monotone_and_anchored() {
        let flying: Vec<bool> = (0..40).map(|i| (3..36).contains(&i)).collect();
        let fixes = make_fixes(&flying);
        let thermals = vec![
            thermal(&fixes, 5, 9),
            thermal(&fixes, 12, 20),
            thermal(&fixes, 25, 26),
        ];
        let records = annotate(&fixes, &thermals).unwrap();
        let in_thermal: Vec<bool> = records.iter().map(|r| r.in_thermal).collect();
        let boundaries = detect_boundaries(&fixes, &in_thermal);

        for pair in records.windows(2) {
            assert!(pair[0].phase_start <= pair[1].phase_start);
        }
        for (i, record) in records.iter().enumerate() {
            let anchor = (0..=i)
                .rev()
                .find(|&j| boundaries[j])
                .expect("first fix is a boundary");
            assert_eq!(record.phase_start, fixes[anchor].timestamp);
        }
    }

    #[test]
    fn test_forward_fill_carries_state() {
        let (first, state) = forward_fill(None, vec![(10, true), (20, false), (30, true)]);
        assert_eq!(first, vec![10, 10, 30]);
        assert_eq!(state, Some(30));

        // Continuing a chunk: no boundary keeps the carried phase
        let (second, state) = forward_fill(state, vec![(40, false), (50, false)]);
        assert_eq!(second, vec![30, 30]);
        assert_eq!(state, Some(30));

        // Without prior state the first item starts a phase
        let (fresh, _) = forward_fill(None, vec![(40, false)]);
        assert_eq!(fresh, vec![40]);
    }

    #[test]
    fn test_serializes_flat() {
        let fixes = make_fixes(&[true]);
        let records = annotate(&fixes, &[]).unwrap();
        let json = serde_json::to_value(records[0]).unwrap();
        assert_eq!(json["timestamp"], 100);
        assert_eq!(json["phase_start"], 100);
        assert_eq!(json["in_thermal"], false);
    }
}
