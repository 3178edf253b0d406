//! Phase segmentation of annotated fixes.
//!
//! A phase is a maximal run of consecutive fixes sharing the same
//! `(in_thermal, flying)` pair. Its start time is the `phase_start` every fix
//! in the run already carries.

use serde::{Deserialize, Serialize};

use crate::AnnotatedFix;

/// What the pilot was doing during a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Thermalling,
    Gliding,
    Ground,
}

impl PhaseKind {
    pub fn from_state(in_thermal: bool, flying: bool) -> Self {
        match (in_thermal, flying) {
            (true, _) => PhaseKind::Thermalling,
            (false, true) => PhaseKind::Gliding,
            (false, false) => PhaseKind::Ground,
        }
    }
}

/// A maximal run of fixes with unchanged thermal and flying state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub kind: PhaseKind,
    pub in_thermal: bool,
    pub flying: bool,
    /// Timestamp of the first fix of the phase
    pub start_time: i64,
    /// Timestamp of the last fix of the phase
    pub end_time: i64,
    /// Fix index of the first fix
    pub start_index: usize,
    /// Fix index of the last fix (inclusive)
    pub end_index: usize,
    pub fix_count: usize,
}

impl Phase {
    fn open(record: &AnnotatedFix) -> Self {
        Self {
            kind: PhaseKind::from_state(record.in_thermal, record.fix.flying),
            in_thermal: record.in_thermal,
            flying: record.fix.flying,
            start_time: record.phase_start,
            end_time: record.fix.timestamp,
            start_index: record.fix.index,
            end_index: record.fix.index,
            fix_count: 1,
        }
    }

    fn continues_with(&self, record: &AnnotatedFix) -> bool {
        self.in_thermal == record.in_thermal && self.flying == record.fix.flying
    }

    /// Seconds from the first to the last fix of the phase.
    pub fn duration(&self) -> i64 {
        self.end_time - self.start_time
    }
}

/// Split annotated fixes into phases, in order.
pub fn segment_phases(records: &[AnnotatedFix]) -> Vec<Phase> {
    let mut phases: Vec<Phase> = Vec::new();

    for record in records {
        match phases.last_mut() {
            Some(current) if current.continues_with(record) => {
                current.end_time = record.fix.timestamp;
                current.end_index = record.fix.index;
                current.fix_count += 1;
            }
            _ => phases.push(Phase::open(record)),
        }
    }

    phases
}
