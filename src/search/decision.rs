//! Decisions and decision builders.

use crate::solver::Solver;
use crate::trail::RevCell;
use crate::vars::VarId;
use crate::{Conflict, PropResult};

/// A choice point: a left (apply) and a right (refute) action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Left: `var == value`; right: `var != value`.
    Assign { var: VarId, value: i64 },
    /// Left: `var <= value`; right: `var > value`.
    SplitLow { var: VarId, value: i64 },
    /// Left: `var >= value`; right: `var < value`.
    SplitHigh { var: VarId, value: i64 },
    /// Reversible-cell write: `left` on apply, `right` on refute. Used by
    /// the `Try` combinator to branch over sub-builders.
    Commit { cell: RevCell, left: i64, right: i64 },
    /// Both branches fail; used to bubble a nested-search failure.
    Fail,
}

impl Decision {
    pub fn apply(&self, s: &mut Solver) -> PropResult {
        match *self {
            Decision::Assign { var, value } => s.set_value(var, value),
            Decision::SplitLow { var, value } => s.set_max(var, value),
            Decision::SplitHigh { var, value } => s.set_min(var, value),
            Decision::Commit { cell, left, .. } => {
                s.store.trail.set(cell, left);
                Ok(())
            }
            Decision::Fail => Err(Conflict),
        }
    }

    pub fn refute(&self, s: &mut Solver) -> PropResult {
        match *self {
            Decision::Assign { var, value } => s.remove_value(var, value),
            Decision::SplitLow { var, value } => s.set_min(var, value + 1),
            Decision::SplitHigh { var, value } => s.set_max(var, value - 1),
            Decision::Commit { cell, right, .. } => {
                s.store.trail.set(cell, right);
                Ok(())
            }
            Decision::Fail => Err(Conflict),
        }
    }
}

/// A stateful factory for decisions; drives the depth-first search. `None`
/// means the builder is done and the current state is a candidate solution.
pub trait DecisionBuilder {
    /// Called once when a search session starts, at the session's root
    /// level; builders allocate their reversible state here.
    fn init(&mut self, s: &mut Solver) {
        let _ = s;
    }

    fn next(&mut self, s: &mut Solver) -> Option<Decision>;

    fn name(&self) -> &str {
        "decision_builder"
    }
}
