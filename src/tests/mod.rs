//! Cross-component scenario tests.

mod objective;
mod propagation;
mod queens;
mod search;

use crate::search::phase::{Phase, ValueStrategy, VarStrategy};
use crate::solver::Solver;
use crate::vars::VarId;
use crate::SolverParameters;

pub(crate) fn solver() -> Solver {
    Solver::new(SolverParameters::default())
}

pub(crate) fn min_phase(vars: Vec<VarId>) -> Phase {
    Phase::new(vars, VarStrategy::FirstUnbound, ValueStrategy::Min)
}

pub(crate) fn max_phase(vars: Vec<VarId>) -> Phase {
    Phase::new(vars, VarStrategy::FirstUnbound, ValueStrategy::Max)
}
