//! Finite-domain constraint programming with trail-based backtracking.
//!
//! The crate is organized around a [`Solver`] façade that owns every model
//! object: integer variables with three domain representations, lazy integer
//! expressions, constraints posting demons on variable events, a
//! three-priority propagation queue, and a depth-first search driven by
//! pluggable decision builders and search monitors.
//!
//! A minimal solve looks like:
//!
//! ```no_run
//! use coppice::{Solver, SolverParameters};
//! use coppice::search::phase::{Phase, ValueStrategy, VarStrategy};
//!
//! let mut solver = Solver::new(SolverParameters::default());
//! let x = solver.new_int_var(0, 10, "x");
//! let y = solver.new_int_var(0, 10, "y");
//! let c = solver.linear_eq(&[x, y], &[1, 1], 5).unwrap();
//! solver.add_constraint(c).unwrap();
//! let mut db = Phase::new(vec![x, y], VarStrategy::FirstUnbound, ValueStrategy::Min);
//! assert!(solver.solve(&mut db, &mut []));
//! ```

use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

#[cfg(test)]
use rstest_reuse;

pub mod constraints;
pub mod domain;
pub mod expr;
pub mod limits;
pub mod metaheuristics;
pub mod monitors;
pub mod objective;
pub mod precedence;
pub mod queue;
pub mod search;
pub mod solver;
pub mod store;
pub mod trail;
pub mod util;
pub mod vars;

#[cfg(test)]
pub mod tests;

pub use monitors::{Assignment, SearchMonitor, SolutionCollector};
pub use search::decision::{Decision, DecisionBuilder};
pub use solver::{Constraint, Solver};
pub use vars::{Lit, VarId};

/// Status codes for a constraint solve.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    /// No search has been run yet.
    Idle,
    /// A search is in progress.
    Running,
    /// At least one solution was accepted.
    Feasible,
    /// The search space was exhausted without an accepted solution.
    Infeasible,
    /// The solver stopped because a search limit fired.
    LimitReached,
    /// The solver was interrupted (e.g., by user or signal).
    Interrupted,
}

/// A contradiction discovered during propagation.
///
/// This is the normal control-flow signal of the engine: it travels up as a
/// `Result` to the innermost choice point, which unwinds the trail and tries
/// the refuted branch. It is never surfaced to the caller of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Conflict;

/// Result type of every operation that may detect a contradiction.
pub type PropResult = Result<(), Conflict>;

/// Errors raised while *building* a model.
///
/// Unlike [`Conflict`], these are not recoverable by backtracking: the model
/// is malformed and the solver should be discarded.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Division or modulo by zero in an expression factory.
    #[display("division by zero in expression")]
    DivisionByZero,
    /// Two parallel arrays (variables/coefficients, tasks/durations, ...)
    /// have different lengths.
    #[display("mismatched array lengths: {left} vs {right}")]
    ArityMismatch { left: usize, right: usize },
    /// A constraint or phase was given no variables.
    #[display("empty variable list")]
    EmptyVariableList,
    /// A variable was created from an empty value list.
    #[display("empty domain")]
    EmptyDomain,
    /// A piecewise-linear function has unsorted or duplicate breakpoints.
    #[display("malformed piecewise-linear function")]
    BadPiecewiseFunction,
}

/// Recognized solver options.
///
/// The field names follow the `cp_*` option names of the configuration
/// surface: `cp_share_int_consts`, `cp_disable_expression_optimization` and
/// `cp_large_domain_no_splitting_limit`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverParameters {
    /// Pool small integer constants so repeated `new_int_const` calls with
    /// the same value share one variable.
    pub share_int_consts: bool,
    /// Skip the canonicalization cache of the expression factories.
    pub disable_expression_optimization: bool,
    /// Domain size above which the `Random` and `Center` value selectors
    /// degrade to the domain minimum, to avoid punching holes in very large
    /// domains.
    pub large_domain_no_splitting_limit: i64,
    /// Seed of the solver-owned RNG (random selectors, simulated annealing).
    pub seed: u64,
}

impl Default for SolverParameters {
    fn default() -> Self {
        Self {
            share_int_consts: true,
            disable_expression_optimization: false,
            large_domain_no_splitting_limit: 0xFFFF,
            seed: 0,
        }
    }
}
