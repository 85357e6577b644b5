//! Search monitors: callbacks on every search event.
//!
//! Monitors receive the solver by mutable reference so they can read state,
//! post constraints (objective monitors, metaheuristics) or request a stop
//! (limits). The fallible callbacks return a [`PropResult`]; an `Err` fails
//! the current node like any propagation conflict.

use serde::{Deserialize, Serialize};

use crate::search::decision::Decision;
use crate::solver::Solver;
use crate::vars::VarId;
use crate::PropResult;

/// Uniform search-event interface. Every callback has a default no-op so a
/// monitor subscribes to the subset it cares about.
#[allow(unused_variables)]
pub trait SearchMonitor {
    fn enter_search(&mut self, s: &mut Solver) {}
    fn restart_search(&mut self, s: &mut Solver) {}
    fn exit_search(&mut self, s: &mut Solver) {}

    fn begin_next_decision(&mut self, s: &mut Solver) -> PropResult {
        Ok(())
    }
    fn end_next_decision(&mut self, s: &mut Solver) {}
    fn apply_decision(&mut self, s: &mut Solver, d: &Decision) -> PropResult {
        Ok(())
    }
    fn refute_decision(&mut self, s: &mut Solver, d: &Decision) -> PropResult {
        Ok(())
    }
    fn after_decision(&mut self, s: &mut Solver, d: &Decision, applied: bool) {}

    fn begin_fail(&mut self, s: &mut Solver) {}
    fn end_fail(&mut self, s: &mut Solver) {}
    fn begin_initial_propagation(&mut self, s: &mut Solver) {}
    fn end_initial_propagation(&mut self, s: &mut Solver) {}

    /// Vetoes a candidate solution when it returns false.
    fn accept_solution(&mut self, s: &mut Solver) -> bool {
        true
    }
    /// Called on each accepted solution; the return value asks the search to
    /// keep going after this solution.
    fn at_solution(&mut self, s: &mut Solver) -> bool {
        false
    }
    fn no_more_solutions(&mut self, s: &mut Solver) {}

    /// Local-search events, used by the metaheuristics.
    fn at_local_optimum(&mut self, s: &mut Solver) -> bool {
        false
    }
    fn accept_neighbor(&mut self, s: &mut Solver) {}
    fn accept_delta(&mut self, s: &mut Solver) -> bool {
        true
    }
    fn accept_unchecked_neighbor(&mut self, s: &mut Solver) {}

    /// Cooperative check run on every branch; limits use it to request a
    /// stop.
    fn periodic_check(&mut self, s: &mut Solver) {}
}

// ---------- Assignment ----------

/// A value map over a subset of variables, with an optional objective
/// snapshot. The flat protocol external consumers read after a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    values: Vec<(VarId, i64)>,
    objective: Option<Vec<i64>>,
}

impl Assignment {
    /// Snapshots the listed variables; unbound variables record their
    /// current minimum.
    pub fn from_solver(s: &Solver, vars: &[VarId]) -> Assignment {
        Assignment {
            values: vars.iter().map(|&v| (v, s.value(v))).collect(),
            objective: None,
        }
    }

    pub fn with_objective(mut self, objective: Vec<i64>) -> Assignment {
        self.objective = Some(objective);
        self
    }

    pub fn value_of(&self, v: VarId) -> Option<i64> {
        self.values.iter().find(|(var, _)| *var == v).map(|&(_, value)| value)
    }

    pub fn objective(&self) -> Option<&[i64]> {
        self.objective.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, i64)> + '_ {
        self.values.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Re-applies the stored values at the solver's current level.
    pub fn restore(&self, s: &mut Solver) -> PropResult {
        for &(v, value) in &self.values {
            s.set_value(v, value)?;
        }
        s.propagate()
    }
}

// ---------- Solution collectors ----------

#[derive(Debug, Clone)]
pub enum CollectMode {
    /// Keep only the first solution.
    First,
    /// Keep only the most recent solution.
    Last,
    /// Keep the single best solution by objective value.
    Best { objective: VarId, maximize: bool },
    /// Keep the `n` best solutions by objective value.
    NBest { objective: VarId, maximize: bool, n: usize },
    /// Keep everything.
    All,
}

/// Stores snapshots of a user-selected subset of variables at each accepted
/// solution.
pub struct SolutionCollector {
    mode: CollectMode,
    vars: Vec<VarId>,
    solutions: Vec<Assignment>,
}

impl SolutionCollector {
    pub fn new(mode: CollectMode, vars: Vec<VarId>) -> Self {
        Self { mode, vars, solutions: Vec::new() }
    }

    pub fn first_solution(vars: Vec<VarId>) -> Self {
        Self::new(CollectMode::First, vars)
    }

    pub fn last_solution(vars: Vec<VarId>) -> Self {
        Self::new(CollectMode::Last, vars)
    }

    pub fn all_solutions(vars: Vec<VarId>) -> Self {
        Self::new(CollectMode::All, vars)
    }

    pub fn best_solution(objective: VarId, maximize: bool, vars: Vec<VarId>) -> Self {
        Self::new(CollectMode::Best { objective, maximize }, vars)
    }

    pub fn solution_count(&self) -> usize {
        self.solutions.len()
    }

    pub fn solution(&self, i: usize) -> Option<&Assignment> {
        self.solutions.get(i)
    }

    pub fn last(&self) -> Option<&Assignment> {
        self.solutions.last()
    }

    fn objective_key(a: &Assignment) -> i64 {
        a.objective().and_then(|o| o.first().copied()).unwrap_or(i64::MAX)
    }
}

impl SearchMonitor for SolutionCollector {
    fn enter_search(&mut self, _s: &mut Solver) {
        self.solutions.clear();
    }

    fn at_solution(&mut self, s: &mut Solver) -> bool {
        let snapshot = |obj: Option<VarId>| {
            let base = Assignment::from_solver(s, &self.vars);
            match obj {
                Some(v) => base.with_objective(vec![s.value(v)]),
                None => base,
            }
        };
        match &self.mode {
            CollectMode::First => {
                if self.solutions.is_empty() {
                    self.solutions.push(snapshot(None));
                }
            }
            CollectMode::Last => {
                self.solutions.clear();
                self.solutions.push(snapshot(None));
            }
            CollectMode::All => self.solutions.push(snapshot(None)),
            CollectMode::Best { objective, maximize } => {
                let cand = snapshot(Some(*objective));
                let better = match self.solutions.first() {
                    None => true,
                    Some(best) => {
                        let (b, c) = (Self::objective_key(best), Self::objective_key(&cand));
                        if *maximize { c > b } else { c < b }
                    }
                };
                if better {
                    self.solutions.clear();
                    self.solutions.push(cand);
                }
            }
            CollectMode::NBest { objective, maximize, n } => {
                let cand = snapshot(Some(*objective));
                self.solutions.push(cand);
                let maximize = *maximize;
                self.solutions.sort_by_key(|a| {
                    let k = Self::objective_key(a);
                    if maximize { -k } else { k }
                });
                self.solutions.truncate(*n);
            }
        }
        true
    }
}

// ---------- Search log ----------

/// Emits structured progress through the `log` facade: a line every
/// `period` branches and one per accepted solution.
pub struct SearchLog {
    period: u64,
    objective: Option<VarId>,
    next_report: u64,
}

impl SearchLog {
    pub fn new(period: u64) -> Self {
        Self { period, objective: None, next_report: 0 }
    }

    pub fn with_objective(mut self, objective: VarId) -> Self {
        self.objective = Some(objective);
        self
    }
}

impl SearchMonitor for SearchLog {
    fn enter_search(&mut self, s: &mut Solver) {
        self.next_report = s.stats().branches + self.period;
        log::info!("search started: {} variables", s.num_vars());
    }

    fn begin_next_decision(&mut self, s: &mut Solver) -> PropResult {
        let stats = s.stats();
        if stats.branches >= self.next_report {
            self.next_report = stats.branches + self.period;
            log::info!(
                "branches: {}, fails: {}, solutions: {}, depth: {}",
                stats.branches,
                stats.failures,
                stats.solutions,
                s.depth()
            );
        }
        Ok(())
    }

    fn at_solution(&mut self, s: &mut Solver) -> bool {
        match self.objective {
            Some(obj) => log::info!(
                "solution #{}: objective = {}",
                s.stats().solutions,
                s.value(obj)
            ),
            None => log::info!("solution #{}", s.stats().solutions),
        }
        false
    }

    fn exit_search(&mut self, s: &mut Solver) {
        let stats = s.stats();
        log::info!(
            "search ended: {} branches, {} fails, {} solutions",
            stats.branches,
            stats.failures,
            stats.solutions
        );
    }
}

// ---------- Search trace ----------

/// Verbose event log for debugging.
pub struct SearchTrace {
    prefix: String,
}

impl SearchTrace {
    pub fn new(prefix: &str) -> Self {
        Self { prefix: prefix.to_owned() }
    }
}

impl SearchMonitor for SearchTrace {
    fn enter_search(&mut self, _s: &mut Solver) {
        log::debug!("{} enter_search", self.prefix);
    }

    fn restart_search(&mut self, _s: &mut Solver) {
        log::debug!("{} restart_search", self.prefix);
    }

    fn exit_search(&mut self, _s: &mut Solver) {
        log::debug!("{} exit_search", self.prefix);
    }

    fn apply_decision(&mut self, _s: &mut Solver, d: &Decision) -> PropResult {
        log::debug!("{} apply_decision({d:?})", self.prefix);
        Ok(())
    }

    fn refute_decision(&mut self, _s: &mut Solver, d: &Decision) -> PropResult {
        log::debug!("{} refute_decision({d:?})", self.prefix);
        Ok(())
    }

    fn begin_fail(&mut self, _s: &mut Solver) {
        log::debug!("{} begin_fail", self.prefix);
    }

    fn at_solution(&mut self, _s: &mut Solver) -> bool {
        log::debug!("{} at_solution", self.prefix);
        false
    }

    fn no_more_solutions(&mut self, _s: &mut Solver) {
        log::debug!("{} no_more_solutions", self.prefix);
    }
}

// ---------- Symmetry breaking ----------

/// Maps a decision `var == value` to its symmetric image.
pub trait SymmetryBreaker {
    fn image(&mut self, s: &Solver, var: VarId, value: i64) -> Option<(VarId, i64)>;
}

/// Records, for each applied decision, the symmetric term of every
/// registered breaker; on refutation it posts a clause forbidding the
/// symmetric continuation.
pub struct SymmetryManager {
    breakers: Vec<Box<dyn SymmetryBreaker>>,
    /// One entry per currently applied decision: the depth it was applied
    /// at and the per-breaker symmetric terms.
    terms: Vec<(u32, Vec<Option<(VarId, i64)>>)>,
}

impl SymmetryManager {
    pub fn new(breakers: Vec<Box<dyn SymmetryBreaker>>) -> Self {
        Self { breakers, terms: Vec::new() }
    }

    fn prune_to_depth(&mut self, depth: u32) {
        self.terms.retain(|(d, _)| *d < depth);
    }
}

impl SearchMonitor for SymmetryManager {
    fn enter_search(&mut self, _s: &mut Solver) {
        self.terms.clear();
    }

    fn apply_decision(&mut self, s: &mut Solver, d: &Decision) -> PropResult {
        if let Decision::Assign { var, value } = *d {
            let depth = s.depth();
            self.prune_to_depth(depth);
            let images = self
                .breakers
                .iter_mut()
                .map(|b| b.image(s, var, value))
                .collect();
            self.terms.push((depth, images));
        }
        Ok(())
    }

    fn refute_decision(&mut self, s: &mut Solver, d: &Decision) -> PropResult {
        let (var, value) = match *d {
            Decision::Assign { var, value } => (var, value),
            _ => return Ok(()),
        };
        let depth = s.depth();
        self.prune_to_depth(depth);
        for (i, breaker) in self.breakers.iter_mut().enumerate() {
            let forbidden = match breaker.image(s, var, value) {
                Some(f) => f,
                None => continue,
            };
            let guards: Vec<(VarId, i64)> = self
                .terms
                .iter()
                .filter_map(|(_, images)| images[i])
                .collect();
            let clause = crate::constraints::logic::SymClause::new(guards, forbidden);
            s.add_constraint(crate::solver::Constraint(Box::new(clause)))?;
        }
        Ok(())
    }
}
