//! Objective monitors: lexicographic stepped bound tightening.

use crate::monitors::SearchMonitor;
use crate::search::decision::Decision;
use crate::solver::Solver;
use crate::util::cap_sub;
use crate::vars::VarId;
use crate::{Conflict, PropResult};

/// One objective component.
#[derive(Debug, Clone, Copy)]
pub struct ObjectiveItem {
    pub var: VarId,
    pub maximize: bool,
    pub step: i64,
}

/// Shared state of every objective-driven monitor: an ordered list of
/// `(variable, sense, step)` triples tracked as *minimization* views, with
/// the current and best internal values.
pub(crate) struct ObjectiveState {
    items: Vec<ObjectiveItem>,
    /// Minimization-view variables: the variable itself, or a materialized
    /// opposite for maximized components.
    min_vars: Vec<VarId>,
    pub current: Vec<i64>,
    pub best: Vec<i64>,
    pub found_initial: bool,
}

impl ObjectiveState {
    pub fn new(s: &mut Solver, items: Vec<ObjectiveItem>) -> Result<Self, Conflict> {
        let mut min_vars = Vec::with_capacity(items.len());
        for item in &items {
            debug_assert!(item.step >= 1);
            if item.maximize {
                let e = s.expr_var(item.var);
                let opp = s.opposite(e);
                min_vars.push(s.var_of(opp)?);
            } else {
                min_vars.push(item.var);
            }
        }
        let n = items.len();
        Ok(Self {
            items,
            min_vars,
            current: vec![i64::MAX; n],
            best: vec![i64::MAX; n],
            found_initial: false,
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn items(&self) -> &[ObjectiveItem] {
        &self.items
    }

    pub fn min_var(&self, i: usize) -> VarId {
        self.min_vars[i]
    }

    pub fn step(&self, i: usize) -> i64 {
        self.items[i].step
    }

    pub fn enter(&mut self) {
        self.current.fill(i64::MAX);
        self.best.fill(i64::MAX);
        self.found_initial = false;
    }

    /// True when at least one component carries a bound worth posting.
    pub fn constraining(&self) -> bool {
        self.current.iter().any(|&v| v < i64::MAX)
    }

    pub fn loosen(&mut self) {
        self.current.fill(i64::MAX);
    }

    /// Records the solution values; keeps the lexicographic best.
    pub fn record_solution(&mut self, s: &Solver) {
        for (i, &mv) in self.min_vars.iter().enumerate() {
            self.current[i] = s.max(mv);
        }
        if self.current < self.best {
            self.best = self.current.clone();
        }
        self.found_initial = true;
    }

    /// Strict lexicographic improvement over the current internal values.
    pub fn strictly_improves(&self, s: &Solver) -> bool {
        for (i, &mv) in self.min_vars.iter().enumerate() {
            let value = s.value(mv);
            if value == self.current[i] {
                continue;
            }
            return value < self.current[i];
        }
        false
    }

    /// Posts the stepped lexicographic cut against `target(i)`: the first
    /// component where strict improvement is still possible absorbs the
    /// step; earlier components are pinned at equality.
    pub fn apply_bound_with(
        &self,
        s: &mut Solver,
        target: impl Fn(usize) -> i64,
    ) -> PropResult {
        if !self.found_initial {
            return Ok(());
        }
        let n = self.len();
        for i in 0..n {
            let t = target(i);
            if t == i64::MAX {
                return Ok(());
            }
            let mv = self.min_vars[i];
            if i + 1 == n {
                return s.set_max(mv, cap_sub(t, self.step(i)));
            }
            s.set_max(mv, t)?;
            if s.min(mv) < t {
                // Improvement can still happen here; later components are
                // unconstrained.
                return Ok(());
            }
        }
        // Every component is pinned at its target: no improvement possible.
        Err(Conflict)
    }

    pub fn apply_bound(&self, s: &mut Solver) -> PropResult {
        let current = self.current.clone();
        self.apply_bound_with(s, |i| current[i])
    }
}

/// Fails the refuted node unless the subtree can still reach an improving
/// solution. Shared by the metaheuristics.
pub(crate) fn metaheuristic_refute(obj: &ObjectiveState, s: &Solver) -> PropResult {
    for i in 0..obj.len() {
        let lb = s.min(obj.min_var(i));
        if lb > obj.best[i] {
            break;
        }
        if lb <= cap_sub(obj.best[i], obj.step(i)) {
            return Ok(());
        }
    }
    Err(Conflict)
}

/// The optimize monitor: constrains every future solution to improve on the
/// best one found, by at least the step, lexicographically.
pub struct OptimizeVar {
    pub(crate) obj: ObjectiveState,
}

impl OptimizeVar {
    pub fn minimize(s: &mut Solver, var: VarId, step: i64) -> Result<Self, Conflict> {
        Self::lexicographic(s, vec![ObjectiveItem { var, maximize: false, step }])
    }

    pub fn maximize(s: &mut Solver, var: VarId, step: i64) -> Result<Self, Conflict> {
        Self::lexicographic(s, vec![ObjectiveItem { var, maximize: true, step }])
    }

    pub fn lexicographic(s: &mut Solver, items: Vec<ObjectiveItem>) -> Result<Self, Conflict> {
        Ok(Self { obj: ObjectiveState::new(s, items)? })
    }

    /// Optimizes a weighted sum of sub-objectives.
    pub fn weighted(
        s: &mut Solver,
        maximize: bool,
        sub_objectives: &[VarId],
        weights: &[i64],
        step: i64,
    ) -> Result<Self, Conflict> {
        let e = s.scal_prod(sub_objectives, weights).map_err(|_| Conflict)?;
        let var = s.var_of(e)?;
        Self::lexicographic(s, vec![ObjectiveItem { var, maximize, step }])
    }

    /// Best value of component `i`, in the user's sense.
    pub fn best_value(&self, i: usize) -> Option<i64> {
        if !self.obj.found_initial {
            return None;
        }
        let internal = self.obj.best[i];
        Some(if self.obj.items()[i].maximize { -internal } else { internal })
    }
}

impl SearchMonitor for OptimizeVar {
    fn enter_search(&mut self, _s: &mut Solver) {
        self.obj.enter();
    }

    fn begin_next_decision(&mut self, s: &mut Solver) -> PropResult {
        // The cut is idempotent, so it is re-posted at every node; after a
        // restart this re-installs the bound at the top of the search.
        self.obj.apply_bound(s)
    }

    fn refute_decision(&mut self, s: &mut Solver, _d: &Decision) -> PropResult {
        self.obj.apply_bound(s)
    }

    fn accept_solution(&mut self, s: &mut Solver) -> bool {
        if !self.obj.found_initial {
            return true;
        }
        self.obj.strictly_improves(s)
    }

    fn at_solution(&mut self, s: &mut Solver) -> bool {
        self.obj.record_solution(s);
        true
    }
}
