//! Metaheuristic search monitors: tabu search, simulated annealing and
//! guided local search.
//!
//! All three wrap the shared [`ObjectiveState`] and work by tightening or
//! relaxing the objective bound between solutions. When the search exhausts
//! under the current bound, `at_local_optimum` relaxes it and asks the
//! engine for another round; the monitors thus drive repeated restarts from
//! a single thread, over the shared propagation model.

use std::collections::HashMap;
use std::collections::VecDeque;

use rand::Rng;

use crate::monitors::SearchMonitor;
use crate::objective::{metaheuristic_refute, ObjectiveItem, ObjectiveState};
use crate::search::decision::Decision;
use crate::solver::Solver;
use crate::util::{cap_add, cap_sub};
use crate::vars::{Lit, VarId};
use crate::{Conflict, PropResult};

#[derive(Debug, Clone, Copy)]
struct VarValue {
    index: usize,
    value: i64,
    stamp: i64,
}

/// Tabu search: keep/forbid lists of `(variable, value, stamp)` entries
/// aging out after their tenure, a soft tabu criterion with an aspiration
/// escape, and plateau rejection.
pub struct TabuSearch {
    obj: ObjectiveState,
    vars: Vec<VarId>,
    keep: VecDeque<VarValue>,
    forbid: VecDeque<VarValue>,
    synced_keep: Vec<VarValue>,
    synced_forbid: Vec<VarValue>,
    keep_tenure: i64,
    forbid_tenure: i64,
    tabu_factor: f64,
    stamp: i64,
    last_values: Vec<i64>,
    stored: Option<Vec<i64>>,
    solution_count: u64,
    stop_search: bool,
    /// Forbid-only variant: at least one listed variable must change.
    generic: bool,
}

impl TabuSearch {
    pub fn new(
        s: &mut Solver,
        items: Vec<ObjectiveItem>,
        vars: Vec<VarId>,
        keep_tenure: i64,
        forbid_tenure: i64,
        tabu_factor: f64,
    ) -> Result<Self, Conflict> {
        let obj = ObjectiveState::new(s, items)?;
        let n = obj.len();
        Ok(Self {
            obj,
            vars,
            keep: VecDeque::new(),
            forbid: VecDeque::new(),
            synced_keep: Vec::new(),
            synced_forbid: Vec::new(),
            keep_tenure,
            forbid_tenure,
            tabu_factor,
            stamp: 0,
            last_values: vec![i64::MAX; n],
            stored: None,
            solution_count: 0,
            stop_search: false,
            generic: false,
        })
    }

    /// The forbid-only flavor: tenure on the forbid list, tabu factor 1.
    pub fn generic(
        s: &mut Solver,
        items: Vec<ObjectiveItem>,
        vars: Vec<VarId>,
        forbid_tenure: i64,
    ) -> Result<Self, Conflict> {
        let mut this = Self::new(s, items, vars, 0, forbid_tenure, 1.0)?;
        this.generic = true;
        Ok(this)
    }

    fn tabu_limit(&self) -> i64 {
        let len = (self.synced_keep.len() + self.synced_forbid.len()) as f64;
        (len * self.tabu_factor).ceil() as i64
    }

    /// Posts the soft tabu criterion: either the solution improves on the
    /// best (aspiration), or at least `tabu_factor × |lists|` of the tabu
    /// terms are respected.
    fn post_tabu_constraint(&mut self, s: &mut Solver) -> PropResult {
        self.synced_keep = self.keep.iter().copied().collect();
        self.synced_forbid = self.forbid.iter().copied().collect();
        if self.synced_keep.is_empty() && self.synced_forbid.is_empty() {
            return Ok(());
        }
        let mut term_vars: Vec<VarId> = Vec::new();
        for &VarValue { index, value, .. } in &self.synced_keep {
            term_vars.push(s.is_equal_cst(self.vars[index], value)?);
        }
        for &VarValue { index, value, .. } in &self.synced_forbid {
            term_vars.push(s.is_different_cst(self.vars[index], value)?);
        }
        let respected = if self.generic {
            // At least one forbidden pair must be broken.
            let sum = s.sum_vars(&term_vars);
            let sum_var = s.var_of(sum)?;
            s.is_greater_or_equal_cst(sum_var, 1)?
        } else {
            let sum = s.sum_vars(&term_vars);
            let sum_var = s.var_of(sum)?;
            s.is_greater_or_equal_cst(sum_var, self.tabu_limit())?
        };
        // Aspiration: a solution beating the best escapes the criterion.
        let first = self.obj.min_var(0);
        let target = cap_sub(self.obj.best[0], self.obj.step(0));
        let aspiration = s.is_less_or_equal_cst(first, target)?;
        let c = s.bool_or(&[Lit::pos(aspiration), Lit::pos(respected)]);
        s.add_constraint(c)
    }

    fn age_lists(&mut self) {
        let stamp = self.stamp;
        let keep_tenure = self.keep_tenure;
        while self.keep.back().is_some_and(|e| e.stamp < stamp - keep_tenure) {
            self.keep.pop_back();
        }
        let forbid_tenure = self.forbid_tenure;
        while self.forbid.back().is_some_and(|e| e.stamp < stamp - forbid_tenure) {
            self.forbid.pop_back();
        }
        self.stamp += 1;
    }
}

impl SearchMonitor for TabuSearch {
    fn enter_search(&mut self, _s: &mut Solver) {
        self.obj.enter();
        self.stamp = 0;
        self.stored = None;
        self.solution_count = 0;
        self.stop_search = false;
        self.keep.clear();
        self.forbid.clear();
        self.last_values.fill(i64::MAX);
    }

    fn begin_next_decision(&mut self, _s: &mut Solver) -> PropResult {
        if self.stop_search {
            return Err(Conflict);
        }
        Ok(())
    }

    fn apply_decision(&mut self, s: &mut Solver, _d: &Decision) -> PropResult {
        if s.depth() != 1 {
            // The criterion is installed once per descent, under the first
            // decision.
            return Ok(());
        }
        if self.obj.found_initial {
            self.post_tabu_constraint(s)?;
        }
        // Go downhill to the next local optimum.
        if self.obj.constraining() {
            self.obj.apply_bound(s)?;
        }
        Ok(())
    }

    fn refute_decision(&mut self, s: &mut Solver, _d: &Decision) -> PropResult {
        if self.stop_search {
            return Err(Conflict);
        }
        if self.obj.found_initial {
            metaheuristic_refute(&self.obj, s)?;
        }
        Ok(())
    }

    fn accept_solution(&mut self, s: &mut Solver) -> bool {
        // Avoid cost plateaus which lead to tabu cycles.
        if self.obj.found_initial {
            (0..self.obj.len()).any(|i| self.last_values[i] != s.min(self.obj.min_var(i)))
        } else {
            true
        }
    }

    fn at_solution(&mut self, s: &mut Solver) -> bool {
        self.solution_count += 1;
        self.obj.record_solution(s);
        for i in 0..self.obj.len() {
            self.last_values[i] = self.obj.current[i];
        }
        let values: Vec<i64> = self.vars.iter().map(|&v| s.value(v)).collect();
        // New assignments enter the tabu lists only after the first local
        // optimum.
        if self.stamp != 0 {
            if let Some(stored) = &self.stored {
                for (index, (&old_value, &new_value)) in stored.iter().zip(&values).enumerate() {
                    if old_value != new_value {
                        if self.keep_tenure > 0 {
                            self.keep.push_front(VarValue { index, value: new_value, stamp: self.stamp });
                        }
                        if self.forbid_tenure > 0 {
                            self.forbid.push_front(VarValue { index, value: old_value, stamp: self.stamp });
                        }
                    }
                }
            }
        }
        self.stored = Some(values);
        true
    }

    fn at_local_optimum(&mut self, _s: &mut Solver) -> bool {
        // If no solution was accepted since the last local optimum and no
        // tabu list is active, the walk is stuck.
        if self.stamp > 0 && self.solution_count == 0 && self.keep.is_empty() && self.forbid.is_empty() {
            self.stop_search = true;
        }
        self.solution_count = 0;
        self.age_lists();
        self.obj.loosen();
        self.obj.found_initial && !self.stop_search
    }

    fn accept_neighbor(&mut self, _s: &mut Solver) {
        if self.stamp != 0 {
            self.age_lists();
        }
    }
}

/// Simulated annealing on a Cauchy schedule `T(i) = T0 / i`, where `i`
/// counts local optima. A worse neighbor is accepted with probability
/// `exp(-delta / T)`, encoded as a randomized loosening of the bound.
pub struct SimulatedAnnealing {
    obj: ObjectiveState,
    temperature0: Vec<i64>,
    iteration: u64,
}

impl SimulatedAnnealing {
    pub fn new(
        s: &mut Solver,
        items: Vec<ObjectiveItem>,
        initial_temperatures: Vec<i64>,
    ) -> Result<Self, Conflict> {
        let obj = ObjectiveState::new(s, items)?;
        debug_assert_eq!(obj.len(), initial_temperatures.len());
        Ok(Self { obj, temperature0: initial_temperatures, iteration: 0 })
    }

    fn temperature(&self, i: usize) -> f64 {
        if self.iteration > 0 {
            self.temperature0[i] as f64 / self.iteration as f64
        } else {
            0.0
        }
    }
}

impl SearchMonitor for SimulatedAnnealing {
    fn enter_search(&mut self, _s: &mut Solver) {
        self.obj.enter();
        self.iteration = 0;
    }

    fn apply_decision(&mut self, s: &mut Solver, _d: &Decision) -> PropResult {
        if s.depth() != 1 || !self.obj.constraining() {
            return Ok(());
        }
        // bound = current - T * log2(u); the energy term is negative, so
        // subtracting it loosens the bound.
        let mut bounds = Vec::with_capacity(self.obj.len());
        for i in 0..self.obj.len() {
            let u: f64 = s.rng.gen_range(f64::EPSILON..1.0);
            let energy = (self.temperature(i) * u.log2()) as i64;
            bounds.push(cap_sub(self.obj.current[i], energy));
        }
        self.obj.apply_bound_with(s, |i| bounds[i])
    }

    fn refute_decision(&mut self, s: &mut Solver, _d: &Decision) -> PropResult {
        if self.obj.found_initial {
            metaheuristic_refute(&self.obj, s)?;
        }
        Ok(())
    }

    fn at_solution(&mut self, s: &mut Solver) -> bool {
        self.obj.record_solution(s);
        true
    }

    fn at_local_optimum(&mut self, _s: &mut Solver) -> bool {
        self.obj.loosen();
        self.iteration += 1;
        if !self.obj.found_initial {
            return false;
        }
        (0..self.obj.len()).all(|i| self.temperature(i) > 0.0)
    }

    fn accept_neighbor(&mut self, _s: &mut Solver) {
        if self.iteration > 0 {
            self.iteration += 1;
        }
    }
}

/// Guided local search: per-`(variable, value)` penalty counters feed an
/// augmented objective `true_objective + λ × Σ penalty`; at each local
/// optimum the pairs of maximal utility `cost / (1 + penalty)` are
/// penalized.
pub struct GuidedLocalSearch {
    obj: ObjectiveState,
    vars: Vec<VarId>,
    penalties: HashMap<(usize, i64), i64>,
    cost: Box<dyn Fn(usize, i64) -> i64>,
    penalty_factor: f64,
    equivalent_pairs: Option<Box<dyn Fn(usize, i64) -> Vec<(usize, i64)>>>,
    reset_penalties_on_new_best: bool,
    stored: Option<Vec<i64>>,
}

impl GuidedLocalSearch {
    pub fn new(
        s: &mut Solver,
        item: ObjectiveItem,
        vars: Vec<VarId>,
        cost: Box<dyn Fn(usize, i64) -> i64>,
        penalty_factor: f64,
        reset_penalties_on_new_best: bool,
    ) -> Result<Self, Conflict> {
        let obj = ObjectiveState::new(s, vec![item])?;
        Ok(Self {
            obj,
            vars,
            penalties: HashMap::new(),
            cost,
            penalty_factor,
            equivalent_pairs: None,
            reset_penalties_on_new_best,
            stored: None,
        })
    }

    pub fn with_equivalent_pairs(
        mut self,
        pairs: Box<dyn Fn(usize, i64) -> Vec<(usize, i64)>>,
    ) -> Self {
        self.equivalent_pairs = Some(pairs);
        self
    }

    fn penalized_value(&self, index: usize, value: i64) -> i64 {
        match self.penalties.get(&(index, value)) {
            Some(&p) => (self.penalty_factor * p as f64 * (self.cost)(index, value) as f64) as i64,
            None => 0,
        }
    }

    /// Penalty of the stored assignment, summed over the variables.
    fn assignment_penalty(&self, values: &[i64]) -> i64 {
        values
            .iter()
            .enumerate()
            .fold(0i64, |acc, (i, &v)| cap_add(acc, self.penalized_value(i, v)))
    }

    /// Posts `objective <= max(current - step - penalized, best - step)`
    /// where `penalized` is the penalty expression over the current domains.
    fn post_augmented_bound(&mut self, s: &mut Solver) -> PropResult {
        if !self.obj.found_initial {
            return Ok(());
        }
        let step = self.obj.step(0);
        let min_var = self.obj.min_var(0);
        if self.penalties.is_empty() {
            let bound = if self.obj.current[0] < i64::MAX {
                cap_sub(self.obj.current[0], step)
            } else {
                self.obj.current[0]
            };
            return s.set_max(min_var, bound);
        }
        // Element expressions mapping each variable to its penalty.
        // Penalization only applies to variables with small non-negative
        // ranges, which is where assignment components live.
        const MAX_TABLE: i64 = 4096;
        let mut penalty_vars: Vec<VarId> = Vec::new();
        for (i, &v) in self.vars.iter().enumerate() {
            if s.min(v) < 0 || s.max(v) >= MAX_TABLE {
                continue;
            }
            let len = s.max(v) + 1;
            let table: Vec<i64> = (0..len).map(|value| self.penalized_value(i, value)).collect();
            if table.iter().all(|&p| p == 0) {
                continue;
            }
            let e = s.element_expr(v, &table);
            penalty_vars.push(s.var_of(e)?);
        }
        // A loosened current value saturates the term and leaves the bound
        // vacuous until the next downhill phase.
        let current_term = cap_sub(self.obj.current[0], step);
        let penalized = s.sum_vars(&penalty_vars);
        let lhs = s.expr_const(current_term);
        let diff = s.difference(lhs, penalized);
        let best_term = s.expr_const(cap_sub(self.obj.best[0], step));
        let rhs = s.max_expr(diff, best_term);
        let rhs_var = s.var_of(rhs)?;
        let c = s.le(min_var, rhs_var);
        s.add_constraint(c)
    }
}

impl SearchMonitor for GuidedLocalSearch {
    fn enter_search(&mut self, _s: &mut Solver) {
        self.obj.enter();
        self.penalties.clear();
        self.stored = None;
    }

    fn apply_decision(&mut self, s: &mut Solver, _d: &Decision) -> PropResult {
        if s.depth() != 1 {
            return Ok(());
        }
        self.post_augmented_bound(s)
    }

    fn refute_decision(&mut self, s: &mut Solver, _d: &Decision) -> PropResult {
        if self.obj.found_initial {
            metaheuristic_refute(&self.obj, s)?;
        }
        Ok(())
    }

    fn at_solution(&mut self, s: &mut Solver) -> bool {
        let old_best = self.obj.best[0];
        self.obj.record_solution(s);
        let values: Vec<i64> = self.vars.iter().map(|&v| s.value(v)).collect();
        if !self.penalties.is_empty() {
            if self.reset_penalties_on_new_best && self.obj.best[0] < old_best {
                // A new true best: start a fresh penalization phase.
                self.penalties.clear();
            } else {
                // A penalized move: augment the internal value so the next
                // bound accounts for the penalties.
                let penalty = self.assignment_penalty(&values);
                self.obj.current[0] = cap_add(self.obj.current[0], penalty);
            }
        }
        self.stored = Some(values);
        true
    }

    fn at_local_optimum(&mut self, _s: &mut Solver) -> bool {
        let values = match &self.stored {
            Some(v) => v.clone(),
            None => return false,
        };
        let mut utilities = Vec::with_capacity(values.len());
        let mut max_utility = f64::NEG_INFINITY;
        for (i, &value) in values.iter().enumerate() {
            let cost = (self.cost)(i, value);
            let penalty = self.penalties.get(&(i, value)).copied().unwrap_or(0);
            let utility = cost as f64 / (penalty as f64 + 1.0);
            utilities.push(utility);
            if utility > max_utility {
                max_utility = utility;
            }
        }
        for (i, &value) in values.iter().enumerate() {
            if utilities[i] == max_utility {
                match &self.equivalent_pairs {
                    Some(pairs) => {
                        for (j, other) in pairs(i, value) {
                            *self.penalties.entry((j, other)).or_insert(0) += 1;
                        }
                    }
                    None => {
                        *self.penalties.entry((i, value)).or_insert(0) += 1;
                    }
                }
            }
        }
        self.obj.loosen();
        self.obj.found_initial
    }
}
