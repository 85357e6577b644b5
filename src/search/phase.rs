//! Classical phase decision builder: variable selection × value selection.

use rand::Rng;

use crate::search::decision::{Decision, DecisionBuilder};
use crate::solver::Solver;
use crate::vars::VarId;

/// Variable-index selection heuristics.
pub enum VarStrategy {
    /// First variable (in list order) that is not bound.
    FirstUnbound,
    /// Smallest domain; ties by lowest minimum.
    MinSizeLowestMin,
    /// Smallest domain; ties by highest minimum.
    MinSizeHighestMin,
    /// Smallest domain; ties by lowest maximum.
    MinSizeLowestMax,
    /// Smallest domain; ties by highest maximum.
    MinSizeHighestMax,
    /// Largest difference between the two smallest domain values.
    MaxRegret,
    /// Scan from just past the previously selected variable, wrapping
    /// around, so assignments walk a path through the list.
    Path,
    /// Smallest user-provided cost over unbound variables.
    CheapestVar(Box<dyn Fn(&Solver, VarId) -> i64>),
    /// Uniformly random unbound variable.
    Random,
}

/// Value selection heuristics.
pub enum ValueStrategy {
    /// Domain minimum.
    Min,
    /// Domain maximum.
    Max,
    /// Uniformly random value in the domain.
    Random,
    /// Contained value closest to the middle of the range.
    Center,
    /// Bisect the domain: branch `x <= mid` / `x > mid`.
    Split,
    /// Bisect the domain from above: branch `x >= mid + 1` / `x <= mid`.
    SplitHigh,
    /// Smallest user-provided cost; ties broken by the lower value.
    CheapestValue(Box<dyn Fn(&Solver, VarId, i64) -> i64>),
    /// Best value under a user comparator (`true` when the left value
    /// beats the right one).
    BestValue(Box<dyn Fn(&Solver, VarId, i64, i64) -> bool>),
}

/// A decision builder assigning a fixed list of variables.
pub struct Phase {
    vars: Vec<VarId>,
    var_strategy: VarStrategy,
    value_strategy: ValueStrategy,
    last_index: usize,
}

impl Phase {
    pub fn new(vars: Vec<VarId>, var_strategy: VarStrategy, value_strategy: ValueStrategy) -> Self {
        Self {
            vars,
            var_strategy,
            value_strategy,
            last_index: 0,
        }
    }

    fn select_var(&mut self, s: &mut Solver) -> Option<(usize, VarId)> {
        use std::cmp::Reverse;
        let candidates: Vec<(usize, VarId)> = self
            .vars
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, v)| !s.bound(v))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let chosen = match &self.var_strategy {
            VarStrategy::FirstUnbound => candidates[0],
            VarStrategy::MinSizeLowestMin => *candidates
                .iter()
                .min_by_key(|&&(_, v)| (s.size(v), s.min(v)))?,
            VarStrategy::MinSizeHighestMin => *candidates
                .iter()
                .min_by_key(|&&(_, v)| (s.size(v), Reverse(s.min(v))))?,
            VarStrategy::MinSizeLowestMax => *candidates
                .iter()
                .min_by_key(|&&(_, v)| (s.size(v), s.max(v)))?,
            VarStrategy::MinSizeHighestMax => *candidates
                .iter()
                .min_by_key(|&&(_, v)| (s.size(v), Reverse(s.max(v))))?,
            VarStrategy::MaxRegret => *candidates.iter().max_by_key(|&&(_, v)| {
                let min = s.min(v);
                let second = s.store.first_ge(v, min + 1).unwrap_or(min);
                second - min
            })?,
            VarStrategy::Path => {
                let n = self.vars.len();
                let start = (self.last_index + 1) % n;
                *candidates
                    .iter()
                    .min_by_key(|&&(i, _)| (i + n - start) % n)?
            }
            VarStrategy::CheapestVar(cost) => *candidates.iter().min_by_key(|&&(_, v)| cost(s, v))?,
            VarStrategy::Random => {
                let i = s.rng.gen_range(0..candidates.len());
                candidates[i]
            }
        };
        Some(chosen)
    }

    fn select_value(&mut self, s: &mut Solver, var: VarId) -> Decision {
        let (min, max) = (s.min(var), s.max(var));
        // Above the no-splitting limit, hole-punching selectors degrade to
        // the domain minimum.
        let large = s.size(var) > s.params.large_domain_no_splitting_limit as u64;
        match &self.value_strategy {
            ValueStrategy::Min => Decision::Assign { var, value: min },
            ValueStrategy::Max => Decision::Assign { var, value: max },
            ValueStrategy::Random => {
                if large {
                    Decision::Assign { var, value: min }
                } else {
                    let values: Vec<i64> = s.store.iter_domain(var).collect();
                    let i = s.rng.gen_range(0..values.len());
                    Decision::Assign { var, value: values[i] }
                }
            }
            ValueStrategy::Center => {
                if large {
                    Decision::Assign { var, value: min }
                } else {
                    let mid = min + (max - min) / 2;
                    let value = match (s.store.first_ge(var, mid), s.store.last_le(var, mid)) {
                        (Some(up), Some(down)) => {
                            if up - mid <= mid - down { up } else { down }
                        }
                        (Some(up), None) => up,
                        (None, Some(down)) => down,
                        (None, None) => min,
                    };
                    Decision::Assign { var, value }
                }
            }
            ValueStrategy::Split => {
                let mid = min + (max - min) / 2;
                Decision::SplitLow { var, value: mid }
            }
            ValueStrategy::SplitHigh => {
                let mid = min + (max - min) / 2;
                Decision::SplitHigh { var, value: mid + 1 }
            }
            ValueStrategy::CheapestValue(cost) => {
                let value = s
                    .store
                    .iter_domain(var)
                    .min_by_key(|&v| (cost(s, var, v), v))
                    .unwrap_or(min);
                Decision::Assign { var, value }
            }
            ValueStrategy::BestValue(better) => {
                let mut best = min;
                for v in s.store.iter_domain(var).skip(1) {
                    if better(s, var, v, best) {
                        best = v;
                    }
                }
                Decision::Assign { var, value: best }
            }
        }
    }
}

impl DecisionBuilder for Phase {
    fn next(&mut self, s: &mut Solver) -> Option<Decision> {
        let (index, var) = self.select_var(s)?;
        self.last_index = index;
        Some(self.select_value(s, var))
    }

    fn name(&self) -> &str {
        "phase"
    }
}
