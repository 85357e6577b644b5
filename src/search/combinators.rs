//! Decision-builder combinators.

use crate::monitors::SearchMonitor;
use crate::objective::OptimizeVar;
use crate::search::decision::{Decision, DecisionBuilder};
use crate::solver::Solver;
use crate::trail::RevCell;

/// Tries each sub-builder in order; the first one that produces a decision
/// wins. A sub-builder that is done hands over to the next.
pub struct Compose {
    builders: Vec<Box<dyn DecisionBuilder>>,
}

impl Compose {
    pub fn new(builders: Vec<Box<dyn DecisionBuilder>>) -> Self {
        Self { builders }
    }
}

impl DecisionBuilder for Compose {
    fn init(&mut self, s: &mut Solver) {
        for b in &mut self.builders {
            b.init(s);
        }
    }

    fn next(&mut self, s: &mut Solver) -> Option<Decision> {
        for b in &mut self.builders {
            if let Some(d) = b.next(s) {
                return Some(d);
            }
        }
        None
    }

    fn name(&self) -> &str {
        "compose"
    }
}

/// Branches on which sub-builder to commit to: the left branch descends
/// with builder `i`, the refutation moves on to builder `i + 1`. The
/// commitment lives in a reversible cell, so abandoning the whole region
/// resets the chain.
pub struct Try {
    builders: Vec<Box<dyn DecisionBuilder>>,
    state: Option<RevCell>,
}

impl Try {
    pub fn new(builders: Vec<Box<dyn DecisionBuilder>>) -> Self {
        Self { builders, state: None }
    }
}

impl DecisionBuilder for Try {
    fn init(&mut self, s: &mut Solver) {
        // A fresh cell per session: handles from an earlier session may be
        // stale or recycled.
        self.state = Some(s.store.trail.new_cell(0));
        for b in &mut self.builders {
            b.init(s);
        }
    }

    fn next(&mut self, s: &mut Solver) -> Option<Decision> {
        // A cell created inside a popped frame goes stale; recreating it
        // resets the chain to its first alternative, which is exactly what a
        // fresh descent into this region wants.
        let cell = match self.state {
            Some(c) if s.store.trail.valid(c) => c,
            _ => {
                let c = s.store.trail.new_cell(0);
                self.state = Some(c);
                c
            }
        };
        // Even values mean "builder v/2 not yet committed"; odd values mean
        // "committed to builder v/2".
        let v = s.store.trail.get(cell);
        let (index, committed) = ((v >> 1) as usize, v & 1 == 1);
        if index >= self.builders.len() {
            return Some(Decision::Fail);
        }
        if !committed {
            return Some(Decision::Commit {
                cell,
                left: (index as i64) * 2 + 1,
                right: (index as i64 + 1) * 2,
            });
        }
        self.builders[index].next(s)
    }

    fn name(&self) -> &str {
        "try"
    }
}

/// Runs a nested search as a single step: on success the solution values
/// are committed at the current level and the step is over; on failure the
/// step fails both ways.
pub struct SolveOnce {
    inner: Box<dyn DecisionBuilder>,
    monitors: Vec<Box<dyn SearchMonitor>>,
}

impl SolveOnce {
    pub fn new(inner: Box<dyn DecisionBuilder>) -> Self {
        Self { inner, monitors: Vec::new() }
    }

    pub fn with_monitors(inner: Box<dyn DecisionBuilder>, monitors: Vec<Box<dyn SearchMonitor>>) -> Self {
        Self { inner, monitors }
    }
}

impl DecisionBuilder for SolveOnce {
    fn next(&mut self, s: &mut Solver) -> Option<Decision> {
        let mut refs = self
            .monitors
            .iter_mut()
            .map(|b| -> &mut dyn SearchMonitor { &mut **b })
            .collect::<Vec<_>>();
        let committed = s.solve_and_commit(&mut *self.inner, &mut refs);
        if committed { None } else { Some(Decision::Fail) }
    }

    fn name(&self) -> &str {
        "solve_once"
    }
}

/// As [`SolveOnce`], but the nested search runs under an objective monitor
/// and commits the best solution found.
pub struct NestedOptimize {
    inner: Box<dyn DecisionBuilder>,
    monitors: Vec<Box<dyn SearchMonitor>>,
    objective: OptimizeVar,
}

impl NestedOptimize {
    pub fn new(inner: Box<dyn DecisionBuilder>, objective: OptimizeVar) -> Self {
        Self { inner, monitors: Vec::new(), objective }
    }

    pub fn with_monitors(
        inner: Box<dyn DecisionBuilder>,
        objective: OptimizeVar,
        monitors: Vec<Box<dyn SearchMonitor>>,
    ) -> Self {
        Self { inner, monitors, objective }
    }
}

impl DecisionBuilder for NestedOptimize {
    fn next(&mut self, s: &mut Solver) -> Option<Decision> {
        let mut refs: Vec<&mut dyn SearchMonitor> = Vec::with_capacity(self.monitors.len() + 1);
        refs.push(&mut self.objective);
        refs.extend(self.monitors.iter_mut().map(|b| &mut **b as &mut dyn SearchMonitor));
        let committed = s.solve_and_commit(&mut *self.inner, &mut refs);
        if committed { None } else { Some(Decision::Fail) }
    }

    fn name(&self) -> &str {
        "nested_optimize"
    }
}
