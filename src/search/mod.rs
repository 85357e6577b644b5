//! Depth-first backtracking search.
//!
//! The engine keeps an explicit stack of frames, one per applied decision.
//! A contradiction unwinds the trail to the nearest frame whose right branch
//! has not been taken, applies the refutation there, and resumes. Monitors
//! are consulted at every event; limits stop the search through the
//! solver's cooperative stop flag.

use crate::monitors::{Assignment, SearchMonitor};
use crate::solver::Solver;
use crate::vars::VarId;
use crate::{PropResult, Status};

pub mod combinators;
pub mod decision;
pub mod phase;

use decision::{Decision, DecisionBuilder};

struct Frame {
    decision: Decision,
    right_done: bool,
}

/// A step-by-step search over a solver. `next_solution` leaves the solver
/// at the solution so callers can read values; the following call resumes
/// by backtracking.
pub struct SearchSession<'a, 'm> {
    solver: &'a mut Solver,
    db: &'a mut dyn DecisionBuilder,
    monitors: &'a mut [&'m mut dyn SearchMonitor],
    stack: Vec<Frame>,
    started: bool,
    ended: bool,
    pending_backtrack: bool,
    accepted: u64,
}

impl<'a, 'm> SearchSession<'a, 'm> {
    pub fn new(
        solver: &'a mut Solver,
        db: &'a mut dyn DecisionBuilder,
        monitors: &'a mut [&'m mut dyn SearchMonitor],
    ) -> Self {
        Self {
            solver,
            db,
            monitors,
            stack: Vec::new(),
            started: false,
            ended: false,
            pending_backtrack: false,
            accepted: 0,
        }
    }

    /// Runs until the next accepted solution. Returns false when the search
    /// space is exhausted or a stop was requested.
    pub fn next_solution(&mut self) -> bool {
        if self.ended || !self.solver.ok {
            return false;
        }
        let mut failed = false;
        let mut resume = false;
        if !self.started {
            self.started = true;
            self.solver.clear_stop();
            self.solver.status = Status::Running;
            self.db.init(self.solver);
            for m in self.monitors.iter_mut() {
                m.enter_search(self.solver);
            }
            for m in self.monitors.iter_mut() {
                m.begin_initial_propagation(self.solver);
            }
            let r = self.solver.propagate();
            for m in self.monitors.iter_mut() {
                m.end_initial_propagation(self.solver);
            }
            failed = r.is_err();
        } else if self.pending_backtrack {
            self.pending_backtrack = false;
            resume = true;
        }

        loop {
            if let Some(status) = self.solver.stop_requested() {
                self.finish(status);
                return false;
            }
            if self.solver.take_restart_request() {
                self.unwind();
                for m in self.monitors.iter_mut() {
                    m.restart_search(self.solver);
                }
                failed = false;
                continue;
            }

            if failed || resume {
                if failed {
                    self.solver.stats.failures += 1;
                    for m in self.monitors.iter_mut() {
                        m.begin_fail(self.solver);
                    }
                }
                let was_failed = failed;
                let step = self.backtrack_step();
                if was_failed {
                    for m in self.monitors.iter_mut() {
                        m.end_fail(self.solver);
                    }
                }
                resume = false;
                match step {
                    Some(refuted_ok) => {
                        failed = !refuted_ok;
                        continue;
                    }
                    None => {
                        // Top-level exhaustion: metaheuristics may relax
                        // their bound and ask for another round.
                        let mut again = false;
                        for m in self.monitors.iter_mut() {
                            again |= m.at_local_optimum(self.solver);
                        }
                        if again && self.solver.stop_requested().is_none() {
                            for m in self.monitors.iter_mut() {
                                m.restart_search(self.solver);
                            }
                            failed = false;
                            continue;
                        }
                        for m in self.monitors.iter_mut() {
                            m.no_more_solutions(self.solver);
                        }
                        let status =
                            if self.accepted > 0 { Status::Feasible } else { Status::Infeasible };
                        self.finish(status);
                        return false;
                    }
                }
            }

            if self.solver.propagate().is_err() {
                failed = true;
                continue;
            }

            for m in self.monitors.iter_mut() {
                m.periodic_check(self.solver);
            }
            if self.solver.stop_requested().is_some() {
                continue;
            }

            let mut pre = Ok(());
            for m in self.monitors.iter_mut() {
                pre = m.begin_next_decision(self.solver);
                if pre.is_err() {
                    break;
                }
            }
            if pre.is_err() {
                failed = true;
                continue;
            }
            let decision = self.db.next(self.solver);
            for m in self.monitors.iter_mut() {
                m.end_next_decision(self.solver);
            }

            match decision {
                None => {
                    let mut accept = true;
                    for m in self.monitors.iter_mut() {
                        accept &= m.accept_solution(self.solver);
                    }
                    if accept {
                        self.solver.stats.solutions += 1;
                        self.accepted += 1;
                        for m in self.monitors.iter_mut() {
                            m.at_solution(self.solver);
                        }
                        for m in self.monitors.iter_mut() {
                            m.accept_neighbor(self.solver);
                        }
                        self.pending_backtrack = true;
                        return true;
                    }
                    failed = true;
                }
                Some(d) => {
                    self.solver.stats.branches += 1;
                    self.solver.push_level();
                    self.stack.push(Frame { decision: d, right_done: false });
                    let mut r = Ok(());
                    for m in self.monitors.iter_mut() {
                        r = m.apply_decision(self.solver, &d);
                        if r.is_err() {
                            break;
                        }
                    }
                    if r.is_ok() {
                        r = d.apply(self.solver);
                    }
                    for m in self.monitors.iter_mut() {
                        m.after_decision(self.solver, &d, true);
                    }
                    failed = r.is_err();
                }
            }
        }
    }

    /// Pops frames until one still has an untaken right branch, then applies
    /// its refutation. Returns `None` when the root is reached, otherwise
    /// whether the refutation survived propagation.
    fn backtrack_step(&mut self) -> Option<bool> {
        loop {
            let mut frame = self.stack.pop()?;
            self.solver.pop_level();
            if frame.right_done {
                continue;
            }
            frame.right_done = true;
            let d = frame.decision;
            self.solver.push_level();
            self.stack.push(frame);
            let mut r: PropResult = Ok(());
            for m in self.monitors.iter_mut() {
                r = m.refute_decision(self.solver, &d);
                if r.is_err() {
                    break;
                }
            }
            if r.is_ok() {
                r = d.refute(self.solver);
            }
            if r.is_ok() {
                r = self.solver.propagate();
            }
            for m in self.monitors.iter_mut() {
                m.after_decision(self.solver, &d, false);
            }
            return Some(r.is_ok());
        }
    }

    fn unwind(&mut self) {
        while self.stack.pop().is_some() {
            self.solver.pop_level();
        }
    }

    fn finish(&mut self, status: Status) {
        self.unwind();
        self.ended = true;
        self.solver.status = status;
        for m in self.monitors.iter_mut() {
            m.exit_search(self.solver);
        }
    }

    /// Ends the search, unwinding any remaining state.
    pub fn end_search(&mut self) {
        if self.ended {
            return;
        }
        let status = if self.accepted > 0 { Status::Feasible } else { Status::Infeasible };
        self.finish(status);
    }

    pub fn solutions_accepted(&self) -> u64 {
        self.accepted
    }

    /// Read access to the solver, e.g. to inspect the values of the
    /// solution `next_solution` stopped at.
    pub fn solver_ref(&self) -> &Solver {
        self.solver
    }
}

impl Solver {
    /// Runs the search to completion. Returns true when at least one
    /// solution was accepted.
    pub fn solve(
        &mut self,
        db: &mut dyn DecisionBuilder,
        monitors: &mut [&mut dyn SearchMonitor],
    ) -> bool {
        let mut session = SearchSession::new(self, db, monitors);
        let mut found = false;
        while session.next_solution() {
            found = true;
        }
        session.end_search();
        found
    }

    /// Like [`Solver::solve`], but the last accepted solution's values stay
    /// applied when the search ends.
    pub fn solve_and_commit(
        &mut self,
        db: &mut dyn DecisionBuilder,
        monitors: &mut [&mut dyn SearchMonitor],
    ) -> bool {
        let vars: Vec<VarId> = (0..self.num_vars() as u32).map(VarId).collect();
        let mut last: Option<Assignment> = None;
        {
            let mut session = SearchSession::new(self, db, monitors);
            while session.next_solution() {
                let bound: Vec<VarId> = vars
                    .iter()
                    .copied()
                    .filter(|&v| session.solver.bound(v))
                    .collect();
                last = Some(Assignment::from_solver(session.solver, &bound));
            }
            session.end_search();
        }
        match last {
            Some(solution) => {
                let committed = solution.restore(self).is_ok();
                if committed {
                    self.status = Status::Feasible;
                }
                committed
            }
            None => false,
        }
    }
}
