//! Search machinery: combinators, limits, collectors, restarts, symmetry.

use std::time::Duration;

use super::{min_phase, solver};
use crate::limits::{CustomLimit, LubyRestart, OrLimit, RegularLimit};
use crate::monitors::{SearchMonitor, SolutionCollector, SymmetryBreaker, SymmetryManager};
use crate::search::combinators::{Compose, SolveOnce, Try};
use crate::search::decision::{Decision, DecisionBuilder};
use crate::search::phase::{Phase, ValueStrategy, VarStrategy};
use crate::solver::Solver;
use crate::vars::VarId;
use crate::Status;

#[test]
fn compose_runs_builders_in_sequence() {
    let mut s = solver();
    let x = s.new_int_var(0, 3, "x");
    let y = s.new_int_var(0, 3, "y");
    let mut db = Compose::new(vec![
        Box::new(min_phase(vec![x])),
        Box::new(min_phase(vec![y])),
    ]);
    let mut collector = SolutionCollector::first_solution(vec![x, y]);
    let mut limit = RegularLimit::solution_limit(1);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut collector, &mut limit];
    assert!(s.solve(&mut db, &mut monitors));
    let a = collector.solution(0).unwrap();
    assert_eq!(a.value_of(x), Some(0));
    assert_eq!(a.value_of(y), Some(0));
}

#[test]
fn try_falls_through_failing_builders() {
    // The first alternative pins x to an infeasible value; the second
    // succeeds.
    struct Pin {
        var: VarId,
        value: i64,
    }
    impl DecisionBuilder for Pin {
        fn next(&mut self, s: &mut Solver) -> Option<Decision> {
            if s.bound(self.var) {
                return None;
            }
            if !s.contains(self.var, self.value) {
                return Some(Decision::Fail);
            }
            Some(Decision::Assign { var: self.var, value: self.value })
        }
    }
    let mut s = solver();
    let x = s.new_int_var(0, 5, "x");
    let y = s.new_int_var(0, 5, "y");
    let c = s.linear_eq(&[x, y], &[1, 1], 9).unwrap();
    s.add_constraint(c).unwrap();
    let mut db_inner = Try::new(vec![
        Box::new(Pin { var: x, value: 0 }), // forces y = 9: infeasible
        Box::new(min_phase(vec![x, y])),
    ]);
    let mut collector = SolutionCollector::first_solution(vec![x, y]);
    let mut limit = RegularLimit::solution_limit(1);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut collector, &mut limit];
    assert!(s.solve(&mut db_inner, &mut monitors));
    let a = collector.solution(0).unwrap();
    assert_eq!(a.value_of(x).unwrap() + a.value_of(y).unwrap(), 9);
}

#[test]
fn solve_once_commits_a_nested_solution() {
    let mut s = solver();
    let x = s.new_int_var(0, 5, "x");
    let y = s.new_int_var(0, 5, "y");
    let c = s.linear_eq(&[x, y], &[1, 1], 7).unwrap();
    s.add_constraint(c).unwrap();
    let mut db = Compose::new(vec![
        Box::new(SolveOnce::new(Box::new(min_phase(vec![x])))),
        Box::new(min_phase(vec![y])),
    ]);
    let mut limit = RegularLimit::solution_limit(1);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut limit];
    assert!(s.solve(&mut db, &mut monitors));
}

#[test]
fn branch_limit_stops_the_search() {
    let mut s = solver();
    let vars: Vec<_> = (0..6).map(|i| s.new_int_var(0, 9, &format!("v{i}"))).collect();
    let mut db = min_phase(vars);
    let mut limit = RegularLimit::branch_limit(3);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut limit];
    s.solve(&mut db, &mut monitors);
    assert_eq!(s.status(), Status::LimitReached);
    assert!(s.stats().branches <= 4);
}

#[test]
fn time_limit_zero_stops_immediately() {
    let mut s = solver();
    let x = s.new_int_var(0, 1_000_000, "x");
    let mut db = Phase::new(vec![x], VarStrategy::FirstUnbound, ValueStrategy::Min);
    let mut limit = RegularLimit::time_limit(Duration::from_secs(0));
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut limit];
    s.solve(&mut db, &mut monitors);
    assert_eq!(s.status(), Status::LimitReached);
}

#[test]
fn or_limit_fires_on_either_side() {
    let mut s = solver();
    let vars: Vec<_> = (0..6).map(|i| s.new_int_var(0, 9, &format!("v{i}"))).collect();
    let mut db = min_phase(vars);
    let mut limit = OrLimit::new(
        Box::new(RegularLimit::branch_limit(2)),
        Box::new(RegularLimit::time_limit(Duration::from_secs(3600))),
    );
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut limit];
    s.solve(&mut db, &mut monitors);
    assert_eq!(s.status(), Status::LimitReached);
}

#[test]
fn custom_limit_consults_the_predicate() {
    let mut s = solver();
    let vars: Vec<_> = (0..4).map(|i| s.new_int_var(0, 3, &format!("v{i}"))).collect();
    let mut db = min_phase(vars);
    let mut limit = CustomLimit::new(Box::new(|s: &mut Solver| s.stats().branches >= 2));
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut limit];
    s.solve(&mut db, &mut monitors);
    assert_eq!(s.status(), Status::LimitReached);
}

#[test]
fn solution_limit_caps_enumeration() {
    let mut s = solver();
    let x = s.new_int_var(0, 9, "x");
    let mut collector = SolutionCollector::all_solutions(vec![x]);
    let mut limit = RegularLimit::solution_limit(3);
    let mut db = min_phase(vec![x]);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut collector, &mut limit];
    s.solve(&mut db, &mut monitors);
    assert_eq!(collector.solution_count(), 3);
    assert_eq!(s.status(), Status::LimitReached);
}

#[test]
fn restart_monitor_restarts_until_a_limit() {
    struct CountRestarts(u64);
    impl SearchMonitor for CountRestarts {
        fn restart_search(&mut self, _s: &mut Solver) {
            self.0 += 1;
        }
    }
    let mut s = solver();
    // An infeasible model that fails deep in the tree, so restarts fire.
    let vars: Vec<_> = (0..4).map(|i| s.new_int_var(0, 2, &format!("v{i}"))).collect();
    let c = s.linear_eq(&vars, &[1, 1, 1, 1], 100).unwrap();
    assert!(s.add_constraint(c).is_err());

    // Root-level infeasibility is caught before any search: solve is false.
    let mut db = min_phase(vars);
    let mut counter = CountRestarts(0);
    let mut restart = LubyRestart::new(1);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut restart, &mut counter];
    assert!(!s.solve(&mut db, &mut monitors));
}

#[test]
fn luby_restart_with_random_phase_still_finds_solutions() {
    let mut s = solver();
    let vars: Vec<_> = (0..3).map(|i| s.new_int_var(0, 2, &format!("v{i}"))).collect();
    let c = s.all_different(&vars, false);
    s.add_constraint(c).unwrap();
    let mut db = Phase::new(vars.clone(), VarStrategy::Random, ValueStrategy::Random);
    let mut restart = LubyRestart::new(2);
    let mut limit = RegularLimit::solution_limit(1);
    let mut collector = SolutionCollector::first_solution(vars.clone());
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut restart, &mut limit, &mut collector];
    assert!(s.solve(&mut db, &mut monitors));
    let a = collector.solution(0).unwrap();
    let mut vals: Vec<i64> = vars.iter().map(|&v| a.value_of(v).unwrap()).collect();
    vals.sort_unstable();
    assert_eq!(vals, vec![0, 1, 2]);
}

#[test]
fn symmetry_manager_prunes_mirror_solutions() {
    // Two free 0/1 variables with a value-swap symmetry between them: the
    // manager prunes one of the four assignments.
    struct Swap {
        x: VarId,
        y: VarId,
    }
    impl SymmetryBreaker for Swap {
        fn image(&mut self, _s: &Solver, var: VarId, value: i64) -> Option<(VarId, i64)> {
            if var == self.x {
                Some((self.y, value))
            } else if var == self.y {
                Some((self.x, value))
            } else {
                None
            }
        }
    }
    let mut s = solver();
    let x = s.new_int_var(0, 1, "x");
    let y = s.new_int_var(0, 1, "y");
    let mut collector = SolutionCollector::all_solutions(vec![x, y]);
    let mut manager = SymmetryManager::new(vec![Box::new(Swap { x, y })]);
    let mut db = min_phase(vec![x, y]);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut manager, &mut collector];
    assert!(s.solve(&mut db, &mut monitors));
    assert_eq!(collector.solution_count(), 3);
}

#[test]
fn collector_modes() {
    let mut s = solver();
    let x = s.new_int_var(0, 4, "x");
    let mut first = SolutionCollector::first_solution(vec![x]);
    let mut last = SolutionCollector::last_solution(vec![x]);
    let mut best = SolutionCollector::best_solution(x, true, vec![x]);
    let mut db = min_phase(vec![x]);
    {
        let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut first, &mut last, &mut best];
        assert!(s.solve(&mut db, &mut monitors));
    }
    assert_eq!(first.solution(0).unwrap().value_of(x), Some(0));
    assert_eq!(last.solution(0).unwrap().value_of(x), Some(4));
    assert_eq!(best.solution(0).unwrap().value_of(x), Some(4));
}

#[test]
fn split_strategy_bisects() {
    let mut s = solver();
    let x = s.new_int_var(0, 8, "x");
    let y = s.new_int_var(0, 8, "y");
    let c = s.linear_eq(&[x, y], &[1, 1], 8).unwrap();
    s.add_constraint(c).unwrap();
    let mut db = Phase::new(vec![x, y], VarStrategy::MinSizeLowestMin, ValueStrategy::Split);
    let mut limit = RegularLimit::solution_limit(1);
    let mut collector = SolutionCollector::first_solution(vec![x, y]);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut limit, &mut collector];
    assert!(s.solve(&mut db, &mut monitors));
    let a = collector.solution(0).unwrap();
    assert_eq!(a.value_of(x).unwrap() + a.value_of(y).unwrap(), 8);
}
