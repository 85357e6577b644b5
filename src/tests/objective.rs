//! Objective monitor and metaheuristic scenarios.

use super::{max_phase, min_phase, solver};
use crate::limits::RegularLimit;
use crate::metaheuristics::{SimulatedAnnealing, TabuSearch};
use crate::monitors::{SearchMonitor, SolutionCollector};
use crate::objective::{ObjectiveItem, OptimizeVar};
use crate::search::SearchSession;

#[test]
fn optimize_steps_down_by_two() {
    let mut s = solver();
    let z = s.new_int_var(0, 10, "z");
    let mut optimize = OptimizeVar::minimize(&mut s, z, 2).unwrap();
    let mut db = max_phase(vec![z]);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut optimize];
    let mut session = SearchSession::new(&mut s, &mut db, &mut monitors);

    // First descent takes the maximum.
    assert!(session.next_solution());
    assert_eq!(session.solver_ref().value(z), 10);
    // After a solution at 10, the stepped cut allows at most 8, and the
    // max-value heuristic takes it, and so on down in steps of two.
    for want in [8, 6, 4, 2, 0] {
        assert!(session.next_solution());
        assert_eq!(session.solver_ref().value(z), want);
    }
    assert!(!session.next_solution());
    session.end_search();
    assert_eq!(optimize.best_value(0), Some(0));
}

#[test]
fn optimize_posts_bound_after_solution() {
    let mut s = solver();
    let z = s.new_int_var(0, 10, "z");
    let free = s.new_int_var(0, 1, "free");
    let mut optimize = OptimizeVar::minimize(&mut s, z, 2).unwrap();
    let mut db = max_phase(vec![z, free]);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut optimize];
    let mut session = SearchSession::new(&mut s, &mut db, &mut monitors);
    // Solution at z = 10; resuming refutes `free` first, and the cut z <= 8
    // is installed before the next decision.
    assert!(session.next_solution());
    assert_eq!(session.solver_ref().value(z), 10);
    assert!(session.next_solution());
    assert!(session.solver_ref().value(z) <= 8);
    session.end_search();
}

#[test]
fn maximize_reaches_the_top() {
    let mut s = solver();
    let x = s.new_int_var(0, 7, "x");
    let mut optimize = OptimizeVar::maximize(&mut s, x, 1).unwrap();
    let mut collector = SolutionCollector::last_solution(vec![x]);
    let mut db = min_phase(vec![x]);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut optimize, &mut collector];
    assert!(s.solve(&mut db, &mut monitors));
    assert_eq!(collector.last().unwrap().value_of(x), Some(7));
    assert_eq!(optimize.best_value(0), Some(7));
}

#[test]
fn lexicographic_objective_orders_components() {
    let mut s = solver();
    let a = s.new_int_var(0, 3, "a");
    let b = s.new_int_var(0, 3, "b");
    let items = vec![
        ObjectiveItem { var: a, maximize: false, step: 1 },
        ObjectiveItem { var: b, maximize: false, step: 1 },
    ];
    let mut optimize = OptimizeVar::lexicographic(&mut s, items).unwrap();
    let mut collector = SolutionCollector::last_solution(vec![a, b]);
    let mut db = max_phase(vec![a, b]);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut optimize, &mut collector];
    assert!(s.solve(&mut db, &mut monitors));
    let best = collector.last().unwrap();
    assert_eq!(best.value_of(a), Some(0));
    assert_eq!(best.value_of(b), Some(0));
}

#[test]
fn weighted_optimize_minimizes_the_sum() {
    let mut s = solver();
    let x = s.new_int_var(0, 5, "x");
    let y = s.new_int_var(0, 5, "y");
    let c = s.linear_ge(&[x, y], &[1, 1], 4).unwrap();
    s.add_constraint(c).unwrap();
    let mut optimize = OptimizeVar::weighted(&mut s, false, &[x, y], &[2, 3], 1).unwrap();
    let mut collector = SolutionCollector::last_solution(vec![x, y]);
    let mut db = max_phase(vec![x, y]);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut optimize, &mut collector];
    assert!(s.solve(&mut db, &mut monitors));
    let best = collector.last().unwrap();
    // 2x + 3y is minimized at x = 4, y = 0.
    assert_eq!(best.value_of(x), Some(4));
    assert_eq!(best.value_of(y), Some(0));
}

fn tabu_toy(keep_tenure: i64, forbid_tenure: i64) -> (Vec<Vec<i64>>, Option<i64>) {
    let mut s = solver();
    let x = s.new_int_var(0, 3, "x");
    let y = s.new_int_var(0, 3, "y");
    let e = s.sum_vars(&[x, y]);
    let z = s.var_of(e).unwrap();
    let items = vec![ObjectiveItem { var: z, maximize: false, step: 1 }];
    let mut tabu = TabuSearch::new(&mut s, items, vec![x, y], keep_tenure, forbid_tenure, 1.0).unwrap();
    let mut collector = SolutionCollector::all_solutions(vec![x, y]);
    let mut db = max_phase(vec![x, y]);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut tabu, &mut collector];
    s.solve(&mut db, &mut monitors);
    let sols: Vec<Vec<i64>> = (0..collector.solution_count())
        .map(|i| {
            let a = collector.solution(i).unwrap();
            vec![a.value_of(x).unwrap(), a.value_of(y).unwrap()]
        })
        .collect();
    let best = sols.iter().map(|v| v[0] + v[1]).min();
    (sols, best)
}

#[test]
fn tabu_walk_reaches_the_optimum() {
    let (sols, best) = tabu_toy(2, 0);
    assert!(!sols.is_empty());
    assert_eq!(best, Some(0));
    // Plateau rejection: consecutive accepted neighbors differ in at least
    // one variable.
    for w in sols.windows(2) {
        assert_ne!(w[0], w[1]);
    }
}

#[test]
fn generic_tabu_terminates() {
    let mut s = solver();
    let x = s.new_int_var(0, 3, "x");
    let y = s.new_int_var(0, 3, "y");
    let e = s.sum_vars(&[x, y]);
    let z = s.var_of(e).unwrap();
    let items = vec![ObjectiveItem { var: z, maximize: false, step: 1 }];
    let mut tabu = TabuSearch::generic(&mut s, items, vec![x, y], 2).unwrap();
    let mut db = max_phase(vec![x, y]);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut tabu];
    s.solve(&mut db, &mut monitors);
    // The walk must close on the optimum.
    assert!(s.stats().solutions > 0);
}

#[test]
fn simulated_annealing_accepts_and_cools() {
    let mut s = solver();
    let x = s.new_int_var(0, 3, "x");
    let y = s.new_int_var(0, 3, "y");
    let e = s.sum_vars(&[x, y]);
    let z = s.var_of(e).unwrap();
    let items = vec![ObjectiveItem { var: z, maximize: false, step: 1 }];
    let mut sa = SimulatedAnnealing::new(&mut s, items, vec![20]).unwrap();
    let mut collector = SolutionCollector::best_solution(z, false, vec![x, y]);
    // The annealing walk runs until cut off; a solution limit bounds it.
    let mut limit = RegularLimit::solution_limit(40);
    let mut db = max_phase(vec![x, y]);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut sa, &mut collector, &mut limit];
    assert!(s.solve(&mut db, &mut monitors));
    let best = collector.solution(0).unwrap();
    assert_eq!(best.objective(), Some(&[0][..]));
}

#[test]
fn guided_local_search_penalizes_and_improves() {
    use crate::metaheuristics::GuidedLocalSearch;
    let mut s = solver();
    let x = s.new_int_var(0, 3, "x");
    let y = s.new_int_var(0, 3, "y");
    let e = s.sum_vars(&[x, y]);
    let z = s.var_of(e).unwrap();
    let item = ObjectiveItem { var: z, maximize: false, step: 1 };
    let mut gls = GuidedLocalSearch::new(
        &mut s,
        item,
        vec![x, y],
        Box::new(|_, value| value),
        0.5,
        true,
    )
    .unwrap();
    let mut collector = SolutionCollector::best_solution(z, false, vec![x, y]);
    let mut limit = RegularLimit::solution_limit(40);
    let mut db = max_phase(vec![x, y]);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut gls, &mut collector, &mut limit];
    assert!(s.solve(&mut db, &mut monitors));
    let best = collector.solution(0).unwrap();
    assert_eq!(best.objective(), Some(&[0][..]));
}

#[test]
fn metaheuristics_reject_worsening_without_lists() {
    // With no tabu tenure at all the walk stops at the first local optimum.
    let (sols, best) = tabu_toy(0, 0);
    assert!(!sols.is_empty());
    assert_eq!(best, Some(0));
}
