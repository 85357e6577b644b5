//! The n-queens scenario: three all-different constraints over the queen
//! columns and their two diagonal views.

use super::{min_phase, solver};
use crate::monitors::{SearchMonitor, SolutionCollector};
use crate::search::SearchSession;
use crate::solver::Solver;
use crate::vars::VarId;

fn build_queens(s: &mut Solver, n: i64) -> Vec<VarId> {
    let queens: Vec<VarId> = (0..n)
        .map(|i| s.new_int_var(0, n - 1, &format!("q{i}")))
        .collect();
    let c = s.all_different(&queens, false);
    s.add_constraint(c).unwrap();
    let plus: Vec<VarId> = queens
        .iter()
        .enumerate()
        .map(|(i, &q)| {
            let e = s.expr_var(q);
            let k = s.expr_const(i as i64);
            let sum = s.sum(e, k);
            s.var_of(sum).unwrap()
        })
        .collect();
    let c = s.all_different(&plus, false);
    s.add_constraint(c).unwrap();
    let minus: Vec<VarId> = queens
        .iter()
        .enumerate()
        .map(|(i, &q)| {
            let e = s.expr_var(q);
            let k = s.expr_const(-(i as i64));
            let sum = s.sum(e, k);
            s.var_of(sum).unwrap()
        })
        .collect();
    let c = s.all_different(&minus, false);
    s.add_constraint(c).unwrap();
    queens
}

fn values(s: &Solver, vars: &[VarId]) -> Vec<i64> {
    vars.iter().map(|&v| s.value(v)).collect()
}

#[test]
fn eight_queens_has_92_solutions() {
    let mut s = solver();
    let queens = build_queens(&mut s, 8);
    let mut collector = SolutionCollector::all_solutions(queens.clone());
    let mut db = min_phase(queens);
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut collector];
    assert!(s.solve(&mut db, &mut monitors));
    assert_eq!(collector.solution_count(), 92);
}

#[test]
fn eight_queens_first_solution() {
    let mut s = solver();
    let queens = build_queens(&mut s, 8);
    let mut db = min_phase(queens.clone());
    let mut monitors: [&mut dyn SearchMonitor; 0] = [];
    let mut session = SearchSession::new(&mut s, &mut db, &mut monitors);
    assert!(session.next_solution());
    assert_eq!(values(session_solver(&session), &queens), vec![0, 4, 7, 5, 2, 6, 1, 3]);
    session.end_search();
}

#[test]
fn eight_queens_first_five_solutions_in_order() {
    let expected: Vec<Vec<i64>> = vec![
        vec![0, 4, 7, 5, 2, 6, 1, 3],
        vec![0, 5, 7, 2, 6, 3, 1, 4],
        vec![0, 6, 3, 5, 7, 1, 4, 2],
        vec![0, 6, 4, 7, 1, 3, 5, 2],
        vec![1, 3, 5, 7, 2, 0, 6, 4],
    ];
    let mut s = solver();
    let queens = build_queens(&mut s, 8);
    let mut db = min_phase(queens.clone());
    let mut monitors: [&mut dyn SearchMonitor; 0] = [];
    let mut session = SearchSession::new(&mut s, &mut db, &mut monitors);
    for want in expected {
        assert!(session.next_solution());
        assert_eq!(values(session_solver(&session), &queens), want);
    }
    session.end_search();
}

#[test]
fn four_queens_solutions_are_valid() {
    let mut s = solver();
    let queens = build_queens(&mut s, 4);
    let mut collector = SolutionCollector::all_solutions(queens.clone());
    let mut db = min_phase(queens.clone());
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut collector];
    assert!(s.solve(&mut db, &mut monitors));
    assert_eq!(collector.solution_count(), 2);
    for i in 0..collector.solution_count() {
        let a = collector.solution(i).unwrap();
        let q: Vec<i64> = queens.iter().map(|&v| a.value_of(v).unwrap()).collect();
        for x in 0..4 {
            for y in x + 1..4 {
                assert_ne!(q[x], q[y]);
                assert_ne!(q[x] + x as i64, q[y] + y as i64);
                assert_ne!(q[x] - (x as i64), q[y] - (y as i64));
            }
        }
    }
}

fn session_solver<'x>(session: &'x SearchSession<'_, '_>) -> &'x Solver {
    session.solver_ref()
}
