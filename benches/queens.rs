use coppice::search::phase::{Phase, ValueStrategy, VarStrategy};
use coppice::{Solver, SolverParameters};

fn main() {
    divan::main();
}

fn solve_queens(n: i64, all: bool) -> u64 {
    let mut s = Solver::new(SolverParameters::default());
    let queens: Vec<_> = (0..n).map(|i| s.new_int_var(0, n - 1, &format!("q{i}"))).collect();
    let c = s.all_different(&queens, false);
    s.add_constraint(c).unwrap();
    for sign in [1i64, -1] {
        let diag: Vec<_> = queens
            .iter()
            .enumerate()
            .map(|(i, &q)| {
                let e = s.expr_var(q);
                let k = s.expr_const(sign * i as i64);
                let sum = s.sum(e, k);
                s.var_of(sum).unwrap()
            })
            .collect();
        let c = s.all_different(&diag, false);
        s.add_constraint(c).unwrap();
    }
    let mut db = Phase::new(queens, VarStrategy::FirstUnbound, ValueStrategy::Min);
    if all {
        s.solve(&mut db, &mut []);
        s.stats().solutions
    } else {
        let mut monitors: [&mut dyn coppice::SearchMonitor; 0] = [];
        let mut session = coppice::search::SearchSession::new(&mut s, &mut db, &mut monitors);
        let found = session.next_solution();
        session.end_search();
        found as u64
    }
}

#[divan::bench]
fn queens8_first_solution() -> u64 {
    solve_queens(8, false)
}

#[divan::bench]
fn queens8_all_solutions() -> u64 {
    solve_queens(8, true)
}

#[divan::bench]
fn queens10_first_solution() -> u64 {
    solve_queens(10, false)
}
