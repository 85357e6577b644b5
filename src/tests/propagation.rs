//! Propagation scenarios: linear relations, element, table, scheduling,
//! precedence, and the fixed-point / idempotence invariants.

use super::{min_phase, solver};
use crate::monitors::{SearchMonitor, SolutionCollector};

#[test]
fn linear_sum_propagates_bounds() {
    let mut s = solver();
    let x = s.new_int_var(0, 10, "x");
    let y = s.new_int_var(0, 10, "y");
    let c = s.linear_eq(&[x, y], &[1, 1], 5).unwrap();
    s.add_constraint(c).unwrap();
    assert_eq!(s.max(x), 5);
    assert_eq!(s.max(y), 5);
    s.set_value(x, 3).unwrap();
    s.propagate().unwrap();
    assert_eq!(s.assigned(y), Some(2));
}

#[test]
fn precedence_chain_and_cycle() {
    let mut s = solver();
    let a = s.new_int_var(0, 10, "a");
    let b = s.new_int_var(0, 10, "b");
    let c = s.new_int_var(0, 10, "c");
    // a <= b - 1, b <= c - 1 is fine...
    s.add_precedence(a, b, 1).unwrap();
    s.add_precedence(b, c, 1).unwrap();
    assert_eq!(s.min(b), 1);
    assert_eq!(s.min(c), 2);
    assert_eq!(s.max(a), 8);
    // ...but closing the cycle c <= a - 1 must fail.
    assert!(s.add_precedence(c, a, 1).is_err());
}

#[test]
fn element_constrains_both_ways() {
    let mut s = solver();
    let index = s.new_int_var(0, 10, "i");
    let result = s.new_int_var(5, 20, "r");
    let c = s.element(index, &[2, 9, 4, 7, 11], result);
    s.add_constraint(c).unwrap();
    // Indices whose table entry cannot match the result are gone.
    let idx: Vec<i64> = s.store.iter_domain(index).collect();
    assert_eq!(idx, vec![1, 3, 4]);
    assert_eq!((s.min(result), s.max(result)), (7, 11));
    s.set_max(result, 9).unwrap();
    s.propagate().unwrap();
    let idx: Vec<i64> = s.store.iter_domain(index).collect();
    assert_eq!(idx, vec![1, 3]);
}

#[test]
fn table_keeps_only_supported_values() {
    let mut s = solver();
    let x = s.new_int_var(0, 5, "x");
    let y = s.new_int_var(0, 5, "y");
    let c = s
        .table_constraint(&[x, y], vec![vec![0, 1], vec![2, 3], vec![4, 5], vec![4, 1]])
        .unwrap();
    s.add_constraint(c).unwrap();
    let xs: Vec<i64> = s.store.iter_domain(x).collect();
    assert_eq!(xs, vec![0, 2, 4]);
    s.remove_value(y, 1).unwrap();
    s.propagate().unwrap();
    let xs: Vec<i64> = s.store.iter_domain(x).collect();
    assert_eq!(xs, vec![2, 4]);
    let ys: Vec<i64> = s.store.iter_domain(y).collect();
    assert_eq!(ys, vec![3, 5]);
}

#[test]
fn cumulative_detects_overload_and_pushes() {
    let mut s = solver();
    // Two unit-demand tasks of length 3 forced into [0, 5] with capacity 1:
    // the second must follow the first.
    let t0 = s.new_int_var(0, 0, "t0");
    let t1 = s.new_int_var(0, 5, "t1");
    let c = s.cumulative(&[t0, t1], &[3, 3], &[1, 1], 1).unwrap();
    s.add_constraint(c).unwrap();
    assert_eq!(s.min(t1), 3);

    // Capacity 2 admits both in parallel.
    let mut s = solver();
    let t0 = s.new_int_var(0, 0, "t0");
    let t1 = s.new_int_var(0, 5, "t1");
    let c = s.cumulative(&[t0, t1], &[3, 3], &[1, 1], 2).unwrap();
    s.add_constraint(c).unwrap();
    assert_eq!(s.min(t1), 0);

    // Overload: three compulsory unit tasks at the same time, capacity 2.
    let mut s = solver();
    let vars: Vec<_> = (0..3).map(|i| s.new_int_var(0, 0, &format!("t{i}"))).collect();
    let c = s.cumulative(&vars, &[2, 2, 2], &[1, 1, 1], 2).unwrap();
    assert!(s.add_constraint(c).is_err());
}

#[test]
fn no_overlap_orders_two_fixed_tasks() {
    let mut s = solver();
    let t0 = s.new_int_var(0, 0, "t0");
    let t1 = s.new_int_var(0, 9, "t1");
    let c = s.no_overlap(&[t0, t1], &[4, 2]).unwrap();
    s.add_constraint(c).unwrap();
    assert_eq!(s.min(t1), 4);
}

#[test]
fn all_different_enumerates_permutations() {
    let mut s = solver();
    let vars: Vec<_> = (0..3).map(|i| s.new_int_var(0, 2, &format!("v{i}"))).collect();
    let c = s.all_different(&vars, true);
    s.add_constraint(c).unwrap();
    let mut collector = SolutionCollector::all_solutions(vars.clone());
    let mut db = min_phase(vars.clone());
    let mut monitors: Vec<&mut dyn SearchMonitor> = vec![&mut collector];
    assert!(s.solve(&mut db, &mut monitors));
    // Soundness and completeness: exactly the 6 permutations.
    assert_eq!(collector.solution_count(), 6);
    for i in 0..6 {
        let a = collector.solution(i).unwrap();
        let mut vals: Vec<i64> = vars.iter().map(|&v| a.value_of(v).unwrap()).collect();
        vals.sort_unstable();
        assert_eq!(vals, vec![0, 1, 2]);
    }
}

#[test]
fn propagation_reaches_a_fixed_point() {
    let mut s = solver();
    let x = s.new_int_var(0, 10, "x");
    let y = s.new_int_var(0, 10, "y");
    let c = s.linear_eq(&[x, y], &[1, 1], 5).unwrap();
    s.add_constraint(c).unwrap();
    // At the fixed point the queue is drained and another pass is a no-op.
    assert!(s.store.queue.is_empty());
    let (xmin, xmax, ymin, ymax) = (s.min(x), s.max(x), s.min(y), s.max(y));
    s.propagate().unwrap();
    assert_eq!((s.min(x), s.max(x), s.min(y), s.max(y)), (xmin, xmax, ymin, ymax));
}

#[test]
fn tighter_set_range_enqueues_no_demon() {
    let mut s = solver();
    let x = s.new_int_var(0, 10, "x");
    let y = s.new_int_var(0, 10, "y");
    let c = s.linear_le(&[x, y], &[1, 1], 12).unwrap();
    s.add_constraint(c).unwrap();
    assert!(s.store.queue.is_empty());
    // Looser or equal bounds must not wake anything.
    s.set_range(x, 0, 10).unwrap();
    s.set_min(x, 0).unwrap();
    s.set_max(x, 10).unwrap();
    assert!(s.store.queue.is_empty());
}

#[test]
fn reification_tracks_entailment() {
    let mut s = solver();
    let x = s.new_int_var(0, 10, "x");
    let b = s.is_greater_or_equal_cst(x, 5).unwrap();
    assert_eq!(s.assigned(b), None);
    s.set_min(x, 7).unwrap();
    s.propagate().unwrap();
    assert_eq!(s.assigned(b), Some(1));

    let y = s.new_int_var(0, 10, "y");
    let eq = s.is_equal_cst(y, 3).unwrap();
    s.set_value(eq, 0).unwrap();
    s.propagate().unwrap();
    assert!(!s.contains(y, 3));
}

#[test]
fn optional_precedence_disables_doomed_arc() {
    let mut s = solver();
    let a = s.new_int_var(0, 10, "a");
    let b = s.new_int_var(0, 10, "b");
    let lit = s.new_bool_var("use_arc");
    // a + 20 <= b cannot hold within [0, 10] domains.
    s.add_conditional_precedence(a, b, 20, crate::vars::Lit::pos(lit)).unwrap();
    assert_eq!(s.assigned(lit), Some(0));
}

#[test]
fn interval_removal_reports_holes() {
    let mut s = solver();
    let x = s.new_int_var_from_values(&[1, 3, 5, 7, 9], "x").unwrap();
    s.remove_interval(x, 3, 5).unwrap();
    let vals: Vec<i64> = s.store.iter_domain(x).collect();
    assert_eq!(vals, vec![1, 7, 9]);
    assert_eq!(s.holes(x), &[3, 5]);
    // The next propagation pass starts a fresh hole list.
    s.propagate().unwrap();
    s.remove_value(x, 7).unwrap();
    assert_eq!(s.holes(x), &[7]);
    assert_eq!((s.old_min(x), s.old_max(x)), (1, 9));
}

#[test]
fn expression_materialization_links_both_ways() {
    let mut s = solver();
    let x = s.new_int_var(0, 10, "x");
    let e = s.expr_var(x);
    let sq = s.square(e);
    let v = s.var_of(sq).unwrap();
    assert_eq!((s.min(v), s.max(v)), (0, 100));
    s.set_max(v, 17).unwrap();
    s.propagate().unwrap();
    assert_eq!(s.max(x), 4);
    s.set_min(x, 3).unwrap();
    s.propagate().unwrap();
    assert_eq!(s.min(v), 9);
}
