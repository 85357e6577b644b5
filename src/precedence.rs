//! Precedence (difference) constraints: `tail + offset <= head`.
//!
//! All arcs live in one shared graph so cycles across constraints are
//! caught. Nodes are lower-bound views: both `x` and `-x` get a view, which
//! makes upper-bound propagation the same code as lower-bound propagation
//! (an arc `x + d <= y` also yields `-y + d <= -x`).
//!
//! Arcs may carry an optional offset variable (its minimum joins the
//! constant offset) and an optional presence literal: the arc propagates
//! only while the literal is true, and an arc that can no longer be
//! satisfied has its literal assigned false instead of failing.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::constraints::Propagator;
use crate::queue::{DemonId, DemonPriority, PropId, VarEvent};
use crate::store::Store;
use crate::util::{cap_add, cap_opp};
use crate::vars::{Lit, VarId};
use crate::{Conflict, PropResult};

/// A lower-bound view: `lb(x)` or `lb(-x)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeView(u32);

impl NodeView {
    pub fn pos(v: VarId) -> NodeView {
        NodeView(v.0 << 1)
    }

    pub fn neg(v: VarId) -> NodeView {
        NodeView((v.0 << 1) | 1)
    }

    pub fn var(self) -> VarId {
        VarId(self.0 >> 1)
    }

    pub fn is_neg(self) -> bool {
        self.0 & 1 == 1
    }

    /// Current value of the view: `min(x)` or `-max(x)`.
    fn value(self, s: &Store) -> i64 {
        if self.is_neg() { cap_opp(s.max(self.var())) } else { s.min(self.var()) }
    }

    /// Largest value the view can reach before its domain empties.
    fn limit(self, s: &Store) -> i64 {
        if self.is_neg() { cap_opp(s.min(self.var())) } else { s.max(self.var()) }
    }

    fn raise(self, s: &mut Store, v: i64) -> PropResult {
        if self.is_neg() { s.set_max(self.var(), cap_opp(v)) } else { s.set_min(self.var(), v) }
    }
}

#[derive(Debug, Clone, Copy)]
struct Arc {
    tail: NodeView,
    head: NodeView,
    offset: i64,
    offset_var: Option<VarId>,
    enabler: Option<Lit>,
}

impl Arc {
    fn effective_offset(&self, s: &Store) -> i64 {
        match self.offset_var {
            Some(v) => cap_add(self.offset, s.min(v)),
            None => self.offset,
        }
    }

    fn active(&self, s: &Store) -> bool {
        match self.enabler {
            Some(l) => s.lit_is_true(l),
            None => true,
        }
    }

    /// True while the enabler is unassigned.
    fn potential(&self, s: &Store) -> bool {
        matches!(self.enabler, Some(l) if s.lit_value(l).is_none())
    }
}

/// The shared precedence propagator. One instance per solver, created on the
/// first precedence constraint; later constraints append arcs (at the root
/// level only) and reuse its demon.
#[derive(Default)]
pub(crate) struct Precedence {
    arcs: Vec<Arc>,
    out: HashMap<NodeView, Vec<u32>>,
    /// Variables already watched by the shared demon.
    watched: HashSet<VarId>,
    demon: Option<DemonId>,
    queue: VecDeque<NodeView>,
}

impl Precedence {
    /// Adds `tail + offset (+ offset_var) <= head`, with both directed
    /// views. Must be called at the root level.
    pub fn add_arc(
        &mut self,
        s: &mut Store,
        tail: VarId,
        head: VarId,
        offset: i64,
        offset_var: Option<VarId>,
        enabler: Option<Lit>,
    ) {
        debug_assert_eq!(s.level(), 0, "precedence arcs are model-time objects");
        let forward = Arc {
            tail: NodeView::pos(tail),
            head: NodeView::pos(head),
            offset,
            offset_var,
            enabler,
        };
        let backward = Arc {
            tail: NodeView::neg(head),
            head: NodeView::neg(tail),
            offset,
            offset_var,
            enabler,
        };
        for arc in [forward, backward] {
            let id = self.arcs.len() as u32;
            self.out.entry(arc.tail).or_default().push(id);
            self.arcs.push(arc);
        }
        self.watch(s, tail);
        self.watch(s, head);
        if let Some(v) = offset_var {
            self.watch(s, v);
        }
        if let Some(l) = enabler {
            self.watch(s, l.var());
        }
    }

    fn watch(&mut self, s: &mut Store, v: VarId) {
        let demon = match self.demon {
            Some(d) => d,
            None => return,
        };
        if self.watched.insert(v) {
            s.attach(v, VarEvent::Range, demon, true);
        }
    }

    /// One full relaxation pass over the active arcs. The relaxation count
    /// is bounded by the Bellman-Ford limit; exceeding it means the offsets
    /// along some enabled cycle sum to a positive value.
    fn pass(&mut self, s: &mut Store) -> PropResult {
        let cap = (self.arcs.len() as u64 + 1) * (self.out.len() as u64 + 1);
        let mut relaxations = 0u64;
        self.queue.clear();
        for &view in self.out.keys() {
            self.queue.push_back(view);
        }
        while let Some(tail) = self.queue.pop_front() {
            let tail_value = tail.value(s);
            let arc_ids = match self.out.get(&tail) {
                Some(ids) => ids.clone(),
                None => continue,
            };
            for id in arc_ids {
                let arc = self.arcs[id as usize];
                if !arc.active(s) {
                    continue;
                }
                let needed = cap_add(tail_value, arc.effective_offset(s));
                if arc.head.value(s) < needed {
                    arc.head.raise(s, needed)?;
                    relaxations += 1;
                    if relaxations > cap {
                        log::debug!("precedence: positive cycle through {}", arc.head.var());
                        return Err(Conflict);
                    }
                    self.queue.push_back(arc.head);
                }
            }
        }
        // A potential arc that can no longer be satisfied is disabled by
        // assigning the negation of its presence literal.
        for i in 0..self.arcs.len() {
            let arc = self.arcs[i];
            if !arc.potential(s) {
                continue;
            }
            let needed = cap_add(arc.tail.value(s), arc.effective_offset(s));
            if needed > arc.head.limit(s) {
                if let Some(l) = arc.enabler {
                    s.assign_lit(!l)?;
                }
            }
        }
        Ok(())
    }
}

impl Propagator for Precedence {
    fn post(&mut self, s: &mut Store, id: PropId) -> PropResult {
        self.demon = Some(s.register_demon(id, 0, DemonPriority::Var));
        // Arcs may already be present if they were queued before posting.
        let vars: Vec<VarId> = self
            .arcs
            .iter()
            .flat_map(|a| {
                let mut vs = vec![a.tail.var(), a.head.var()];
                vs.extend(a.offset_var);
                vs.extend(a.enabler.map(|l| l.var()));
                vs
            })
            .collect();
        self.watched.clear();
        for v in vars {
            self.watch(s, v);
        }
        Ok(())
    }

    fn initial_propagate(&mut self, s: &mut Store) -> PropResult {
        self.pass(s)
    }

    fn name(&self) -> &'static str {
        "precedence"
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Store, Precedence, Vec<VarId>) {
        let mut s = Store::new();
        let vars = (0..3).map(|i| s.new_var_range(0, 10, &format!("t{i}"))).collect();
        let mut p = Precedence::default();
        p.demon = Some(s.register_demon(PropId(0), 0, DemonPriority::Var));
        (s, p, vars)
    }

    #[test]
    fn chain_propagates_minimums() {
        let (mut s, mut p, v) = setup();
        p.add_arc(&mut s, v[0], v[1], 2, None, None);
        p.add_arc(&mut s, v[1], v[2], 3, None, None);
        s.set_min(v[0], 1).unwrap();
        p.pass(&mut s).unwrap();
        assert_eq!(s.min(v[1]), 3);
        assert_eq!(s.min(v[2]), 6);
        // The reverse views tighten maxima too.
        assert_eq!(s.max(v[0]), 5);
        assert_eq!(s.max(v[1]), 7);
    }

    #[test]
    fn positive_cycle_fails() {
        let (mut s, mut p, v) = setup();
        // a <= b - 1, b <= c - 1, c <= a - 1
        p.add_arc(&mut s, v[0], v[1], 1, None, None);
        p.add_arc(&mut s, v[1], v[2], 1, None, None);
        p.add_arc(&mut s, v[2], v[0], 1, None, None);
        assert!(p.pass(&mut s).is_err());
    }

    #[test]
    fn doomed_optional_arc_is_disabled_not_failed() {
        let (mut s, mut p, v) = setup();
        let b = s.new_bool("b");
        p.add_arc(&mut s, v[0], v[1], 20, None, Some(Lit::pos(b)));
        // An offset of 20 can never fit in [0, 10] domains.
        p.pass(&mut s).unwrap();
        assert!(s.lit_is_false(Lit::pos(b)));
    }

    #[test]
    fn offset_variable_contributes_its_minimum() {
        let (mut s, mut p, v) = setup();
        let d = s.new_var_range(4, 6, "d");
        p.add_arc(&mut s, v[0], v[1], 0, Some(d), None);
        p.pass(&mut s).unwrap();
        assert_eq!(s.min(v[1]), 4);
    }
}
