//! The reversible model state: variables + trail + demon queue.
//!
//! Every domain mutation funnels through [`Store`]: the early-return check
//! happens in the domain representation, the trail protects the cells, and
//! the store wakes the watcher lists of the fired event class. Bound events
//! wake range and domain watchers too; range events wake domain watchers.

use crate::domain::{Domain, DomainDelta, DomainOps};
use crate::queue::{DemonId, DemonPriority, DemonQueue, Demons, VarEvent};
use crate::trail::{Trail, UndoOp};
use crate::vars::{Lit, VarId, VarStore};
use crate::{Conflict, PropResult};

#[derive(Debug, Clone, Copy)]
struct StoreFrame {
    vars_len: usize,
    demons_len: usize,
}

/// Reversible solver state shared with every propagator.
#[derive(Debug, Default)]
pub struct Store {
    pub(crate) trail: Trail,
    pub(crate) vars: VarStore,
    pub(crate) demons: Demons,
    pub(crate) queue: DemonQueue,
    /// Propagation-pass counter; stamps old-bound snapshots and hole lists.
    pub(crate) pass: u64,
    /// Count of effective domain updates.
    pub(crate) domain_updates: u64,
    frames: Vec<StoreFrame>,
    scratch: Vec<DemonId>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    // ----- variable creation -----

    pub(crate) fn new_var_range(&mut self, min: i64, max: i64, name: &str) -> VarId {
        let dom = Domain::new_range(&mut self.trail, min, max);
        self.vars.push(name.to_owned(), dom, min, max)
    }

    pub(crate) fn new_var_values(&mut self, values: &[i64], name: &str) -> VarId {
        let dom = Domain::new_from_values(&mut self.trail, values);
        let (min, max) = (values[0], values[values.len() - 1]);
        self.vars.push(name.to_owned(), dom, min, max)
    }

    pub(crate) fn new_const(&mut self, value: i64, name: &str) -> VarId {
        let dom = Domain::new_from_values(&mut self.trail, &[value]);
        self.vars.push(name.to_owned(), dom, value, value)
    }

    pub(crate) fn new_bool(&mut self, name: &str) -> VarId {
        let v = self.new_var_range(0, 1, name);
        self.vars.get_mut(v).is_bool = true;
        v
    }

    pub(crate) fn set_presence(&mut self, v: VarId, presence: Lit) {
        self.vars.get_mut(v).presence = Some(presence);
    }

    // ----- reads -----

    #[inline]
    pub fn min(&self, v: VarId) -> i64 {
        self.vars.get(v).dom.min(&self.trail)
    }

    #[inline]
    pub fn max(&self, v: VarId) -> i64 {
        self.vars.get(v).dom.max(&self.trail)
    }

    #[inline]
    pub fn size(&self, v: VarId) -> u64 {
        self.vars.get(v).dom.size(&self.trail)
    }

    #[inline]
    pub fn contains(&self, v: VarId, value: i64) -> bool {
        self.vars.get(v).dom.contains(&self.trail, value)
    }

    /// True when the domain is a single value.
    #[inline]
    pub fn bound(&self, v: VarId) -> bool {
        self.min(v) == self.max(v)
    }

    /// Value of a bound variable (its minimum otherwise).
    #[inline]
    pub fn value(&self, v: VarId) -> i64 {
        self.min(v)
    }

    #[inline]
    pub fn assigned(&self, v: VarId) -> Option<i64> {
        let min = self.min(v);
        (min == self.max(v)).then_some(min)
    }

    pub fn first_ge(&self, v: VarId, value: i64) -> Option<i64> {
        self.vars.get(v).dom.first_ge(&self.trail, value)
    }

    pub fn last_le(&self, v: VarId, value: i64) -> Option<i64> {
        self.vars.get(v).dom.last_le(&self.trail, value)
    }

    /// Minimum at the start of the current propagation pass.
    pub fn old_min(&self, v: VarId) -> i64 {
        let data = self.vars.get(v);
        if data.pass_stamp == self.pass { data.old_min } else { data.dom.min(&self.trail) }
    }

    /// Maximum at the start of the current propagation pass.
    pub fn old_max(&self, v: VarId) -> i64 {
        let data = self.vars.get(v);
        if data.pass_stamp == self.pass { data.old_max } else { data.dom.max(&self.trail) }
    }

    /// Interior values removed during the current propagation pass.
    pub fn holes(&self, v: VarId) -> &[i64] {
        let data = self.vars.get(v);
        if data.pass_stamp == self.pass { &data.holes } else { &[] }
    }

    pub fn name(&self, v: VarId) -> &str {
        &self.vars.get(v).name
    }

    pub fn num_vars(&self) -> usize {
        self.vars.len()
    }

    /// Lazy iterator over the current domain, in increasing order.
    pub fn iter_domain(&self, v: VarId) -> DomainIter<'_> {
        DomainIter {
            store: self,
            var: v,
            next: Some(self.min(v)),
        }
    }

    // ----- literals -----

    pub fn lit_value(&self, l: Lit) -> Option<bool> {
        self.assigned(l.var).map(|v| (v == 1) != l.negated)
    }

    pub fn lit_is_true(&self, l: Lit) -> bool {
        self.lit_value(l) == Some(true)
    }

    pub fn lit_is_false(&self, l: Lit) -> bool {
        self.lit_value(l) == Some(false)
    }

    pub fn assign_lit(&mut self, l: Lit) -> PropResult {
        self.set_value(l.var, l.true_value())
    }

    /// True when the variable carries a presence literal that is false.
    pub fn absent(&self, v: VarId) -> bool {
        match self.vars.get(v).presence {
            Some(p) => self.lit_is_false(p),
            None => false,
        }
    }

    pub fn presence(&self, v: VarId) -> Option<Lit> {
        self.vars.get(v).presence
    }

    // ----- mutations -----

    pub fn set_min(&mut self, v: VarId, value: i64) -> PropResult {
        if self.absent(v) {
            return Ok(());
        }
        self.touch(v);
        let data = &mut self.vars.data[v.index()];
        let res = data.dom.set_min(&mut self.trail, value);
        self.finish(v, res)
    }

    pub fn set_max(&mut self, v: VarId, value: i64) -> PropResult {
        if self.absent(v) {
            return Ok(());
        }
        self.touch(v);
        let data = &mut self.vars.data[v.index()];
        let res = data.dom.set_max(&mut self.trail, value);
        self.finish(v, res)
    }

    pub fn set_range(&mut self, v: VarId, lo: i64, hi: i64) -> PropResult {
        if self.absent(v) {
            return Ok(());
        }
        self.touch(v);
        let data = &mut self.vars.data[v.index()];
        let res = data.dom.set_range(&mut self.trail, lo, hi);
        self.finish(v, res)
    }

    pub fn set_value(&mut self, v: VarId, value: i64) -> PropResult {
        self.set_range(v, value, value)
    }

    pub fn remove_value(&mut self, v: VarId, value: i64) -> PropResult {
        if self.absent(v) {
            return Ok(());
        }
        self.touch(v);
        let data = &mut self.vars.data[v.index()];
        let res = data.dom.remove_value(&mut self.trail, value, &mut data.holes);
        self.finish(v, res)
    }

    pub fn remove_interval(&mut self, v: VarId, lo: i64, hi: i64) -> PropResult {
        if self.absent(v) {
            return Ok(());
        }
        self.touch(v);
        let data = &mut self.vars.data[v.index()];
        let res = data.dom.remove_interval(&mut self.trail, lo, hi, &mut data.holes);
        self.finish(v, res)
    }

    /// Captures the old-bound snapshot and clears a stale hole list the
    /// first time a variable is touched in the current pass.
    fn touch(&mut self, v: VarId) {
        let pass = self.pass;
        let data = &mut self.vars.data[v.index()];
        if data.pass_stamp != pass {
            data.pass_stamp = pass;
            data.old_min = data.dom.min(&self.trail);
            data.old_max = data.dom.max(&self.trail);
            data.holes.clear();
        }
    }

    fn finish(&mut self, v: VarId, res: Result<DomainDelta, Conflict>) -> PropResult {
        match res {
            Ok(delta) => {
                if delta.any() {
                    self.domain_updates += 1;
                    self.notify(v, delta);
                }
                Ok(())
            }
            Err(c) => {
                // A forced contradiction on an optional variable negates its
                // presence literal instead of failing.
                if let Some(p) = self.vars.get(v).presence {
                    if self.lit_value(p).is_none() {
                        return self.assign_lit(!p);
                    }
                }
                Err(c)
            }
        }
    }

    fn notify(&mut self, v: VarId, delta: DomainDelta) {
        let bound_change = delta.min_changed || delta.max_changed;
        let now_bound = bound_change && self.bound(v);
        if now_bound {
            self.wake(v, VarEvent::Bound);
        }
        if bound_change {
            self.wake(v, VarEvent::Range);
        }
        self.wake(v, VarEvent::Domain);
    }

    fn wake(&mut self, v: VarId, event: VarEvent) {
        let data = &self.vars.data[v.index()];
        let list = &data.watchers[event as usize];
        // Collect first: enqueueing mutates the demon registry.
        self.scratch.clear();
        self.scratch.extend(list.immediate.iter().copied());
        let n_immediate = self.scratch.len();
        self.scratch.extend(list.delayed.iter().copied());
        for i in 0..self.scratch.len() {
            let d = self.scratch[i];
            let entry = self.demons.entry(d);
            if entry.queued {
                continue;
            }
            self.demons.set_queued(d, true);
            let priority = if i < n_immediate { entry.priority } else { DemonPriority::Delayed };
            self.queue.push(d, priority);
        }
    }

    // ----- demons -----

    pub(crate) fn register_demon(&mut self, prop: crate::queue::PropId, tag: u32, priority: DemonPriority) -> DemonId {
        self.demons.register(&mut self.trail, prop, tag, priority)
    }

    pub(crate) fn attach(&mut self, v: VarId, event: VarEvent, demon: DemonId, delayed: bool) {
        let list = self.vars.get_mut(v).watch_list(event);
        if delayed {
            list.delayed.push(demon);
        } else {
            list.immediate.push(demon);
        }
        self.trail.push_undo(UndoOp::WatcherPop { var: v, event, delayed });
    }

    /// Schedules a demon directly, as if one of its events had fired.
    #[allow(dead_code)]
    pub(crate) fn schedule(&mut self, d: DemonId) {
        let entry = self.demons.entry(d);
        if !entry.queued {
            self.demons.set_queued(d, true);
            self.queue.push(d, entry.priority);
        }
    }

    pub(crate) fn inhibit(&mut self, d: DemonId) {
        self.demons.inhibit(&mut self.trail, d);
    }

    #[allow(dead_code)]
    pub(crate) fn desinhibit(&mut self, d: DemonId) {
        self.demons.desinhibit(&mut self.trail, d);
    }

    pub(crate) fn clear_queue(&mut self) {
        self.scratch.clear();
        let mut scratch = std::mem::take(&mut self.scratch);
        self.queue.clear_into(&mut scratch);
        for &d in &scratch {
            self.demons.set_queued(d, false);
        }
        scratch.clear();
        self.scratch = scratch;
    }

    // ----- levels -----

    pub fn level(&self) -> u32 {
        self.trail.level()
    }

    pub(crate) fn push_level(&mut self) {
        self.frames.push(StoreFrame {
            vars_len: self.vars.len(),
            demons_len: self.demons.len(),
        });
        self.trail.push_level();
    }

    pub(crate) fn pop_level(&mut self) {
        self.clear_queue();
        let frame = match self.frames.pop() {
            Some(f) => f,
            None => return,
        };
        let vars = &mut self.vars;
        self.trail.pop_level_with(|op| {
            if let UndoOp::WatcherPop { var, event, delayed } = op {
                let list = vars.get_mut(var).watch_list(event);
                if delayed {
                    list.delayed.pop();
                } else {
                    list.immediate.pop();
                }
            }
        });
        self.vars.truncate(frame.vars_len);
        self.demons.truncate(frame.demons_len);
    }
}

/// Increasing iterator over a domain's values.
pub struct DomainIter<'a> {
    store: &'a Store,
    var: VarId,
    next: Option<i64>,
}

impl Iterator for DomainIter<'_> {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        let probe = self.next?;
        let value = self.store.first_ge(self.var, probe)?;
        self.next = value.checked_add(1);
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_and_backtrack() {
        let mut s = Store::new();
        let x = s.new_var_range(0, 10, "x");
        s.push_level();
        s.set_min(x, 4).unwrap();
        s.set_max(x, 6).unwrap();
        assert_eq!((s.min(x), s.max(x)), (4, 6));
        s.pop_level();
        assert_eq!((s.min(x), s.max(x)), (0, 10));
    }

    #[test]
    fn holes_are_scoped_to_a_pass() {
        let mut s = Store::new();
        let x = s.new_var_values(&[1, 3, 5, 7, 9], "x");
        s.pass += 1;
        s.remove_interval(x, 3, 5).unwrap();
        assert_eq!(s.holes(x), &[3, 5]);
        s.pass += 1;
        assert_eq!(s.holes(x), &[] as &[i64]);
    }

    #[test]
    fn old_bounds_snapshot_once_per_pass() {
        let mut s = Store::new();
        let x = s.new_var_range(0, 10, "x");
        s.pass += 1;
        s.set_min(x, 3).unwrap();
        s.set_min(x, 5).unwrap();
        assert_eq!(s.old_min(x), 0);
        assert_eq!(s.min(x), 5);
    }

    #[test]
    fn absent_optional_variable_ignores_mutations() {
        let mut s = Store::new();
        let p = s.new_bool("p");
        let x = s.new_var_range(0, 10, "x");
        s.set_presence(x, Lit::pos(p));
        s.assign_lit(Lit::neg(p)).unwrap();
        assert!(s.set_range(x, 40, 50).is_ok());
        assert_eq!((s.min(x), s.max(x)), (0, 10));
    }

    #[test]
    fn forced_contradiction_negates_presence() {
        let mut s = Store::new();
        let p = s.new_bool("p");
        let x = s.new_var_range(0, 10, "x");
        s.set_presence(x, Lit::pos(p));
        // Emptying the domain of an optional variable asserts absence.
        s.set_min(x, 11).unwrap();
        assert!(s.lit_is_false(Lit::pos(p)));
    }

    #[test]
    fn domain_iterator_walks_holes() {
        let mut s = Store::new();
        let x = s.new_var_values(&[1, 3, 5, 7, 9], "x");
        s.remove_value(x, 5).unwrap();
        let vals: Vec<i64> = s.iter_domain(x).collect();
        assert_eq!(vals, vec![1, 3, 7, 9]);
    }
}
