//! The all-different constraint.
//!
//! Two demons per instance: an immediate value-removal demon fired on each
//! variable that becomes bound, and (in the strong form) a delayed demon
//! running Hall-interval bounds filtering once cheap propagation has
//! settled.

use crate::queue::{DemonPriority, PropId, VarEvent};
use crate::store::Store;
use crate::vars::VarId;
use crate::{Conflict, PropResult};

use super::{watch_all, Propagator};

const BOUNDS_TAG: u32 = u32::MAX;

pub(crate) struct AllDifferent {
    vars: Vec<VarId>,
    strong: bool,
}

impl AllDifferent {
    pub fn new(vars: Vec<VarId>, strong: bool) -> Self {
        Self { vars, strong }
    }

    /// Removes the value of the freshly bound variable `i` everywhere else.
    fn on_bound(&self, s: &mut Store, i: usize) -> PropResult {
        let value = match s.assigned(self.vars[i]) {
            Some(v) => v,
            None => return Ok(()),
        };
        for (j, &other) in self.vars.iter().enumerate() {
            if j != i {
                s.remove_value(other, value)?;
            }
        }
        Ok(())
    }

    /// Hall-interval bounds filtering: an interval `[a, b]` saturated by as
    /// many variables as it has values excludes every other variable.
    fn hall_intervals(&self, s: &mut Store) -> PropResult {
        let n = self.vars.len();
        let mins: Vec<i64> = self.vars.iter().map(|&v| s.min(v)).collect();
        let maxs: Vec<i64> = self.vars.iter().map(|&v| s.max(v)).collect();
        let mut starts = mins.clone();
        starts.sort_unstable();
        starts.dedup();
        let mut ends = maxs.clone();
        ends.sort_unstable();
        ends.dedup();
        for &a in &starts {
            for &b in &ends {
                if b < a {
                    continue;
                }
                let width = b.saturating_sub(a).saturating_add(1);
                if width > n as i64 {
                    continue;
                }
                let inside = (0..n).filter(|&i| mins[i] >= a && maxs[i] <= b).count() as i64;
                if inside > width {
                    return Err(Conflict);
                }
                if inside == width {
                    for i in 0..n {
                        if mins[i] >= a && maxs[i] <= b {
                            continue;
                        }
                        if mins[i] >= a && mins[i] <= b {
                            s.set_min(self.vars[i], b + 1)?;
                        }
                        if maxs[i] >= a && maxs[i] <= b {
                            s.set_max(self.vars[i], a - 1)?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl Propagator for AllDifferent {
    fn post(&mut self, s: &mut Store, id: PropId) -> PropResult {
        for (i, &v) in self.vars.iter().enumerate() {
            watch_all(s, id, i as u32, &[v], VarEvent::Bound, DemonPriority::Normal);
        }
        if self.strong {
            watch_all(s, id, BOUNDS_TAG, &self.vars, VarEvent::Range, DemonPriority::Delayed);
        }
        Ok(())
    }

    fn initial_propagate(&mut self, s: &mut Store) -> PropResult {
        for i in 0..self.vars.len() {
            self.on_bound(s, i)?;
        }
        if self.strong {
            self.hall_intervals(s)?;
        }
        Ok(())
    }

    fn propagate(&mut self, s: &mut Store, tag: u32) -> PropResult {
        if tag == BOUNDS_TAG {
            self.hall_intervals(s)
        } else {
            self.on_bound(s, tag as usize)
        }
    }

    fn name(&self) -> &'static str {
        "all_different"
    }
}
