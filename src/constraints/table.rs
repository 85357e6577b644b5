//! Positive table constraint over reversible sparse tuple sets.
//!
//! Valid tuples are the first `active_len` entries of `order`. Invalid
//! tuples are swapped past the boundary; only the boundary itself is
//! trailed, so backtracking re-admits them without touching the
//! permutation.

use std::collections::HashSet;

use crate::queue::{DemonPriority, PropId, VarEvent};
use crate::store::Store;
use crate::trail::RevCell;
use crate::vars::VarId;
use crate::{Conflict, PropResult};

use super::{watch_all, Propagator};

pub(crate) struct TableCt {
    vars: Vec<VarId>,
    tuples: Vec<Vec<i64>>,
    order: Vec<u32>,
    active_len: Option<RevCell>,
}

impl TableCt {
    pub fn new(vars: Vec<VarId>, tuples: Vec<Vec<i64>>) -> Self {
        let order = (0..tuples.len() as u32).collect();
        Self {
            vars,
            tuples,
            order,
            active_len: None,
        }
    }

    fn tuple_valid(&self, s: &Store, t: usize) -> bool {
        self.vars
            .iter()
            .zip(&self.tuples[t])
            .all(|(&v, &value)| s.contains(v, value))
    }
}

impl Propagator for TableCt {
    fn post(&mut self, s: &mut Store, id: PropId) -> PropResult {
        self.active_len = Some(s.trail.new_cell(self.tuples.len() as i64));
        watch_all(s, id, 0, &self.vars, VarEvent::Domain, DemonPriority::Delayed);
        Ok(())
    }

    fn initial_propagate(&mut self, s: &mut Store) -> PropResult {
        let len_cell = self.active_len.ok_or(Conflict)?;
        let mut active = s.trail.get(len_cell) as usize;
        // Drop tuples that lost a support.
        let mut k = 0;
        while k < active {
            let t = self.order[k] as usize;
            if self.tuple_valid(s, t) {
                k += 1;
            } else {
                active -= 1;
                self.order.swap(k, active);
            }
        }
        s.trail.set(len_cell, active as i64);
        if active == 0 {
            return Err(Conflict);
        }
        // Restrict every variable to its supported values.
        for (j, &v) in self.vars.iter().enumerate() {
            let supported: HashSet<i64> = self.order[..active]
                .iter()
                .map(|&t| self.tuples[t as usize][j])
                .collect();
            let unsupported: Vec<i64> = s
                .iter_domain(v)
                .filter(|value| !supported.contains(value))
                .collect();
            for value in unsupported {
                s.remove_value(v, value)?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "table"
    }
}
