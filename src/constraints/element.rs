//! The element constraint: `result == table[index]`.

use crate::queue::{DemonPriority, PropId, VarEvent};
use crate::store::Store;
use crate::vars::VarId;
use crate::{Conflict, PropResult};

use super::{watch_all, Propagator};

pub(crate) struct ElementCt {
    index: VarId,
    table: Vec<i64>,
    result: VarId,
}

impl ElementCt {
    pub fn new(index: VarId, table: Vec<i64>, result: VarId) -> Self {
        Self { index, table, result }
    }
}

impl Propagator for ElementCt {
    fn post(&mut self, s: &mut Store, id: PropId) -> PropResult {
        watch_all(s, id, 0, &[self.index, self.result], VarEvent::Domain, DemonPriority::Normal);
        Ok(())
    }

    fn initial_propagate(&mut self, s: &mut Store) -> PropResult {
        s.set_range(self.index, 0, self.table.len() as i64 - 1)?;
        // Keep only indices whose table entry intersects the result domain.
        let candidates: Vec<i64> = s.iter_domain(self.index).collect();
        let mut lo = i64::MAX;
        let mut hi = i64::MIN;
        for i in candidates {
            let y = self.table[i as usize];
            if s.contains(self.result, y) {
                lo = lo.min(y);
                hi = hi.max(y);
            } else {
                s.remove_value(self.index, i)?;
            }
        }
        if lo > hi {
            return Err(Conflict);
        }
        s.set_range(self.result, lo, hi)?;
        if let Some(i) = s.assigned(self.index) {
            s.set_value(self.result, self.table[i as usize])?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "element"
    }
}
