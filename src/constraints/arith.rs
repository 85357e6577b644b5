//! Linear relations and binary arithmetic relations.

use crate::expr::{self, CExpr};
use crate::queue::{DemonPriority, PropId, VarEvent};
use crate::store::Store;
use crate::util::{cap_add, cap_sub};
use crate::vars::VarId;
use crate::{Conflict, PropResult};

use super::{watch_all, Propagator};

/// `lo <= sum(coefs[i] * vars[i]) <= hi`, propagated by interval reasoning
/// over the scalar product.
pub(crate) struct Linear {
    vars: Vec<VarId>,
    scal: CExpr,
    lo: i64,
    hi: i64,
}

impl Linear {
    pub fn new(vars: Vec<VarId>, coefs: Vec<i64>, lo: i64, hi: i64) -> Self {
        let scal = CExpr::ScalProd { vars: vars.clone(), coefs };
        Self { vars, scal, lo, hi }
    }
}

impl Propagator for Linear {
    fn post(&mut self, s: &mut Store, id: PropId) -> PropResult {
        watch_all(s, id, 0, &self.vars, VarEvent::Range, DemonPriority::Normal);
        Ok(())
    }

    fn initial_propagate(&mut self, s: &mut Store) -> PropResult {
        let (l, h) = expr::bounds(&self.scal, s);
        if l > self.hi || h < self.lo {
            return Err(Conflict);
        }
        expr::set_min(&self.scal, s, self.lo)?;
        expr::set_max(&self.scal, s, self.hi)
    }

    fn name(&self) -> &'static str {
        "linear"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RelKind {
    /// `a + offset <= b`
    Le,
    /// `a + offset == b`
    Eq,
    /// `a + offset != b`
    Ne,
}

/// Binary relation between two variables with a constant offset.
pub(crate) struct BinaryRel {
    a: VarId,
    b: VarId,
    offset: i64,
    kind: RelKind,
}

impl BinaryRel {
    pub fn new(a: VarId, b: VarId, offset: i64, kind: RelKind) -> Self {
        Self { a, b, offset, kind }
    }
}

impl Propagator for BinaryRel {
    fn post(&mut self, s: &mut Store, id: PropId) -> PropResult {
        let event = match self.kind {
            RelKind::Ne => VarEvent::Bound,
            _ => VarEvent::Range,
        };
        watch_all(s, id, 0, &[self.a, self.b], event, DemonPriority::Normal);
        Ok(())
    }

    fn initial_propagate(&mut self, s: &mut Store) -> PropResult {
        let (a, b, c) = (self.a, self.b, self.offset);
        match self.kind {
            RelKind::Le => {
                s.set_max(a, cap_sub(s.max(b), c))?;
                s.set_min(b, cap_add(s.min(a), c))
            }
            RelKind::Eq => {
                s.set_range(a, cap_sub(s.min(b), c), cap_sub(s.max(b), c))?;
                s.set_range(b, cap_add(s.min(a), c), cap_add(s.max(a), c))
            }
            RelKind::Ne => {
                if let Some(va) = s.assigned(a) {
                    s.remove_value(b, cap_add(va, c))?;
                }
                if let Some(vb) = s.assigned(b) {
                    s.remove_value(a, cap_sub(vb, c))?;
                }
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        match self.kind {
            RelKind::Le => "le",
            RelKind::Eq => "eq",
            RelKind::Ne => "ne",
        }
    }
}
