//! Boolean connectives and reification.

use crate::queue::{DemonPriority, PropId, VarEvent};
use crate::store::Store;
use crate::vars::{Lit, VarId};
use crate::{Conflict, PropResult};

use super::{watch_all, Propagator};

/// At least one literal is true.
pub(crate) struct BoolOr {
    lits: Vec<Lit>,
}

impl BoolOr {
    pub fn new(lits: Vec<Lit>) -> Self {
        Self { lits }
    }
}

impl Propagator for BoolOr {
    fn post(&mut self, s: &mut Store, id: PropId) -> PropResult {
        let vars: Vec<VarId> = self.lits.iter().map(|l| l.var()).collect();
        watch_all(s, id, 0, &vars, VarEvent::Bound, DemonPriority::Normal);
        Ok(())
    }

    fn initial_propagate(&mut self, s: &mut Store) -> PropResult {
        let mut unassigned = None;
        let mut open = 0usize;
        for &l in &self.lits {
            match s.lit_value(l) {
                Some(true) => return Ok(()),
                Some(false) => {}
                None => {
                    open += 1;
                    unassigned = Some(l);
                }
            }
        }
        match (open, unassigned) {
            (0, _) => Err(Conflict),
            (1, Some(l)) => s.assign_lit(l),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "bool_or"
    }
}

/// Symmetry clause: while every guard variable holds its guard value, the
/// forbidden value is excluded from the target variable.
pub(crate) struct SymClause {
    guards: Vec<(VarId, i64)>,
    forbidden: (VarId, i64),
}

impl SymClause {
    pub fn new(guards: Vec<(VarId, i64)>, forbidden: (VarId, i64)) -> Self {
        Self { guards, forbidden }
    }
}

impl Propagator for SymClause {
    fn post(&mut self, s: &mut Store, id: PropId) -> PropResult {
        let vars: Vec<VarId> = self.guards.iter().map(|&(v, _)| v).collect();
        watch_all(s, id, 0, &vars, VarEvent::Bound, DemonPriority::Normal);
        Ok(())
    }

    fn initial_propagate(&mut self, s: &mut Store) -> PropResult {
        let all_hold = self
            .guards
            .iter()
            .all(|&(v, value)| s.assigned(v) == Some(value));
        if all_hold {
            let (v, value) = self.forbidden;
            s.remove_value(v, value)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "symmetry_clause"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpKind {
    EqCst,
    NeCst,
    GeCst,
    LeCst,
}

/// `b <=> (x ~ c)` for a comparison against a constant.
pub(crate) struct ReifCmpCst {
    b: VarId,
    x: VarId,
    c: i64,
    kind: CmpKind,
}

impl ReifCmpCst {
    pub fn new(b: VarId, x: VarId, c: i64, kind: CmpKind) -> Self {
        Self { b, x, c, kind }
    }

    /// Entailment status of `x ~ c`: `Some(true)` when it must hold,
    /// `Some(false)` when it cannot.
    fn status(&self, s: &Store) -> Option<bool> {
        let (min, max) = (s.min(self.x), s.max(self.x));
        match self.kind {
            CmpKind::EqCst => {
                if !s.contains(self.x, self.c) {
                    Some(false)
                } else if min == max {
                    Some(true)
                } else {
                    None
                }
            }
            CmpKind::NeCst => {
                if !s.contains(self.x, self.c) {
                    Some(true)
                } else if min == max {
                    Some(false)
                } else {
                    None
                }
            }
            CmpKind::GeCst => {
                if min >= self.c {
                    Some(true)
                } else if max < self.c {
                    Some(false)
                } else {
                    None
                }
            }
            CmpKind::LeCst => {
                if max <= self.c {
                    Some(true)
                } else if min > self.c {
                    Some(false)
                } else {
                    None
                }
            }
        }
    }

    fn enforce(&self, s: &mut Store, truth: bool) -> PropResult {
        let (x, c) = (self.x, self.c);
        let positive = match self.kind {
            CmpKind::EqCst => truth,
            CmpKind::NeCst => !truth,
            CmpKind::GeCst => return if truth { s.set_min(x, c) } else { s.set_max(x, c - 1) },
            CmpKind::LeCst => return if truth { s.set_max(x, c) } else { s.set_min(x, c + 1) },
        };
        if positive { s.set_value(x, c) } else { s.remove_value(x, c) }
    }
}

impl Propagator for ReifCmpCst {
    fn post(&mut self, s: &mut Store, id: PropId) -> PropResult {
        let event = match self.kind {
            CmpKind::EqCst | CmpKind::NeCst => VarEvent::Domain,
            _ => VarEvent::Range,
        };
        watch_all(s, id, 0, &[self.x], event, DemonPriority::Normal);
        watch_all(s, id, 0, &[self.b], VarEvent::Bound, DemonPriority::Normal);
        Ok(())
    }

    fn initial_propagate(&mut self, s: &mut Store) -> PropResult {
        match s.assigned(self.b) {
            Some(v) => self.enforce(s, v == 1),
            None => match self.status(s) {
                Some(truth) => s.set_value(self.b, truth as i64),
                None => Ok(()),
            },
        }
    }

    fn name(&self) -> &'static str {
        "reif_cmp_cst"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum VarCmpKind {
    EqVar,
    GeVar,
}

/// `b <=> (x ~ y)` for a comparison between two variables.
pub(crate) struct ReifCmpVar {
    b: VarId,
    x: VarId,
    y: VarId,
    kind: VarCmpKind,
}

impl ReifCmpVar {
    pub fn new(b: VarId, x: VarId, y: VarId, kind: VarCmpKind) -> Self {
        Self { b, x, y, kind }
    }
}

impl Propagator for ReifCmpVar {
    fn post(&mut self, s: &mut Store, id: PropId) -> PropResult {
        watch_all(s, id, 0, &[self.x, self.y], VarEvent::Range, DemonPriority::Normal);
        watch_all(s, id, 0, &[self.b], VarEvent::Bound, DemonPriority::Normal);
        Ok(())
    }

    fn initial_propagate(&mut self, s: &mut Store) -> PropResult {
        let (x, y) = (self.x, self.y);
        match self.kind {
            VarCmpKind::EqVar => match s.assigned(self.b) {
                Some(1) => {
                    s.set_range(x, s.min(y), s.max(y))?;
                    s.set_range(y, s.min(x), s.max(x))
                }
                Some(_) => {
                    if let Some(vx) = s.assigned(x) {
                        s.remove_value(y, vx)?;
                    }
                    if let Some(vy) = s.assigned(y) {
                        s.remove_value(x, vy)?;
                    }
                    Ok(())
                }
                None => {
                    if s.max(x) < s.min(y) || s.max(y) < s.min(x) {
                        s.set_value(self.b, 0)
                    } else if let (Some(vx), Some(vy)) = (s.assigned(x), s.assigned(y)) {
                        s.set_value(self.b, (vx == vy) as i64)
                    } else {
                        Ok(())
                    }
                }
            },
            VarCmpKind::GeVar => match s.assigned(self.b) {
                Some(1) => {
                    // x >= y
                    s.set_min(x, s.min(y))?;
                    s.set_max(y, s.max(x))
                }
                Some(_) => {
                    // x < y
                    s.set_max(x, s.max(y) - 1)?;
                    s.set_min(y, s.min(x) + 1)
                }
                None => {
                    if s.min(x) >= s.max(y) {
                        s.set_value(self.b, 1)
                    } else if s.max(x) < s.min(y) {
                        s.set_value(self.b, 0)
                    } else {
                        Ok(())
                    }
                }
            },
        }
    }

    fn name(&self) -> &'static str {
        "reif_cmp_var"
    }
}
