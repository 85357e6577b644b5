//! Constraints and their propagators.
//!
//! A constraint is a logical relation plus a `post` hook (attach demons to
//! the variables it watches) and an `initial_propagate` hook run when the
//! constraint is added. After posting, a constraint is immutable from the
//! outside; all its mutable state is trail-protected.

use crate::expr::{self, CExpr};
use crate::queue::{DemonPriority, PropId, VarEvent};
use crate::store::Store;
use crate::vars::VarId;
use crate::PropResult;

pub(crate) mod alldiff;
pub(crate) mod arith;
pub(crate) mod element;
pub(crate) mod logic;
pub(crate) mod scheduling;
pub(crate) mod table;

/// A propagator closure attached to variable events.
///
/// `tag` identifies which of the propagator's demons fired; propagators that
/// register a single demon ignore it.
pub(crate) trait Propagator {
    /// Attaches demons to the watched variables.
    fn post(&mut self, s: &mut Store, id: PropId) -> PropResult;

    /// First propagation, run when the constraint is added.
    fn initial_propagate(&mut self, s: &mut Store) -> PropResult;

    /// Reaction to one of the registered demons firing.
    fn propagate(&mut self, s: &mut Store, tag: u32) -> PropResult {
        let _ = tag;
        self.initial_propagate(s)
    }

    fn name(&self) -> &'static str;

    /// Escape hatch for propagators the solver keeps feeding after posting
    /// (the shared precedence graph).
    fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
        None
    }
}

/// Registers one demon for `prop` and attaches it to `event` on every
/// variable in `vars`.
pub(crate) fn watch_all(
    s: &mut Store,
    prop: PropId,
    tag: u32,
    vars: &[VarId],
    event: VarEvent,
    priority: DemonPriority,
) -> crate::queue::DemonId {
    let delayed = priority == DemonPriority::Delayed;
    let demon = s.register_demon(prop, tag, priority);
    for &v in vars {
        s.attach(v, event, demon, delayed);
    }
    demon
}

/// Links a materialized expression view to its storage variable: the
/// variable's domain always equals the expression's interval, in both
/// directions.
pub(crate) struct ExprLink {
    pub expr: CExpr,
    pub var: VarId,
    pub demon: Option<crate::queue::DemonId>,
}

impl ExprLink {
    pub fn new(expr: CExpr, var: VarId) -> Self {
        Self { expr, var, demon: None }
    }
}

impl Propagator for ExprLink {
    fn post(&mut self, s: &mut Store, id: PropId) -> PropResult {
        let mut support = Vec::new();
        expr::collect_vars(&self.expr, &mut support);
        support.push(self.var);
        support.sort_unstable();
        support.dedup();
        self.demon = Some(watch_all(s, id, 0, &support, VarEvent::Range, DemonPriority::Normal));
        Ok(())
    }

    fn initial_propagate(&mut self, s: &mut Store) -> PropResult {
        let (lo, hi) = expr::bounds(&self.expr, s);
        s.set_range(self.var, lo, hi)?;
        let (vlo, vhi) = (s.min(self.var), s.max(self.var));
        expr::set_range(&self.expr, s, vlo, vhi)?;
        // Once both sides are pinned the link is entailed; the demon sleeps
        // until backtracking un-pins them.
        let (lo, hi) = expr::bounds(&self.expr, s);
        if lo == hi && s.bound(self.var) {
            if let Some(d) = self.demon {
                s.inhibit(d);
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "expr_link"
    }
}
