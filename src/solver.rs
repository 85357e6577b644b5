//! The solver façade.
//!
//! Owns every model object: the reversible store, posted propagators, the
//! expression arena with its canonicalization cache, the constant pool, the
//! RNG and the search bookkeeping. Every component receives the solver (or
//! its store) explicitly; there is no global state.

use std::collections::HashMap;

use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::constraints::alldiff::AllDifferent;
use crate::constraints::arith::{BinaryRel, Linear, RelKind};
use crate::constraints::element::ElementCt;
use crate::constraints::logic::{BoolOr, CmpKind, ReifCmpCst, ReifCmpVar, VarCmpKind};
use crate::constraints::scheduling::{self, Cumulative, Task};
use crate::constraints::table::TableCt;
use crate::constraints::{ExprLink, Propagator};
use crate::expr::{self, CExpr, ExprArena, ExprId, PiecewiseLinearFn};
use crate::precedence::Precedence;
use crate::queue::PropId;
use crate::search::phase::{Phase, ValueStrategy, VarStrategy};
use crate::store::Store;
use crate::vars::{Lit, VarId};
use crate::{Conflict, ModelError, PropResult, SolverParameters, Status};

/// A constraint ready to be posted with [`Solver::add_constraint`].
pub struct Constraint(pub(crate) Box<dyn Propagator>);

/// Search counters, readable at any time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchStats {
    pub branches: u64,
    pub failures: u64,
    pub solutions: u64,
    pub propagation_passes: u64,
    pub demon_runs: u64,
    pub max_depth: u32,
}

#[derive(Debug, Clone, Copy)]
struct SolverFrame {
    props_len: usize,
    exprs_len: usize,
}

pub struct Solver {
    pub(crate) store: Store,
    pub(crate) props: Vec<Box<dyn Propagator>>,
    pub(crate) exprs: ExprArena,
    expr_cache: HashMap<CExpr, ExprId>,
    var_cache: HashMap<ExprId, VarId>,
    const_pool: HashMap<i64, VarId>,
    pub(crate) params: SolverParameters,
    pub(crate) rng: SmallRng,
    /// False once the model is proven infeasible at the root; no part of the
    /// search may be used afterwards.
    pub(crate) ok: bool,
    pub(crate) stats: SearchStats,
    pub(crate) status: Status,
    stop: Option<Status>,
    restart_requested: bool,
    frames: Vec<SolverFrame>,
    precedence: Option<PropId>,
}

impl Solver {
    pub fn new(params: SolverParameters) -> Self {
        let rng = SmallRng::seed_from_u64(params.seed);
        Self {
            store: Store::new(),
            props: Vec::new(),
            exprs: ExprArena::default(),
            expr_cache: HashMap::new(),
            var_cache: HashMap::new(),
            const_pool: HashMap::new(),
            params,
            rng,
            ok: true,
            stats: SearchStats::default(),
            status: Status::Idle,
            stop: None,
            restart_requested: false,
            frames: Vec::new(),
            precedence: None,
        }
    }

    // ----- variable factories -----

    pub fn new_int_var(&mut self, min: i64, max: i64, name: &str) -> VarId {
        debug_assert!(min <= max);
        self.store.new_var_range(min, max, name)
    }

    pub fn new_int_var_from_values(&mut self, values: &[i64], name: &str) -> Result<VarId, ModelError> {
        let mut sorted = values.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.is_empty() {
            return Err(ModelError::EmptyDomain);
        }
        Ok(self.store.new_var_values(&sorted, name))
    }

    pub fn new_bool_var(&mut self, name: &str) -> VarId {
        self.store.new_bool(name)
    }

    pub fn new_int_const(&mut self, value: i64, name: &str) -> VarId {
        if self.params.share_int_consts && self.depth() == 0 {
            if let Some(&v) = self.const_pool.get(&value) {
                return v;
            }
            let v = self.store.new_const(value, name);
            self.const_pool.insert(value, v);
            v
        } else {
            self.store.new_const(value, name)
        }
    }

    /// Creates an optional variable: when `presence` is false, the variable
    /// is absent and every constraint on it is vacuous.
    pub fn new_optional_int_var(&mut self, min: i64, max: i64, presence: Lit, name: &str) -> VarId {
        let v = self.new_int_var(min, max, name);
        self.store.set_presence(v, presence);
        v
    }

    // ----- reads and writes (delegated to the store) -----

    #[inline]
    pub fn min(&self, v: VarId) -> i64 {
        self.store.min(v)
    }

    #[inline]
    pub fn max(&self, v: VarId) -> i64 {
        self.store.max(v)
    }

    #[inline]
    pub fn size(&self, v: VarId) -> u64 {
        self.store.size(v)
    }

    #[inline]
    pub fn contains(&self, v: VarId, value: i64) -> bool {
        self.store.contains(v, value)
    }

    #[inline]
    pub fn bound(&self, v: VarId) -> bool {
        self.store.bound(v)
    }

    #[inline]
    pub fn value(&self, v: VarId) -> i64 {
        self.store.value(v)
    }

    #[inline]
    pub fn assigned(&self, v: VarId) -> Option<i64> {
        self.store.assigned(v)
    }

    pub fn old_min(&self, v: VarId) -> i64 {
        self.store.old_min(v)
    }

    pub fn old_max(&self, v: VarId) -> i64 {
        self.store.old_max(v)
    }

    pub fn holes(&self, v: VarId) -> &[i64] {
        self.store.holes(v)
    }

    pub fn set_min(&mut self, v: VarId, value: i64) -> PropResult {
        self.store.set_min(v, value)
    }

    pub fn set_max(&mut self, v: VarId, value: i64) -> PropResult {
        self.store.set_max(v, value)
    }

    pub fn set_range(&mut self, v: VarId, lo: i64, hi: i64) -> PropResult {
        self.store.set_range(v, lo, hi)
    }

    pub fn set_value(&mut self, v: VarId, value: i64) -> PropResult {
        self.store.set_value(v, value)
    }

    pub fn remove_value(&mut self, v: VarId, value: i64) -> PropResult {
        self.store.remove_value(v, value)
    }

    pub fn remove_interval(&mut self, v: VarId, lo: i64, hi: i64) -> PropResult {
        self.store.remove_interval(v, lo, hi)
    }

    pub fn lit_value(&self, l: Lit) -> Option<bool> {
        self.store.lit_value(l)
    }

    pub fn assign_lit(&mut self, l: Lit) -> PropResult {
        self.store.assign_lit(l)
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn num_vars(&self) -> usize {
        self.store.num_vars()
    }

    // ----- expression factories -----

    fn intern(&mut self, node: CExpr) -> ExprId {
        let cache_enabled = !self.params.disable_expression_optimization && self.depth() == 0;
        if cache_enabled {
            if let Some(&id) = self.expr_cache.get(&node) {
                return id;
            }
        }
        let id = self.exprs.push(node.clone());
        if cache_enabled {
            self.expr_cache.insert(node, id);
        }
        id
    }

    fn node(&self, e: ExprId) -> CExpr {
        self.exprs.get(e).clone()
    }

    pub fn expr_var(&mut self, v: VarId) -> ExprId {
        self.intern(CExpr::Var(v))
    }

    pub fn expr_const(&mut self, c: i64) -> ExprId {
        self.intern(CExpr::Const(c))
    }

    pub fn sum(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let node = CExpr::Sum(Box::new(self.node(a)), Box::new(self.node(b)));
        self.intern(node)
    }

    pub fn sum_vars(&mut self, vars: &[VarId]) -> ExprId {
        let node = CExpr::ScalProd {
            vars: vars.to_vec(),
            coefs: vec![1; vars.len()],
        };
        self.intern(node)
    }

    pub fn difference(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let neg = CExpr::Opposite(Box::new(self.node(b)));
        let node = CExpr::Sum(Box::new(self.node(a)), Box::new(neg));
        self.intern(node)
    }

    pub fn opposite(&mut self, a: ExprId) -> ExprId {
        let node = CExpr::Opposite(Box::new(self.node(a)));
        self.intern(node)
    }

    pub fn scal_prod(&mut self, vars: &[VarId], coefs: &[i64]) -> Result<ExprId, ModelError> {
        if vars.len() != coefs.len() {
            return Err(ModelError::ArityMismatch { left: vars.len(), right: coefs.len() });
        }
        let node = CExpr::ScalProd { vars: vars.to_vec(), coefs: coefs.to_vec() };
        Ok(self.intern(node))
    }

    pub fn abs(&mut self, a: ExprId) -> ExprId {
        let node = CExpr::Abs(Box::new(self.node(a)));
        self.intern(node)
    }

    pub fn min_expr(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let node = CExpr::Min(Box::new(self.node(a)), Box::new(self.node(b)));
        self.intern(node)
    }

    pub fn max_expr(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let node = CExpr::Max(Box::new(self.node(a)), Box::new(self.node(b)));
        self.intern(node)
    }

    pub fn prod(&mut self, a: ExprId, b: ExprId) -> ExprId {
        let node = CExpr::Prod(Box::new(self.node(a)), Box::new(self.node(b)));
        self.intern(node)
    }

    /// Integer division truncated toward zero. The divisor must be non-zero.
    pub fn div(&mut self, num: ExprId, den: i64) -> Result<ExprId, ModelError> {
        if den == 0 {
            return Err(ModelError::DivisionByZero);
        }
        let node = if den > 0 {
            CExpr::Div { num: Box::new(self.node(num)), den }
        } else {
            CExpr::Opposite(Box::new(CExpr::Div { num: Box::new(self.node(num)), den: -den }))
        };
        Ok(self.intern(node))
    }

    /// Modulo; the sign of the result follows the dividend.
    pub fn modulo(&mut self, arg: ExprId, modulus: i64) -> Result<ExprId, ModelError> {
        if modulus == 0 {
            return Err(ModelError::DivisionByZero);
        }
        let node = CExpr::Mod { arg: Box::new(self.node(arg)), modulus: modulus.abs() };
        Ok(self.intern(node))
    }

    pub fn square(&mut self, a: ExprId) -> ExprId {
        let node = CExpr::Square(Box::new(self.node(a)));
        self.intern(node)
    }

    pub fn pow(&mut self, a: ExprId, exp: u32) -> ExprId {
        let node = CExpr::Pow(Box::new(self.node(a)), exp);
        self.intern(node)
    }

    pub fn piecewise_linear(&mut self, a: ExprId, f: PiecewiseLinearFn) -> ExprId {
        let node = CExpr::PiecewiseLinear { arg: Box::new(self.node(a)), f };
        self.intern(node)
    }

    pub fn convex_piecewise(
        &mut self,
        a: ExprId,
        early_cost: i64,
        early_date: i64,
        late_date: i64,
        late_cost: i64,
    ) -> ExprId {
        let node = CExpr::ConvexPiecewise {
            arg: Box::new(self.node(a)),
            early_cost,
            early_date,
            late_date,
            late_cost,
        };
        self.intern(node)
    }

    pub fn semi_continuous(&mut self, a: ExprId, fixed_charge: i64, step: i64) -> ExprId {
        let node = CExpr::SemiContinuous { arg: Box::new(self.node(a)), fixed_charge, step };
        self.intern(node)
    }

    pub fn element_expr(&mut self, index: VarId, table: &[i64]) -> ExprId {
        let node = CExpr::Element { index, table: table.to_vec() };
        self.intern(node)
    }

    pub fn conditional(&mut self, cond: Lit, then: ExprId, otherwise: i64) -> ExprId {
        let node = CExpr::Conditional { cond, then: Box::new(self.node(then)), otherwise };
        self.intern(node)
    }

    pub fn expr_bounds(&self, e: ExprId) -> (i64, i64) {
        expr::bounds(self.exprs.get(e), &self.store)
    }

    pub fn expr_min(&self, e: ExprId) -> i64 {
        self.expr_bounds(e).0
    }

    pub fn expr_max(&self, e: ExprId) -> i64 {
        self.expr_bounds(e).1
    }

    pub fn expr_set_min(&mut self, e: ExprId, v: i64) -> PropResult {
        let node = self.exprs.get(e).clone();
        expr::set_min(&node, &mut self.store, v)
    }

    pub fn expr_set_max(&mut self, e: ExprId, v: i64) -> PropResult {
        let node = self.exprs.get(e).clone();
        expr::set_max(&node, &mut self.store, v)
    }

    pub fn expr_set_range(&mut self, e: ExprId, lo: i64, hi: i64) -> PropResult {
        self.expr_set_min(e, lo)?;
        self.expr_set_max(e, hi)
    }

    pub fn expr_set_value(&mut self, e: ExprId, v: i64) -> PropResult {
        self.expr_set_range(e, v, v)
    }

    /// Materializes an expression into a domain variable, lazily posting the
    /// linking constraint that keeps the two equal.
    pub fn var_of(&mut self, e: ExprId) -> Result<VarId, Conflict> {
        if let CExpr::Var(v) = self.exprs.get(e) {
            return Ok(*v);
        }
        let cache_enabled = !self.params.disable_expression_optimization && self.depth() == 0;
        if cache_enabled {
            if let Some(&v) = self.var_cache.get(&e) {
                return Ok(v);
            }
        }
        let node = self.node(e);
        let (lo, hi) = expr::bounds(&node, &self.store);
        if lo > hi {
            return Err(Conflict);
        }
        let name = format!("_e{}", e.0);
        let v = self.store.new_var_range(lo, hi, &name);
        self.add_constraint(Constraint(Box::new(ExprLink::new(node, v))))?;
        if cache_enabled {
            self.var_cache.insert(e, v);
        }
        Ok(v)
    }

    // ----- constraint factories -----

    pub fn linear_between(
        &mut self,
        vars: &[VarId],
        coefs: &[i64],
        lo: i64,
        hi: i64,
    ) -> Result<Constraint, ModelError> {
        if vars.len() != coefs.len() {
            return Err(ModelError::ArityMismatch { left: vars.len(), right: coefs.len() });
        }
        if vars.is_empty() {
            return Err(ModelError::EmptyVariableList);
        }
        Ok(Constraint(Box::new(Linear::new(vars.to_vec(), coefs.to_vec(), lo, hi))))
    }

    pub fn linear_eq(&mut self, vars: &[VarId], coefs: &[i64], rhs: i64) -> Result<Constraint, ModelError> {
        self.linear_between(vars, coefs, rhs, rhs)
    }

    pub fn linear_le(&mut self, vars: &[VarId], coefs: &[i64], rhs: i64) -> Result<Constraint, ModelError> {
        self.linear_between(vars, coefs, i64::MIN, rhs)
    }

    pub fn linear_ge(&mut self, vars: &[VarId], coefs: &[i64], rhs: i64) -> Result<Constraint, ModelError> {
        self.linear_between(vars, coefs, rhs, i64::MAX)
    }

    pub fn eq(&mut self, a: VarId, b: VarId) -> Constraint {
        Constraint(Box::new(BinaryRel::new(a, b, 0, RelKind::Eq)))
    }

    pub fn ne(&mut self, a: VarId, b: VarId) -> Constraint {
        Constraint(Box::new(BinaryRel::new(a, b, 0, RelKind::Ne)))
    }

    pub fn le(&mut self, a: VarId, b: VarId) -> Constraint {
        Constraint(Box::new(BinaryRel::new(a, b, 0, RelKind::Le)))
    }

    pub fn lt(&mut self, a: VarId, b: VarId) -> Constraint {
        Constraint(Box::new(BinaryRel::new(a, b, 1, RelKind::Le)))
    }

    pub fn ge(&mut self, a: VarId, b: VarId) -> Constraint {
        Constraint(Box::new(BinaryRel::new(b, a, 0, RelKind::Le)))
    }

    pub fn gt(&mut self, a: VarId, b: VarId) -> Constraint {
        Constraint(Box::new(BinaryRel::new(b, a, 1, RelKind::Le)))
    }

    /// `all_different(vars)`; `stronger` adds Hall-interval bounds
    /// filtering behind the value-removal demons.
    pub fn all_different(&mut self, vars: &[VarId], stronger: bool) -> Constraint {
        Constraint(Box::new(AllDifferent::new(vars.to_vec(), stronger)))
    }

    pub fn element(&mut self, index: VarId, table: &[i64], result: VarId) -> Constraint {
        Constraint(Box::new(ElementCt::new(index, table.to_vec(), result)))
    }

    pub fn table_constraint(
        &mut self,
        vars: &[VarId],
        tuples: Vec<Vec<i64>>,
    ) -> Result<Constraint, ModelError> {
        if vars.is_empty() {
            return Err(ModelError::EmptyVariableList);
        }
        for t in &tuples {
            if t.len() != vars.len() {
                return Err(ModelError::ArityMismatch { left: vars.len(), right: t.len() });
            }
        }
        Ok(Constraint(Box::new(TableCt::new(vars.to_vec(), tuples))))
    }

    pub fn cumulative(
        &mut self,
        starts: &[VarId],
        durations: &[i64],
        demands: &[i64],
        capacity: i64,
    ) -> Result<Constraint, ModelError> {
        if starts.len() != durations.len() {
            return Err(ModelError::ArityMismatch { left: starts.len(), right: durations.len() });
        }
        if starts.len() != demands.len() {
            return Err(ModelError::ArityMismatch { left: starts.len(), right: demands.len() });
        }
        let tasks = starts
            .iter()
            .zip(durations)
            .zip(demands)
            .map(|((&start, &duration), &demand)| Task { start, duration, demand })
            .collect();
        Ok(Constraint(Box::new(Cumulative::new(tasks, capacity))))
    }

    pub fn no_overlap(&mut self, starts: &[VarId], durations: &[i64]) -> Result<Constraint, ModelError> {
        if starts.len() != durations.len() {
            return Err(ModelError::ArityMismatch { left: starts.len(), right: durations.len() });
        }
        Ok(Constraint(Box::new(scheduling::no_overlap(starts.to_vec(), durations.to_vec()))))
    }

    pub fn bool_or(&mut self, lits: &[Lit]) -> Constraint {
        Constraint(Box::new(BoolOr::new(lits.to_vec())))
    }

    /// `a -> b` as a clause.
    pub fn implication(&mut self, a: Lit, b: Lit) -> Constraint {
        self.bool_or(&[!a, b])
    }

    // ----- boolean reification -----

    fn reified_cst(&mut self, x: VarId, c: i64, kind: CmpKind) -> Result<VarId, Conflict> {
        let b = self.new_bool_var("_reif");
        self.add_constraint(Constraint(Box::new(ReifCmpCst::new(b, x, c, kind))))?;
        Ok(b)
    }

    pub fn is_equal_cst(&mut self, x: VarId, c: i64) -> Result<VarId, Conflict> {
        self.reified_cst(x, c, CmpKind::EqCst)
    }

    pub fn is_different_cst(&mut self, x: VarId, c: i64) -> Result<VarId, Conflict> {
        self.reified_cst(x, c, CmpKind::NeCst)
    }

    pub fn is_greater_or_equal_cst(&mut self, x: VarId, c: i64) -> Result<VarId, Conflict> {
        self.reified_cst(x, c, CmpKind::GeCst)
    }

    pub fn is_less_or_equal_cst(&mut self, x: VarId, c: i64) -> Result<VarId, Conflict> {
        self.reified_cst(x, c, CmpKind::LeCst)
    }

    pub fn is_equal(&mut self, x: VarId, y: VarId) -> Result<VarId, Conflict> {
        let b = self.new_bool_var("_reif");
        self.add_constraint(Constraint(Box::new(ReifCmpVar::new(b, x, y, VarCmpKind::EqVar))))?;
        Ok(b)
    }

    pub fn is_greater_or_equal(&mut self, x: VarId, y: VarId) -> Result<VarId, Conflict> {
        let b = self.new_bool_var("_reif");
        self.add_constraint(Constraint(Box::new(ReifCmpVar::new(b, x, y, VarCmpKind::GeVar))))?;
        Ok(b)
    }

    // ----- precedence -----

    fn ensure_precedence(&mut self) -> Result<PropId, Conflict> {
        if let Some(id) = self.precedence {
            return Ok(id);
        }
        let id = PropId(self.props.len() as u32);
        let mut prop: Box<dyn Propagator> = Box::new(Precedence::default());
        prop.post(&mut self.store, id)?;
        self.props.push(prop);
        self.precedence = Some(id);
        Ok(id)
    }

    fn add_precedence_arc(
        &mut self,
        tail: VarId,
        head: VarId,
        offset: i64,
        offset_var: Option<VarId>,
        enabler: Option<Lit>,
    ) -> PropResult {
        if !self.ok {
            return Err(Conflict);
        }
        debug_assert_eq!(self.depth(), 0, "precedence arcs are model-time objects");
        let id = self.ensure_precedence()?;
        {
            let store = &mut self.store;
            let any = self.props[id.0 as usize].as_any_mut().ok_or(Conflict)?;
            let prec = any.downcast_mut::<Precedence>().ok_or(Conflict)?;
            prec.add_arc(store, tail, head, offset, offset_var, enabler);
        }
        let r: PropResult = {
            let first = self.props[id.0 as usize].initial_propagate(&mut self.store);
            match first {
                Ok(()) => self.propagate(),
                Err(c) => Err(c),
            }
        };
        if r.is_err() {
            self.store.clear_queue();
            if self.depth() == 0 {
                self.ok = false;
            }
        }
        r
    }

    /// Posts `tail + offset <= head`.
    pub fn add_precedence(&mut self, tail: VarId, head: VarId, offset: i64) -> PropResult {
        self.add_precedence_arc(tail, head, offset, None, None)
    }

    /// Posts `tail + offset <= head`, active only while `enabler` is true.
    pub fn add_conditional_precedence(
        &mut self,
        tail: VarId,
        head: VarId,
        offset: i64,
        enabler: Lit,
    ) -> PropResult {
        self.add_precedence_arc(tail, head, offset, None, Some(enabler))
    }

    /// Posts `tail + offset + offset_var <= head`.
    pub fn add_precedence_with_offset_var(
        &mut self,
        tail: VarId,
        head: VarId,
        offset: i64,
        offset_var: VarId,
    ) -> PropResult {
        self.add_precedence_arc(tail, head, offset, Some(offset_var), None)
    }

    /// Builds a classical phase decision builder over `vars`.
    pub fn make_phase(
        &mut self,
        vars: Vec<VarId>,
        var_strategy: VarStrategy,
        value_strategy: ValueStrategy,
    ) -> Phase {
        Phase::new(vars, var_strategy, value_strategy)
    }

    // ----- posting and propagation -----

    /// Posts a constraint and runs its initial propagation to a fixed point.
    /// At the root, a contradiction marks the whole model infeasible.
    pub fn add_constraint(&mut self, c: Constraint) -> PropResult {
        if !self.ok {
            return Err(Conflict);
        }
        let id = PropId(self.props.len() as u32);
        self.props.push(c.0);
        let r: PropResult = {
            let mut step = self.props[id.0 as usize].post(&mut self.store, id);
            if step.is_ok() {
                step = self.props[id.0 as usize].initial_propagate(&mut self.store);
            }
            if step.is_ok() {
                step = self.propagate();
            }
            step
        };
        if r.is_err() {
            self.store.clear_queue();
            if self.depth() == 0 {
                self.ok = false;
            }
        }
        r
    }

    /// Runs demons until all FIFOs drain (fixed point) or a contradiction.
    pub fn propagate(&mut self) -> PropResult {
        self.store.pass += 1;
        self.stats.propagation_passes += 1;
        self.run_queue()
    }

    pub(crate) fn run_queue(&mut self) -> PropResult {
        while let Some(did) = self.store.queue.pop() {
            self.store.demons.set_queued(did, false);
            let entry = self.store.demons.entry(did);
            if self.store.trail.get(entry.inhibited) != 0 {
                continue;
            }
            self.stats.demon_runs += 1;
            let r = self.props[entry.prop.0 as usize].propagate(&mut self.store, entry.tag);
            if r.is_err() {
                self.store.clear_queue();
                return r;
            }
        }
        Ok(())
    }

    // ----- levels, stop and restart -----

    #[inline]
    pub fn depth(&self) -> u32 {
        self.store.level()
    }

    pub(crate) fn push_level(&mut self) {
        self.frames.push(SolverFrame {
            props_len: self.props.len(),
            exprs_len: self.exprs.len(),
        });
        self.store.push_level();
        self.stats.max_depth = self.stats.max_depth.max(self.depth());
    }

    pub(crate) fn pop_level(&mut self) {
        self.store.pop_level();
        if let Some(frame) = self.frames.pop() {
            self.props.truncate(frame.props_len);
            self.exprs.truncate(frame.exprs_len);
        }
    }

    /// Cooperative stop: the search unwinds at the next safe point.
    pub fn request_stop(&mut self, status: Status) {
        if self.stop.is_none() {
            self.stop = Some(status);
        }
    }

    pub fn stop_requested(&self) -> Option<Status> {
        self.stop
    }

    pub(crate) fn clear_stop(&mut self) {
        self.stop = None;
    }

    /// Requests a restart of the current search from its root.
    pub fn restart_current_search(&mut self) {
        self.restart_requested = true;
    }

    pub(crate) fn take_restart_request(&mut self) -> bool {
        std::mem::take(&mut self.restart_requested)
    }
}
