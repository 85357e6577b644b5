//! Lazy integer expressions.
//!
//! An expression is a composable view over variables: it maps the current
//! variable bounds to an `[lo, hi]` interval, and maps an outer set-bound
//! request back to set-bound calls on its inputs. All interval arithmetic is
//! saturating; a saturated bound is "no information" and never tightens
//! anything.
//!
//! Expressions are canonicalized in the solver's model cache and can be
//! materialized into a fresh domain variable through a linking constraint
//! (see `constraints::ExprLink`).

use crate::store::Store;
use crate::util::{
    cap_add, cap_opp, cap_pow, cap_prod, cap_sub, div_ceil, div_floor, root_ceil, root_floor,
    saturated, NO_MAX, NO_MIN,
};
use crate::vars::{Lit, VarId};
use crate::{Conflict, ModelError, PropResult};

/// Identifier of a canonicalized expression in the solver's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub(crate) u32);

/// A piecewise-linear function given by segment anchors.
///
/// Segment `i` starts at `x = segments[i].0` with value `segments[i].1` and
/// slope `segments[i].2`, and runs to the next anchor. The first segment also
/// extends leftward with its own slope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PiecewiseLinearFn {
    segments: Vec<(i64, i64, i64)>,
}

impl PiecewiseLinearFn {
    pub fn new(segments: Vec<(i64, i64, i64)>) -> Result<Self, ModelError> {
        if segments.is_empty() || segments.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err(ModelError::BadPiecewiseFunction);
        }
        Ok(Self { segments })
    }

    pub fn eval(&self, x: i64) -> i64 {
        let idx = match self.segments.binary_search_by_key(&x, |s| s.0) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };
        let (from, value, slope) = self.segments[idx];
        cap_add(value, cap_prod(slope, cap_sub(x, from)))
    }

    fn nondecreasing(&self) -> bool {
        self.segments.iter().all(|s| s.2 >= 0)
            && self
                .segments
                .windows(2)
                .all(|w| self.eval(w[1].0 - 1) <= w[1].1)
    }

    /// Candidate extremum points of the restriction to `[lo, hi]`.
    fn candidates(&self, lo: i64, hi: i64) -> Vec<i64> {
        let mut out = vec![lo, hi];
        for &(from, _, _) in &self.segments {
            if from > lo && from < hi {
                out.push(from);
            }
            if from - 1 > lo && from - 1 < hi {
                out.push(from - 1);
            }
        }
        out
    }

    /// Largest `x <= hi` with `f(x) <= v`, for nondecreasing `f`.
    fn invert_le(&self, v: i64, hi: i64) -> Option<i64> {
        let mut best: Option<i64> = None;
        for (i, &(from, value, slope)) in self.segments.iter().enumerate() {
            let seg_end = self
                .segments
                .get(i + 1)
                .map(|s| s.0 - 1)
                .unwrap_or(NO_MAX)
                .min(hi);
            let seg_start = if i == 0 { NO_MIN } else { from };
            if seg_start > seg_end {
                continue;
            }
            let x = if slope == 0 {
                if value <= v { Some(seg_end) } else { None }
            } else if slope > 0 {
                // value + slope * (x - from) <= v
                let span = cap_sub(v, value);
                if saturated(span) {
                    if span == NO_MAX { Some(seg_end) } else { None }
                } else {
                    let x = cap_add(from, div_floor(span, slope)).min(seg_end);
                    (x >= seg_start).then_some(x)
                }
            } else {
                None
            };
            if let Some(x) = x {
                if x >= seg_start {
                    best = Some(best.map_or(x, |b: i64| b.max(x)));
                }
            }
        }
        best
    }
}

/// Compiled expression tree. Children are inlined so a propagator can own a
/// self-contained copy and evaluate it against the store alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CExpr {
    Const(i64),
    Var(VarId),
    Sum(Box<CExpr>, Box<CExpr>),
    Opposite(Box<CExpr>),
    ScalProd { vars: Vec<VarId>, coefs: Vec<i64> },
    Abs(Box<CExpr>),
    Min(Box<CExpr>, Box<CExpr>),
    Max(Box<CExpr>, Box<CExpr>),
    Prod(Box<CExpr>, Box<CExpr>),
    /// `num / den` with `den > 0` (factories normalize the sign), truncated
    /// toward zero.
    Div { num: Box<CExpr>, den: i64 },
    /// `e % m` with `m > 0`; the sign follows the dividend.
    Mod { arg: Box<CExpr>, modulus: i64 },
    Square(Box<CExpr>),
    Pow(Box<CExpr>, u32),
    PiecewiseLinear { arg: Box<CExpr>, f: PiecewiseLinearFn },
    /// 0 inside `[early_date, late_date]`, linear penalties outside.
    ConvexPiecewise {
        arg: Box<CExpr>,
        early_cost: i64,
        early_date: i64,
        late_date: i64,
        late_cost: i64,
    },
    /// 0 for `arg <= 0`, otherwise `fixed_charge + step * arg`.
    SemiContinuous { arg: Box<CExpr>, fixed_charge: i64, step: i64 },
    /// `table[index]`.
    Element { index: VarId, table: Vec<i64> },
    /// `then` when `cond` holds, `otherwise` when it does not.
    Conditional { cond: Lit, then: Box<CExpr>, otherwise: i64 },
}

/// Arena of canonicalized expressions.
#[derive(Debug, Default)]
pub(crate) struct ExprArena {
    pub nodes: Vec<CExpr>,
}

impl ExprArena {
    pub fn push(&mut self, e: CExpr) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(e);
        id
    }

    pub fn get(&self, id: ExprId) -> &CExpr {
        &self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }
}

pub(crate) fn collect_vars(e: &CExpr, out: &mut Vec<VarId>) {
    match e {
        CExpr::Const(_) => {}
        CExpr::Var(v) => out.push(*v),
        CExpr::Sum(a, b) | CExpr::Min(a, b) | CExpr::Max(a, b) | CExpr::Prod(a, b) => {
            collect_vars(a, out);
            collect_vars(b, out);
        }
        CExpr::Opposite(a)
        | CExpr::Abs(a)
        | CExpr::Square(a)
        | CExpr::Pow(a, _)
        | CExpr::Div { num: a, .. }
        | CExpr::Mod { arg: a, .. }
        | CExpr::PiecewiseLinear { arg: a, .. }
        | CExpr::ConvexPiecewise { arg: a, .. }
        | CExpr::SemiContinuous { arg: a, .. } => collect_vars(a, out),
        CExpr::ScalProd { vars, .. } => out.extend(vars.iter().copied()),
        CExpr::Element { index, .. } => out.push(*index),
        CExpr::Conditional { cond, then, .. } => {
            out.push(cond.var());
            collect_vars(then, out);
        }
    }
}

/// Current `[lo, hi]` interval of the expression.
pub(crate) fn bounds(e: &CExpr, s: &Store) -> (i64, i64) {
    match e {
        CExpr::Const(c) => (*c, *c),
        CExpr::Var(v) => (s.min(*v), s.max(*v)),
        CExpr::Sum(a, b) => {
            let (al, ah) = bounds(a, s);
            let (bl, bh) = bounds(b, s);
            (cap_add(al, bl), cap_add(ah, bh))
        }
        CExpr::Opposite(a) => {
            let (al, ah) = bounds(a, s);
            (cap_opp(ah), cap_opp(al))
        }
        CExpr::ScalProd { vars, coefs } => {
            let (mut lo, mut hi) = (0i64, 0i64);
            for (&v, &c) in vars.iter().zip(coefs) {
                let (term_lo, term_hi) = term_bounds(s, v, c);
                lo = cap_add(lo, term_lo);
                hi = cap_add(hi, term_hi);
            }
            (lo, hi)
        }
        CExpr::Abs(a) => {
            let (al, ah) = bounds(a, s);
            if al >= 0 {
                (al, ah)
            } else if ah <= 0 {
                (cap_opp(ah), cap_opp(al))
            } else {
                (0, cap_opp(al).max(ah))
            }
        }
        CExpr::Min(a, b) => {
            let (al, ah) = bounds(a, s);
            let (bl, bh) = bounds(b, s);
            (al.min(bl), ah.min(bh))
        }
        CExpr::Max(a, b) => {
            let (al, ah) = bounds(a, s);
            let (bl, bh) = bounds(b, s);
            (al.max(bl), ah.max(bh))
        }
        CExpr::Prod(a, b) => {
            let (al, ah) = bounds(a, s);
            let (bl, bh) = bounds(b, s);
            let corners = [
                cap_prod(al, bl),
                cap_prod(al, bh),
                cap_prod(ah, bl),
                cap_prod(ah, bh),
            ];
            (
                corners.iter().copied().min().unwrap_or(NO_MIN),
                corners.iter().copied().max().unwrap_or(NO_MAX),
            )
        }
        CExpr::Div { num, den } => {
            let (nl, nh) = bounds(num, s);
            (crate::util::cap_div(nl, *den), crate::util::cap_div(nh, *den))
        }
        CExpr::Mod { arg, modulus } => {
            let (al, ah) = bounds(arg, s);
            let m = *modulus;
            if al >= 0 && ah < m {
                (al, ah)
            } else if al >= 0 {
                (0, (m - 1).min(ah))
            } else if ah <= 0 {
                ((1 - m).max(al), 0)
            } else {
                ((1 - m).max(al), (m - 1).min(ah))
            }
        }
        CExpr::Square(a) => pow_bounds(bounds(a, s), 2),
        CExpr::Pow(a, n) => pow_bounds(bounds(a, s), *n),
        CExpr::PiecewiseLinear { arg, f } => {
            let (al, ah) = bounds(arg, s);
            let mut lo = NO_MAX;
            let mut hi = NO_MIN;
            for x in f.candidates(al, ah) {
                let y = f.eval(x);
                lo = lo.min(y);
                hi = hi.max(y);
            }
            (lo, hi)
        }
        CExpr::ConvexPiecewise {
            arg,
            early_cost,
            early_date,
            late_date,
            late_cost,
        } => {
            let (al, ah) = bounds(arg, s);
            let f = |x: i64| convex_eval(x, *early_cost, *early_date, *late_date, *late_cost);
            let lo = if ah < *early_date {
                f(ah)
            } else if al > *late_date {
                f(al)
            } else {
                0
            };
            (lo, f(al).max(f(ah)))
        }
        CExpr::SemiContinuous { arg, fixed_charge, step } => {
            let (al, ah) = bounds(arg, s);
            let at = |x: i64| cap_add(*fixed_charge, cap_prod(*step, x));
            if ah <= 0 {
                (0, 0)
            } else if al > 0 {
                let (a, b) = (at(al), at(ah));
                (a.min(b), a.max(b))
            } else {
                let (a, b) = (at(1), at(ah));
                (0.min(a.min(b)), 0.max(a.max(b)))
            }
        }
        CExpr::Element { index, table } => {
            let mut lo = NO_MAX;
            let mut hi = NO_MIN;
            for i in s.iter_domain(*index) {
                if i >= 0 && (i as usize) < table.len() {
                    let y = table[i as usize];
                    lo = lo.min(y);
                    hi = hi.max(y);
                }
            }
            if lo > hi { (NO_MIN, NO_MAX) } else { (lo, hi) }
        }
        CExpr::Conditional { cond, then, otherwise } => match s.lit_value(*cond) {
            Some(true) => bounds(then, s),
            Some(false) => (*otherwise, *otherwise),
            None => {
                let (tl, th) = bounds(then, s);
                (tl.min(*otherwise), th.max(*otherwise))
            }
        },
    }
}

fn term_bounds(s: &Store, v: VarId, c: i64) -> (i64, i64) {
    if c >= 0 {
        (cap_prod(c, s.min(v)), cap_prod(c, s.max(v)))
    } else {
        (cap_prod(c, s.max(v)), cap_prod(c, s.min(v)))
    }
}

fn pow_bounds((al, ah): (i64, i64), n: u32) -> (i64, i64) {
    if n % 2 == 1 {
        (cap_pow(al, n), cap_pow(ah, n))
    } else if al >= 0 {
        (cap_pow(al, n), cap_pow(ah, n))
    } else if ah <= 0 {
        (cap_pow(ah, n), cap_pow(al, n))
    } else {
        (0, cap_pow(al, n).max(cap_pow(ah, n)))
    }
}

fn convex_eval(x: i64, early_cost: i64, early_date: i64, late_date: i64, late_cost: i64) -> i64 {
    if x < early_date {
        cap_prod(early_cost, cap_sub(early_date, x))
    } else if x > late_date {
        cap_prod(late_cost, cap_sub(x, late_date))
    } else {
        0
    }
}

/// Pushes `e >= v` down to set-bound calls on the inputs.
pub(crate) fn set_min(e: &CExpr, s: &mut Store, v: i64) -> PropResult {
    if saturated(v) && v == NO_MIN {
        return Ok(());
    }
    match e {
        CExpr::Const(c) => {
            if *c >= v { Ok(()) } else { Err(Conflict) }
        }
        CExpr::Var(x) => s.set_min(*x, v),
        CExpr::Sum(a, b) => {
            let (_, ah) = bounds(a, s);
            let (_, bh) = bounds(b, s);
            set_min(a, s, cap_sub(v, bh))?;
            set_min(b, s, cap_sub(v, ah))
        }
        CExpr::Opposite(a) => set_max(a, s, cap_opp(v)),
        CExpr::ScalProd { vars, coefs } => {
            let (_, total_hi) = bounds(e, s);
            if saturated(total_hi) {
                return Ok(());
            }
            if total_hi < v {
                return Err(Conflict);
            }
            for (&x, &c) in vars.iter().zip(coefs) {
                if c == 0 {
                    continue;
                }
                let (_, term_hi) = term_bounds(s, x, c);
                let others_hi = cap_sub(total_hi, term_hi);
                let needed = cap_sub(v, others_hi);
                if saturated(needed) {
                    continue;
                }
                if c > 0 {
                    s.set_min(x, div_ceil(needed, c))?;
                } else {
                    s.set_max(x, div_floor(cap_opp(needed), -c))?;
                }
            }
            Ok(())
        }
        CExpr::Abs(a) => {
            if v <= 0 {
                return Ok(());
            }
            let (al, ah) = bounds(a, s);
            if al > cap_opp(v) {
                set_min(a, s, v)
            } else if ah < v {
                set_max(a, s, cap_opp(v))
            } else {
                Ok(())
            }
        }
        CExpr::Min(a, b) => {
            set_min(a, s, v)?;
            set_min(b, s, v)
        }
        CExpr::Max(a, b) => {
            let (_, ah) = bounds(a, s);
            let (_, bh) = bounds(b, s);
            if ah < v {
                set_min(b, s, v)?;
            }
            if bh < v {
                set_min(a, s, v)?;
            }
            if ah < v && bh < v { Err(Conflict) } else { Ok(()) }
        }
        CExpr::Prod(a, b) => {
            let (al, ah) = bounds(a, s);
            let (bl, bh) = bounds(b, s);
            // Push onto each factor when the other has a known strict sign.
            if bl > 0 {
                let target = if v >= 0 { div_ceil(v, bh.min(NO_MAX)) } else { div_ceil(v, bl) };
                if !saturated(v) && !saturated(bl) && !saturated(bh) {
                    set_min(a, s, target)?;
                }
            } else if bh < 0 && !saturated(v) && !saturated(bl) && !saturated(bh) {
                // a * b >= v with b < 0: the best multiplier for a negative
                // a is the most negative b.
                let target = if v >= 0 { div_floor(cap_opp(v), cap_opp(bl)) } else { div_floor(cap_opp(v), cap_opp(bh)) };
                set_max(a, s, target)?;
            }
            if al > 0 && !saturated(v) && !saturated(al) && !saturated(ah) {
                let target = if v >= 0 { div_ceil(v, ah) } else { div_ceil(v, al) };
                set_min(b, s, target)?;
            } else if ah < 0 && !saturated(v) && !saturated(al) && !saturated(ah) {
                let target = if v >= 0 { div_floor(cap_opp(v), cap_opp(al)) } else { div_floor(cap_opp(v), cap_opp(ah)) };
                set_max(b, s, target)?;
            }
            Ok(())
        }
        CExpr::Div { num, den } => {
            let d = *den;
            let target = if v > 0 {
                cap_prod(v, d)
            } else {
                cap_add(cap_prod(cap_sub(v, 1), d), 1)
            };
            set_min(num, s, target)
        }
        CExpr::Mod { arg, modulus } => {
            let (al, ah) = bounds(arg, s);
            if al >= 0 && ah < *modulus {
                // The modulo is the identity on this range.
                set_min(arg, s, v)
            } else if v >= *modulus {
                Err(Conflict)
            } else {
                Ok(())
            }
        }
        CExpr::Square(a) => pow_set_min(a, s, v, 2),
        CExpr::Pow(a, n) => pow_set_min(a, s, v, *n),
        CExpr::PiecewiseLinear { .. } | CExpr::ConvexPiecewise { .. } => {
            // The lower-inverse image is not an interval in general; checked
            // by the linking constraint instead.
            let (_, hi) = bounds(e, s);
            if hi < v { Err(Conflict) } else { Ok(()) }
        }
        CExpr::SemiContinuous { arg, fixed_charge, step } => {
            if v <= 0 {
                return Ok(());
            }
            // A positive value forces the activity on.
            if *step > 0 {
                let needed = cap_sub(v, *fixed_charge);
                set_min(arg, s, div_ceil(needed.max(1), *step).max(1))
            } else if *fixed_charge >= v {
                set_min(arg, s, 1)
            } else {
                Err(Conflict)
            }
        }
        CExpr::Element { index, table } => {
            s.set_range(*index, 0, table.len() as i64 - 1)?;
            let candidates: Vec<i64> = s.iter_domain(*index).collect();
            for i in candidates {
                if table[i as usize] < v {
                    s.remove_value(*index, i)?;
                }
            }
            Ok(())
        }
        CExpr::Conditional { cond, then, otherwise } => match s.lit_value(*cond) {
            Some(true) => set_min(then, s, v),
            Some(false) => {
                if *otherwise >= v { Ok(()) } else { Err(Conflict) }
            }
            None => {
                let (_, th) = bounds(then, s);
                if *otherwise < v && th < v {
                    Err(Conflict)
                } else if *otherwise < v {
                    s.assign_lit(*cond)?;
                    set_min(then, s, v)
                } else if th < v {
                    s.assign_lit(!*cond)
                } else {
                    Ok(())
                }
            }
        },
    }
}

/// Pushes `e <= v` down to set-bound calls on the inputs.
pub(crate) fn set_max(e: &CExpr, s: &mut Store, v: i64) -> PropResult {
    if saturated(v) && v == NO_MAX {
        return Ok(());
    }
    match e {
        CExpr::Const(c) => {
            if *c <= v { Ok(()) } else { Err(Conflict) }
        }
        CExpr::Var(x) => s.set_max(*x, v),
        CExpr::Sum(a, b) => {
            let (al, _) = bounds(a, s);
            let (bl, _) = bounds(b, s);
            set_max(a, s, cap_sub(v, bl))?;
            set_max(b, s, cap_sub(v, al))
        }
        CExpr::Opposite(a) => set_min(a, s, cap_opp(v)),
        CExpr::ScalProd { vars, coefs } => {
            let (total_lo, _) = bounds(e, s);
            if saturated(total_lo) {
                return Ok(());
            }
            if total_lo > v {
                return Err(Conflict);
            }
            for (&x, &c) in vars.iter().zip(coefs) {
                if c == 0 {
                    continue;
                }
                let (term_lo, _) = term_bounds(s, x, c);
                let others_lo = cap_sub(total_lo, term_lo);
                let allowed = cap_sub(v, others_lo);
                if saturated(allowed) {
                    continue;
                }
                if c > 0 {
                    s.set_max(x, div_floor(allowed, c))?;
                } else {
                    s.set_min(x, div_ceil(cap_opp(allowed), -c))?;
                }
            }
            Ok(())
        }
        CExpr::Abs(a) => {
            if v < 0 {
                return Err(Conflict);
            }
            set_min(a, s, cap_opp(v))?;
            set_max(a, s, v)
        }
        CExpr::Min(a, b) => {
            let (al, _) = bounds(a, s);
            let (bl, _) = bounds(b, s);
            if al > v {
                set_max(b, s, v)?;
            }
            if bl > v {
                set_max(a, s, v)?;
            }
            if al > v && bl > v { Err(Conflict) } else { Ok(()) }
        }
        CExpr::Max(a, b) => {
            set_max(a, s, v)?;
            set_max(b, s, v)
        }
        CExpr::Prod(a, b) => {
            let (al, ah) = bounds(a, s);
            let (bl, bh) = bounds(b, s);
            if bl > 0 && !saturated(v) && !saturated(bl) && !saturated(bh) {
                let target = if v >= 0 { div_floor(v, bl) } else { div_floor(v, bh) };
                set_max(a, s, target)?;
            } else if bh < 0 && !saturated(v) && !saturated(bl) && !saturated(bh) {
                let target = if v >= 0 { div_ceil(cap_opp(v), cap_opp(bh)) } else { div_ceil(cap_opp(v), cap_opp(bl)) };
                set_min(a, s, target)?;
            }
            if al > 0 && !saturated(v) && !saturated(al) && !saturated(ah) {
                let target = if v >= 0 { div_floor(v, al) } else { div_floor(v, ah) };
                set_max(b, s, target)?;
            } else if ah < 0 && !saturated(v) && !saturated(al) && !saturated(ah) {
                let target = if v >= 0 { div_ceil(cap_opp(v), cap_opp(ah)) } else { div_ceil(cap_opp(v), cap_opp(al)) };
                set_min(b, s, target)?;
            }
            Ok(())
        }
        CExpr::Div { num, den } => {
            let d = *den;
            let target = if v >= 0 {
                cap_sub(cap_prod(cap_add(v, 1), d), 1)
            } else {
                cap_prod(v, d)
            };
            set_max(num, s, target)
        }
        CExpr::Mod { arg, modulus } => {
            let (al, ah) = bounds(arg, s);
            if al >= 0 && ah < *modulus {
                set_max(arg, s, v)
            } else if v <= -*modulus {
                Err(Conflict)
            } else {
                Ok(())
            }
        }
        CExpr::Square(a) => pow_set_max(a, s, v, 2),
        CExpr::Pow(a, n) => pow_set_max(a, s, v, *n),
        CExpr::PiecewiseLinear { arg, f } => {
            let (lo, _) = bounds(e, s);
            if lo > v {
                return Err(Conflict);
            }
            if f.nondecreasing() {
                let (_, ah) = bounds(arg, s);
                match f.invert_le(v, ah) {
                    Some(x) => set_max(arg, s, x),
                    None => Err(Conflict),
                }
            } else {
                Ok(())
            }
        }
        CExpr::ConvexPiecewise {
            arg,
            early_cost,
            early_date,
            late_date,
            late_cost,
        } => {
            if v < 0 {
                return Err(Conflict);
            }
            if *early_cost > 0 {
                set_min(arg, s, cap_sub(*early_date, div_floor(v, *early_cost)))?;
            }
            if *late_cost > 0 {
                set_max(arg, s, cap_add(*late_date, div_floor(v, *late_cost)))?;
            }
            Ok(())
        }
        CExpr::SemiContinuous { arg, fixed_charge, step } => {
            if v < 0 {
                return Err(Conflict);
            }
            if v < *fixed_charge {
                // The activity cannot be on.
                set_max(arg, s, 0)
            } else if *step > 0 {
                set_max(arg, s, div_floor(cap_sub(v, *fixed_charge), *step).max(0))
            } else {
                Ok(())
            }
        }
        CExpr::Element { index, table } => {
            s.set_range(*index, 0, table.len() as i64 - 1)?;
            let candidates: Vec<i64> = s.iter_domain(*index).collect();
            for i in candidates {
                if table[i as usize] > v {
                    s.remove_value(*index, i)?;
                }
            }
            Ok(())
        }
        CExpr::Conditional { cond, then, otherwise } => match s.lit_value(*cond) {
            Some(true) => set_max(then, s, v),
            Some(false) => {
                if *otherwise <= v { Ok(()) } else { Err(Conflict) }
            }
            None => {
                let (tl, _) = bounds(then, s);
                if *otherwise > v && tl > v {
                    Err(Conflict)
                } else if *otherwise > v {
                    s.assign_lit(*cond)?;
                    set_max(then, s, v)
                } else if tl > v {
                    s.assign_lit(!*cond)
                } else {
                    Ok(())
                }
            }
        },
    }
}

pub(crate) fn set_range(e: &CExpr, s: &mut Store, lo: i64, hi: i64) -> PropResult {
    if lo > hi {
        return Err(Conflict);
    }
    set_min(e, s, lo)?;
    set_max(e, s, hi)
}

pub(crate) fn set_value(e: &CExpr, s: &mut Store, v: i64) -> PropResult {
    set_range(e, s, v, v)
}

fn pow_set_min(a: &CExpr, s: &mut Store, v: i64, n: u32) -> PropResult {
    if n % 2 == 1 {
        let r = if v >= 0 {
            root_ceil(v, n)
        } else {
            cap_opp(root_floor(cap_opp(v), n))
        };
        return set_min(a, s, r);
    }
    if v <= 0 {
        return Ok(());
    }
    let r = root_ceil(v, n);
    let (al, ah) = bounds(a, s);
    if al > cap_opp(r) {
        set_min(a, s, r)
    } else if ah < r {
        set_max(a, s, cap_opp(r))
    } else {
        Ok(())
    }
}

fn pow_set_max(a: &CExpr, s: &mut Store, v: i64, n: u32) -> PropResult {
    if n % 2 == 1 {
        let r = if v >= 0 {
            root_floor(v, n)
        } else {
            cap_opp(root_ceil(cap_opp(v), n))
        };
        return set_max(a, s, r);
    }
    if v < 0 {
        return Err(Conflict);
    }
    let r = root_floor(v, n);
    set_range(a, s, cap_opp(r), r)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_vars(s: &mut Store) -> (VarId, VarId) {
        (s.new_var_range(0, 10, "x"), s.new_var_range(0, 10, "y"))
    }

    #[test]
    fn sum_bounds_and_pushdown() {
        let mut s = Store::new();
        let (x, y) = two_vars(&mut s);
        let e = CExpr::Sum(Box::new(CExpr::Var(x)), Box::new(CExpr::Var(y)));
        assert_eq!(bounds(&e, &s), (0, 20));
        set_max(&e, &mut s, 5).unwrap();
        assert_eq!(s.max(x), 5);
        assert_eq!(s.max(y), 5);
        s.set_value(x, 3).unwrap();
        set_min(&e, &mut s, 5).unwrap();
        assert_eq!(s.min(y), 2);
    }

    #[test]
    fn opposite_and_abs() {
        let mut s = Store::new();
        let x = s.new_var_range(-5, 3, "x");
        let opp = CExpr::Opposite(Box::new(CExpr::Var(x)));
        assert_eq!(bounds(&opp, &s), (-3, 5));
        let abs = CExpr::Abs(Box::new(CExpr::Var(x)));
        assert_eq!(bounds(&abs, &s), (0, 5));
        set_max(&abs, &mut s, 2).unwrap();
        assert_eq!((s.min(x), s.max(x)), (-2, 2));
    }

    #[test]
    fn scal_prod_pushdown() {
        let mut s = Store::new();
        let (x, y) = two_vars(&mut s);
        let e = CExpr::ScalProd { vars: vec![x, y], coefs: vec![2, -3] };
        assert_eq!(bounds(&e, &s), (-30, 20));
        // 2x - 3y <= -12 with x,y in [0,10] forces y >= 4 - hmm, with x = 0
        // it forces 3y >= 12.
        set_max(&e, &mut s, -12).unwrap();
        assert!(s.min(y) >= 0);
        s.set_value(x, 9).unwrap();
        set_max(&e, &mut s, -12).unwrap();
        assert_eq!(s.min(y), 10);
    }

    #[test]
    fn division_truncates_toward_zero() {
        let mut s = Store::new();
        let x = s.new_var_range(-7, 7, "x");
        let e = CExpr::Div { num: Box::new(CExpr::Var(x)), den: 2 };
        assert_eq!(bounds(&e, &s), (-3, 3));
        set_max(&e, &mut s, 1).unwrap();
        assert_eq!(s.max(x), 3);
        set_min(&e, &mut s, 0).unwrap();
        assert_eq!(s.min(x), -1);
    }

    #[test]
    fn square_pushdown() {
        let mut s = Store::new();
        let x = s.new_var_range(-10, 10, "x");
        let e = CExpr::Square(Box::new(CExpr::Var(x)));
        assert_eq!(bounds(&e, &s), (0, 100));
        set_max(&e, &mut s, 17).unwrap();
        assert_eq!((s.min(x), s.max(x)), (-4, 4));
    }

    #[test]
    fn element_restricts_index() {
        let mut s = Store::new();
        let i = s.new_var_range(0, 9, "i");
        let e = CExpr::Element { index: i, table: vec![4, 8, 1, 9, 3] };
        set_min(&e, &mut s, 4).unwrap();
        assert_eq!(s.max(i), 3);
        let vals: Vec<i64> = s.iter_domain(i).collect();
        assert_eq!(vals, vec![0, 1, 3]);
        assert_eq!(bounds(&e, &s), (4, 9));
    }

    #[test]
    fn conditional_forces_literal() {
        let mut s = Store::new();
        let b = s.new_bool("b");
        let x = s.new_var_range(0, 10, "x");
        let e = CExpr::Conditional {
            cond: Lit::pos(b),
            then: Box::new(CExpr::Var(x)),
            otherwise: -1,
        };
        assert_eq!(bounds(&e, &s), (-1, 10));
        set_min(&e, &mut s, 0).unwrap();
        assert!(s.lit_is_true(Lit::pos(b)));
        assert_eq!(bounds(&e, &s), (0, 10));
    }

    #[test]
    fn piecewise_linear_eval_and_bounds() {
        let mut s = Store::new();
        let x = s.new_var_range(0, 10, "x");
        // Flat at 5 until x=4, then slope 2.
        let f = PiecewiseLinearFn::new(vec![(0, 5, 0), (4, 5, 2)]).unwrap();
        assert_eq!(f.eval(3), 5);
        assert_eq!(f.eval(6), 9);
        let e = CExpr::PiecewiseLinear { arg: Box::new(CExpr::Var(x)), f };
        assert_eq!(bounds(&e, &s), (5, 17));
        set_max(&e, &mut s, 9).unwrap();
        assert_eq!(s.max(x), 6);
    }

    #[test]
    fn convex_piecewise_window() {
        let mut s = Store::new();
        let x = s.new_var_range(0, 20, "x");
        let e = CExpr::ConvexPiecewise {
            arg: Box::new(CExpr::Var(x)),
            early_cost: 3,
            early_date: 5,
            late_date: 10,
            late_cost: 2,
        };
        assert_eq!(bounds(&e, &s), (0, 20));
        set_max(&e, &mut s, 6).unwrap();
        assert_eq!((s.min(x), s.max(x)), (3, 13));
    }

    #[test]
    fn semi_continuous_charge() {
        let mut s = Store::new();
        let x = s.new_var_range(0, 10, "x");
        let e = CExpr::SemiContinuous {
            arg: Box::new(CExpr::Var(x)),
            fixed_charge: 5,
            step: 2,
        };
        assert_eq!(bounds(&e, &s), (0, 25));
        set_max(&e, &mut s, 4).unwrap();
        assert_eq!(s.max(x), 0);
    }
}
