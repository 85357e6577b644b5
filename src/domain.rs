//! Finite-domain representations.
//!
//! Three concrete forms sit behind one [`DomainOps`] interface: a single
//! constant, a sparse bounded form (`[min, max]` plus an exclusion list that
//! is lazily grown on the first hole), and bitset-backed forms in two
//! flavors: one word for spans of at most 64 values, multi-word otherwise.
//! Representation is chosen at construction and never changes.
//!
//! All reversible state (bounds, bitset words, exclusion-list length) lives
//! in trail cells, so backtracking restores a domain without the domain
//! knowing about levels at all.
//!
//! Interior removals are reported through the `holes` sink handed to
//! `remove_value`; removals that touch a bound are bound updates and are
//! *not* holes.

use enum_dispatch::enum_dispatch;

use crate::trail::{RevCell, Trail};
use crate::Conflict;

/// What a mutation did to a domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DomainDelta {
    pub min_changed: bool,
    pub max_changed: bool,
    pub removed: bool,
}

impl DomainDelta {
    pub const NONE: DomainDelta = DomainDelta {
        min_changed: false,
        max_changed: false,
        removed: false,
    };

    #[inline]
    pub fn any(&self) -> bool {
        self.min_changed || self.max_changed || self.removed
    }

    fn merge(self, other: DomainDelta) -> DomainDelta {
        DomainDelta {
            min_changed: self.min_changed || other.min_changed,
            max_changed: self.max_changed || other.max_changed,
            removed: self.removed || other.removed,
        }
    }
}

type DomResult = Result<DomainDelta, Conflict>;

/// Unified operations over every domain representation.
#[enum_dispatch]
pub(crate) trait DomainOps {
    fn min(&self, t: &Trail) -> i64;
    fn max(&self, t: &Trail) -> i64;
    fn size(&self, t: &Trail) -> u64;
    fn contains(&self, t: &Trail, v: i64) -> bool;
    fn set_min(&mut self, t: &mut Trail, v: i64) -> DomResult;
    fn set_max(&mut self, t: &mut Trail, v: i64) -> DomResult;
    /// Removes one value, pushing it to `holes` when it is interior.
    fn remove_value(&mut self, t: &mut Trail, v: i64, holes: &mut Vec<i64>) -> DomResult;
    /// Smallest contained value `>= v`, if any.
    fn first_ge(&self, t: &Trail, v: i64) -> Option<i64>;
    /// Largest contained value `<= v`, if any.
    fn last_le(&self, t: &Trail, v: i64) -> Option<i64>;
}

/// One of the three concrete representations.
#[enum_dispatch(DomainOps)]
#[derive(Debug)]
pub(crate) enum Domain {
    Constant(ConstantDomain),
    Sparse(SparseDomain),
    Small(SmallBitsetDomain),
    Large(LargeBitsetDomain),
}

impl Domain {
    /// Representation selection for a plain range.
    pub fn new_range(t: &mut Trail, min: i64, max: i64) -> Domain {
        debug_assert!(min <= max);
        let span = (max as i128) - (min as i128) + 1;
        if span <= 64 {
            Domain::Small(SmallBitsetDomain::full(t, min, max))
        } else {
            Domain::Sparse(SparseDomain::new(t, min, max))
        }
    }

    /// Representation selection for a sorted, deduplicated value list.
    pub fn new_from_values(t: &mut Trail, values: &[i64]) -> Domain {
        debug_assert!(!values.is_empty());
        debug_assert!(values.windows(2).all(|w| w[0] < w[1]));
        let (first, last) = (values[0], values[values.len() - 1]);
        if values.len() == 1 {
            return Domain::Constant(ConstantDomain { value: first });
        }
        let span = (last as i128) - (first as i128) + 1;
        if span <= 64 {
            Domain::Small(SmallBitsetDomain::from_values(t, values))
        } else {
            Domain::Large(LargeBitsetDomain::from_values(t, values))
        }
    }

    pub fn set_range(&mut self, t: &mut Trail, lo: i64, hi: i64) -> DomResult {
        if lo > hi {
            return Err(Conflict);
        }
        let a = self.set_min(t, lo)?;
        let b = self.set_max(t, hi)?;
        Ok(a.merge(b))
    }

    pub fn set_value(&mut self, t: &mut Trail, v: i64) -> DomResult {
        self.set_range(t, v, v)
    }

    pub fn remove_interval(
        &mut self,
        t: &mut Trail,
        lo: i64,
        hi: i64,
        holes: &mut Vec<i64>,
    ) -> DomResult {
        if lo > hi {
            return Ok(DomainDelta::NONE);
        }
        let (min, max) = (self.min(t), self.max(t));
        if lo <= min && hi >= max {
            return Err(Conflict);
        }
        if lo <= min {
            return self.set_min(t, hi.saturating_add(1));
        }
        if hi >= max {
            return self.set_max(t, lo.saturating_sub(1));
        }
        let mut delta = DomainDelta::NONE;
        let mut v = lo;
        while let Some(next) = self.first_ge(t, v) {
            if next > hi {
                break;
            }
            delta = delta.merge(self.remove_value(t, next, holes)?);
            v = next.saturating_add(1);
        }
        Ok(delta)
    }
}

// ---------- Constant ----------

/// A single pinned value; any restriction excluding it fails.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConstantDomain {
    pub value: i64,
}

impl DomainOps for ConstantDomain {
    fn min(&self, _t: &Trail) -> i64 {
        self.value
    }

    fn max(&self, _t: &Trail) -> i64 {
        self.value
    }

    fn size(&self, _t: &Trail) -> u64 {
        1
    }

    fn contains(&self, _t: &Trail, v: i64) -> bool {
        v == self.value
    }

    fn set_min(&mut self, _t: &mut Trail, v: i64) -> DomResult {
        if v <= self.value { Ok(DomainDelta::NONE) } else { Err(Conflict) }
    }

    fn set_max(&mut self, _t: &mut Trail, v: i64) -> DomResult {
        if v >= self.value { Ok(DomainDelta::NONE) } else { Err(Conflict) }
    }

    fn remove_value(&mut self, _t: &mut Trail, v: i64, _holes: &mut Vec<i64>) -> DomResult {
        if v == self.value { Err(Conflict) } else { Ok(DomainDelta::NONE) }
    }

    fn first_ge(&self, _t: &Trail, v: i64) -> Option<i64> {
        (v <= self.value).then_some(self.value)
    }

    fn last_le(&self, _t: &Trail, v: i64) -> Option<i64> {
        (v >= self.value).then_some(self.value)
    }
}

// ---------- Sparse bounds ----------

/// Reversible `[min, max]` plus an exclusion list for holes.
///
/// The exclusion vector is append-only; only its reversible length is
/// trailed, so membership is always "the first `len` entries". Entries past
/// the length are stale leftovers from popped levels and get overwritten by
/// the next exclusion.
#[derive(Debug)]
pub(crate) struct SparseDomain {
    min: RevCell,
    max: RevCell,
    excluded: Vec<i64>,
    excl_len: RevCell,
}

impl SparseDomain {
    pub fn new(t: &mut Trail, min: i64, max: i64) -> Self {
        Self {
            min: t.new_cell(min),
            max: t.new_cell(max),
            excluded: Vec::new(),
            excl_len: t.new_cell(0),
        }
    }

    fn is_excluded(&self, t: &Trail, v: i64) -> bool {
        let len = t.get(self.excl_len) as usize;
        self.excluded[..len].contains(&v)
    }

    fn exclude(&mut self, t: &mut Trail, v: i64) {
        let len = t.get(self.excl_len) as usize;
        if self.excluded.len() > len {
            self.excluded[len] = v;
        } else {
            self.excluded.push(v);
        }
        t.set(self.excl_len, len as i64 + 1);
    }

    /// First non-excluded value at or above `v`, scanning upward.
    fn skip_up(&self, t: &Trail, mut v: i64, max: i64) -> Option<i64> {
        while v <= max {
            if !self.is_excluded(t, v) {
                return Some(v);
            }
            v = v.checked_add(1)?;
        }
        None
    }

    fn skip_down(&self, t: &Trail, mut v: i64, min: i64) -> Option<i64> {
        while v >= min {
            if !self.is_excluded(t, v) {
                return Some(v);
            }
            v = v.checked_sub(1)?;
        }
        None
    }
}

impl DomainOps for SparseDomain {
    fn min(&self, t: &Trail) -> i64 {
        t.get(self.min)
    }

    fn max(&self, t: &Trail) -> i64 {
        t.get(self.max)
    }

    fn size(&self, t: &Trail) -> u64 {
        let (min, max) = (t.get(self.min), t.get(self.max));
        let width = (max as i128) - (min as i128) + 1;
        let len = t.get(self.excl_len) as usize;
        let holes = self.excluded[..len]
            .iter()
            .filter(|&&v| v >= min && v <= max)
            .count() as i128;
        (width - holes).min(u64::MAX as i128) as u64
    }

    fn contains(&self, t: &Trail, v: i64) -> bool {
        v >= t.get(self.min) && v <= t.get(self.max) && !self.is_excluded(t, v)
    }

    fn set_min(&mut self, t: &mut Trail, v: i64) -> DomResult {
        let (min, max) = (t.get(self.min), t.get(self.max));
        if v <= min {
            return Ok(DomainDelta::NONE);
        }
        if v > max {
            return Err(Conflict);
        }
        let new_min = self.skip_up(t, v, max).ok_or(Conflict)?;
        t.set(self.min, new_min);
        Ok(DomainDelta { min_changed: true, ..DomainDelta::NONE })
    }

    fn set_max(&mut self, t: &mut Trail, v: i64) -> DomResult {
        let (min, max) = (t.get(self.min), t.get(self.max));
        if v >= max {
            return Ok(DomainDelta::NONE);
        }
        if v < min {
            return Err(Conflict);
        }
        let new_max = self.skip_down(t, v, min).ok_or(Conflict)?;
        t.set(self.max, new_max);
        Ok(DomainDelta { max_changed: true, ..DomainDelta::NONE })
    }

    fn remove_value(&mut self, t: &mut Trail, v: i64, holes: &mut Vec<i64>) -> DomResult {
        if !self.contains(t, v) {
            return Ok(DomainDelta::NONE);
        }
        let (min, max) = (t.get(self.min), t.get(self.max));
        if min == max {
            return Err(Conflict);
        }
        if v == min {
            return self.set_min(t, v + 1);
        }
        if v == max {
            return self.set_max(t, v - 1);
        }
        self.exclude(t, v);
        holes.push(v);
        Ok(DomainDelta { removed: true, ..DomainDelta::NONE })
    }

    fn first_ge(&self, t: &Trail, v: i64) -> Option<i64> {
        let (min, max) = (t.get(self.min), t.get(self.max));
        self.skip_up(t, v.max(min), max)
    }

    fn last_le(&self, t: &Trail, v: i64) -> Option<i64> {
        let (min, max) = (t.get(self.min), t.get(self.max));
        self.skip_down(t, v.min(max), min)
    }
}

// ---------- One-word bitset ----------

/// Bitset over a span of at most 64 values, with bounds cached in cells.
/// Invariant: the word holds no bit outside `[min, max]`.
#[derive(Debug)]
pub(crate) struct SmallBitsetDomain {
    offset: i64,
    word: RevCell,
    min: RevCell,
    max: RevCell,
}

impl SmallBitsetDomain {
    pub fn full(t: &mut Trail, min: i64, max: i64) -> Self {
        let span = (max - min) as u32 + 1;
        debug_assert!(span <= 64);
        let word = if span == 64 { u64::MAX } else { (1u64 << span) - 1 };
        Self {
            offset: min,
            word: t.new_cell(word as i64),
            min: t.new_cell(min),
            max: t.new_cell(max),
        }
    }

    pub fn from_values(t: &mut Trail, values: &[i64]) -> Self {
        let offset = values[0];
        let mut word = 0u64;
        for &v in values {
            word |= 1u64 << (v - offset) as u32;
        }
        Self {
            offset,
            word: t.new_cell(word as i64),
            min: t.new_cell(values[0]),
            max: t.new_cell(values[values.len() - 1]),
        }
    }

    #[inline]
    fn bits(&self, t: &Trail) -> u64 {
        t.get(self.word) as u64
    }
}

impl DomainOps for SmallBitsetDomain {
    fn min(&self, t: &Trail) -> i64 {
        t.get(self.min)
    }

    fn max(&self, t: &Trail) -> i64 {
        t.get(self.max)
    }

    fn size(&self, t: &Trail) -> u64 {
        self.bits(t).count_ones() as u64
    }

    fn contains(&self, t: &Trail, v: i64) -> bool {
        if v < t.get(self.min) || v > t.get(self.max) {
            return false;
        }
        self.bits(t) & (1u64 << (v - self.offset) as u32) != 0
    }

    fn set_min(&mut self, t: &mut Trail, v: i64) -> DomResult {
        let (min, max) = (t.get(self.min), t.get(self.max));
        if v <= min {
            return Ok(DomainDelta::NONE);
        }
        if v > max {
            return Err(Conflict);
        }
        let shift = (v - self.offset) as u32;
        let masked = self.bits(t) & (u64::MAX << shift);
        if masked == 0 {
            return Err(Conflict);
        }
        let new_min = self.offset + masked.trailing_zeros() as i64;
        t.set(self.word, masked as i64);
        t.set(self.min, new_min);
        Ok(DomainDelta { min_changed: true, ..DomainDelta::NONE })
    }

    fn set_max(&mut self, t: &mut Trail, v: i64) -> DomResult {
        let (min, max) = (t.get(self.min), t.get(self.max));
        if v >= max {
            return Ok(DomainDelta::NONE);
        }
        if v < min {
            return Err(Conflict);
        }
        let shift = (v - self.offset) as u32;
        let masked = self.bits(t) & (u64::MAX >> (63 - shift));
        if masked == 0 {
            return Err(Conflict);
        }
        let new_max = self.offset + 63 - masked.leading_zeros() as i64;
        t.set(self.word, masked as i64);
        t.set(self.max, new_max);
        Ok(DomainDelta { max_changed: true, ..DomainDelta::NONE })
    }

    fn remove_value(&mut self, t: &mut Trail, v: i64, holes: &mut Vec<i64>) -> DomResult {
        if !self.contains(t, v) {
            return Ok(DomainDelta::NONE);
        }
        let (min, max) = (t.get(self.min), t.get(self.max));
        if min == max {
            return Err(Conflict);
        }
        if v == min {
            return self.set_min(t, v + 1);
        }
        if v == max {
            return self.set_max(t, v - 1);
        }
        let word = self.bits(t) & !(1u64 << (v - self.offset) as u32);
        t.set(self.word, word as i64);
        holes.push(v);
        Ok(DomainDelta { removed: true, ..DomainDelta::NONE })
    }

    fn first_ge(&self, t: &Trail, v: i64) -> Option<i64> {
        let max = t.get(self.max);
        let v = v.max(t.get(self.min));
        if v > max {
            return None;
        }
        let shift = (v - self.offset) as u32;
        let masked = self.bits(t) & (u64::MAX << shift);
        (masked != 0).then(|| self.offset + masked.trailing_zeros() as i64)
    }

    fn last_le(&self, t: &Trail, v: i64) -> Option<i64> {
        let min = t.get(self.min);
        let v = v.min(t.get(self.max));
        if v < min {
            return None;
        }
        let shift = (v - self.offset) as u32;
        let masked = self.bits(t) & (u64::MAX >> (63 - shift));
        (masked != 0).then(|| self.offset + 63 - masked.leading_zeros() as i64)
    }
}

// ---------- Multi-word bitset ----------

/// Bitset over an arbitrary finite span, `⌈span/64⌉` words.
#[derive(Debug)]
pub(crate) struct LargeBitsetDomain {
    offset: i64,
    words: Vec<RevCell>,
    min: RevCell,
    max: RevCell,
}

impl LargeBitsetDomain {
    pub fn from_values(t: &mut Trail, values: &[i64]) -> Self {
        let offset = values[0];
        let span = (values[values.len() - 1] - offset) as usize + 1;
        let n_words = span.div_ceil(64);
        let mut raw = vec![0u64; n_words];
        for &v in values {
            let idx = (v - offset) as usize;
            raw[idx / 64] |= 1u64 << (idx % 64);
        }
        let words = raw.into_iter().map(|w| t.new_cell(w as i64)).collect();
        Self {
            offset,
            words,
            min: t.new_cell(values[0]),
            max: t.new_cell(values[values.len() - 1]),
        }
    }

    #[inline]
    fn word(&self, t: &Trail, i: usize) -> u64 {
        t.get(self.words[i]) as u64
    }

    /// First set bit at index `>= from`, if any.
    fn scan_up(&self, t: &Trail, from: usize) -> Option<usize> {
        let mut w = from / 64;
        if w >= self.words.len() {
            return None;
        }
        let mut bits = self.word(t, w) & (u64::MAX << (from % 64) as u32);
        loop {
            if bits != 0 {
                return Some(w * 64 + bits.trailing_zeros() as usize);
            }
            w += 1;
            if w >= self.words.len() {
                return None;
            }
            bits = self.word(t, w);
        }
    }

    /// Last set bit at index `<= from`, if any.
    fn scan_down(&self, t: &Trail, from: usize) -> Option<usize> {
        let mut w = from / 64;
        let mut bits = self.word(t, w) & (u64::MAX >> (63 - (from % 64)) as u32);
        loop {
            if bits != 0 {
                return Some(w * 64 + 63 - bits.leading_zeros() as usize);
            }
            if w == 0 {
                return None;
            }
            w -= 1;
            bits = self.word(t, w);
        }
    }
}

impl DomainOps for LargeBitsetDomain {
    fn min(&self, t: &Trail) -> i64 {
        t.get(self.min)
    }

    fn max(&self, t: &Trail) -> i64 {
        t.get(self.max)
    }

    fn size(&self, t: &Trail) -> u64 {
        (0..self.words.len()).map(|i| self.word(t, i).count_ones() as u64).sum()
    }

    fn contains(&self, t: &Trail, v: i64) -> bool {
        if v < t.get(self.min) || v > t.get(self.max) {
            return false;
        }
        let idx = (v - self.offset) as usize;
        self.word(t, idx / 64) & (1u64 << (idx % 64)) != 0
    }

    fn set_min(&mut self, t: &mut Trail, v: i64) -> DomResult {
        let (min, max) = (t.get(self.min), t.get(self.max));
        if v <= min {
            return Ok(DomainDelta::NONE);
        }
        if v > max {
            return Err(Conflict);
        }
        let from = (v - self.offset) as usize;
        let new_idx = self.scan_up(t, from).ok_or(Conflict)?;
        // Clear everything below the new minimum.
        for w in 0..new_idx / 64 {
            t.set(self.words[w], 0);
        }
        let partial = self.word(t, new_idx / 64) & (u64::MAX << (new_idx % 64) as u32);
        t.set(self.words[new_idx / 64], partial as i64);
        t.set(self.min, self.offset + new_idx as i64);
        Ok(DomainDelta { min_changed: true, ..DomainDelta::NONE })
    }

    fn set_max(&mut self, t: &mut Trail, v: i64) -> DomResult {
        let (min, max) = (t.get(self.min), t.get(self.max));
        if v >= max {
            return Ok(DomainDelta::NONE);
        }
        if v < min {
            return Err(Conflict);
        }
        let from = (v - self.offset) as usize;
        let new_idx = self.scan_down(t, from).ok_or(Conflict)?;
        for w in new_idx / 64 + 1..self.words.len() {
            t.set(self.words[w], 0);
        }
        let partial = self.word(t, new_idx / 64) & (u64::MAX >> (63 - (new_idx % 64)) as u32);
        t.set(self.words[new_idx / 64], partial as i64);
        t.set(self.max, self.offset + new_idx as i64);
        Ok(DomainDelta { max_changed: true, ..DomainDelta::NONE })
    }

    fn remove_value(&mut self, t: &mut Trail, v: i64, holes: &mut Vec<i64>) -> DomResult {
        if !self.contains(t, v) {
            return Ok(DomainDelta::NONE);
        }
        let (min, max) = (t.get(self.min), t.get(self.max));
        if min == max {
            return Err(Conflict);
        }
        if v == min {
            return self.set_min(t, v + 1);
        }
        if v == max {
            return self.set_max(t, v - 1);
        }
        let idx = (v - self.offset) as usize;
        let word = self.word(t, idx / 64) & !(1u64 << (idx % 64));
        t.set(self.words[idx / 64], word as i64);
        holes.push(v);
        Ok(DomainDelta { removed: true, ..DomainDelta::NONE })
    }

    fn first_ge(&self, t: &Trail, v: i64) -> Option<i64> {
        let v = v.max(t.get(self.min));
        if v > t.get(self.max) {
            return None;
        }
        self.scan_up(t, (v - self.offset) as usize).map(|i| self.offset + i as i64)
    }

    fn last_le(&self, t: &Trail, v: i64) -> Option<i64> {
        let v = v.min(t.get(self.max));
        if v < t.get(self.min) {
            return None;
        }
        self.scan_down(t, (v - self.offset) as usize).map(|i| self.offset + i as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rstest_reuse::{apply, template};

    fn values(d: &Domain, t: &Trail) -> Vec<i64> {
        let mut out = Vec::new();
        let mut v = d.min(t);
        while let Some(next) = d.first_ge(t, v) {
            out.push(next);
            v = match next.checked_add(1) {
                Some(v) => v,
                None => break,
            };
        }
        out
    }

    #[template]
    #[rstest]
    #[case::small(false)]
    #[case::large(true)]
    fn bitset_flavors(#[case] wide: bool) {}

    fn odd_domain(t: &mut Trail, wide: bool) -> Domain {
        // Same logical domain in both flavors; the wide one pads the span
        // past 64 so the multi-word representation is selected.
        if wide {
            Domain::new_from_values(t, &[1, 3, 5, 7, 9, 200])
        } else {
            Domain::new_from_values(t, &[1, 3, 5, 7, 9])
        }
    }

    #[apply(bitset_flavors)]
    fn remove_interval_reports_holes(wide: bool) {
        let mut t = Trail::new();
        let mut d = odd_domain(&mut t, wide);
        let mut holes = Vec::new();
        d.remove_interval(&mut t, 3, 5, &mut holes).unwrap();
        assert_eq!(holes, vec![3, 5]);
        assert!(!d.contains(&t, 3) && !d.contains(&t, 4) && !d.contains(&t, 5));
        assert!(d.contains(&t, 1) && d.contains(&t, 7) && d.contains(&t, 9));
    }

    #[apply(bitset_flavors)]
    fn bounds_skip_missing_values(wide: bool) {
        let mut t = Trail::new();
        let mut d = odd_domain(&mut t, wide);
        d.set_min(&mut t, 2).unwrap();
        assert_eq!(d.min(&t), 3);
        d.set_max(&mut t, 8).unwrap();
        assert_eq!(d.max(&t), 7);
        assert_eq!(values(&d, &t), vec![3, 5, 7]);
    }

    #[test]
    fn backtracking_restores_bitset() {
        let mut t = Trail::new();
        let mut d = Domain::new_from_values(&mut t, &[1, 3, 5, 7, 9]);
        t.push_level();
        let mut holes = Vec::new();
        d.remove_value(&mut t, 5, &mut holes).unwrap();
        d.set_min(&mut t, 6).unwrap();
        assert_eq!(values(&d, &t), vec![7, 9]);
        t.pop_level_with(|_| {});
        assert_eq!(values(&d, &t), vec![1, 3, 5, 7, 9]);
    }

    #[test]
    fn sparse_domain_holes_and_bounds() {
        let mut t = Trail::new();
        let mut d = Domain::new_range(&mut t, 0, 1_000_000);
        assert!(matches!(d, Domain::Sparse(_)));
        let mut holes = Vec::new();
        d.remove_value(&mut t, 500, &mut holes).unwrap();
        assert_eq!(holes, vec![500]);
        assert!(!d.contains(&t, 500));
        assert_eq!(d.size(&t), 1_000_000);
        // Removing the bound walks over the hole.
        d.set_range(&mut t, 499, 1_000_000).unwrap();
        d.set_max(&mut t, 500).unwrap();
        assert_eq!(d.max(&t), 499);
        assert_eq!(d.min(&t), 499);
    }

    #[test]
    fn constant_rejects_exclusion() {
        let mut t = Trail::new();
        let mut d = Domain::new_from_values(&mut t, &[42]);
        assert!(matches!(d, Domain::Constant(_)));
        let mut holes = Vec::new();
        assert_eq!(d.remove_value(&mut t, 41, &mut holes), Ok(DomainDelta::NONE));
        assert!(d.remove_value(&mut t, 42, &mut holes).is_err());
        assert!(d.set_min(&mut t, 43).is_err());
    }

    #[test]
    fn empty_range_fails() {
        let mut t = Trail::new();
        let mut d = Domain::new_range(&mut t, 0, 10);
        assert!(d.set_range(&mut t, 7, 3).is_err());
    }

    #[test]
    fn tightening_an_already_tighter_domain_is_a_noop() {
        let mut t = Trail::new();
        let mut d = Domain::new_range(&mut t, 3, 8);
        assert_eq!(d.set_range(&mut t, 0, 20).unwrap(), DomainDelta::NONE);
        assert_eq!(d.set_min(&mut t, 3).unwrap(), DomainDelta::NONE);
        assert_eq!(d.set_max(&mut t, 8).unwrap(), DomainDelta::NONE);
    }
}
