//! Trail-based reversible state.
//!
//! Every mutation that must survive backtracking goes through a [`Trail`]
//! cell. A cell is a plain `i64` slot plus a stamp recording the last
//! push/pop epoch at which its old value was saved, so each cell is recorded
//! at most once per search level. `push_level` opens a frame;
//! `pop_level_with` rewinds the undo log down to the frame in LIFO order and
//! hands non-cell undo records (watcher registrations) back to the caller.

use crate::queue::VarEvent;
use crate::vars::VarId;

/// Handle to a reversible `i64` cell owned by the trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevCell(pub(crate) u32);

/// A record on the undo log.
#[derive(Debug, Clone, Copy)]
pub(crate) enum UndoOp {
    /// Restore `cell` to `old`.
    Cell { cell: RevCell, old: i64 },
    /// Pop the most recent demon appended to a watcher list.
    WatcherPop {
        var: VarId,
        event: VarEvent,
        delayed: bool,
    },
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    undo_len: usize,
    cells_len: usize,
}

/// Growable array of reversible cells plus the undo log.
#[derive(Debug, Default)]
pub struct Trail {
    level: u32,
    /// Monotone epoch, bumped on every push *and* pop so a stale per-cell
    /// stamp can never alias the current frame.
    epoch: u64,
    values: Vec<i64>,
    stamps: Vec<u64>,
    undo: Vec<UndoOp>,
    frames: Vec<Frame>,
}

impl Trail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current search level; level 0 is the root, where writes are permanent.
    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn new_cell(&mut self, value: i64) -> RevCell {
        let id = RevCell(self.values.len() as u32);
        self.values.push(value);
        self.stamps.push(0);
        id
    }

    #[inline]
    pub fn get(&self, cell: RevCell) -> i64 {
        self.values[cell.0 as usize]
    }

    /// Whether a cell handle still points into the live cell array. Handles
    /// to cells created inside a popped frame go stale.
    #[inline]
    pub(crate) fn valid(&self, cell: RevCell) -> bool {
        (cell.0 as usize) < self.values.len()
    }

    /// Writes `value`, saving the old value on the undo log the first time
    /// the cell is touched in the current frame.
    #[inline]
    pub fn set(&mut self, cell: RevCell, value: i64) {
        let idx = cell.0 as usize;
        let old = self.values[idx];
        if old == value {
            return;
        }
        if self.level > 0 && self.stamps[idx] != self.epoch {
            self.stamps[idx] = self.epoch;
            self.undo.push(UndoOp::Cell { cell, old });
        }
        self.values[idx] = value;
    }

    #[inline]
    pub fn add(&mut self, cell: RevCell, delta: i64) {
        let v = self.get(cell);
        self.set(cell, v + delta);
    }

    /// Records a non-cell undo action in the current frame. No-op at root:
    /// root-level registrations are permanent.
    pub(crate) fn push_undo(&mut self, op: UndoOp) {
        if self.level > 0 {
            self.undo.push(op);
        }
    }

    pub fn push_level(&mut self) {
        self.level += 1;
        self.epoch += 1;
        self.frames.push(Frame {
            undo_len: self.undo.len(),
            cells_len: self.values.len(),
        });
    }

    /// Pops one level, restoring cells itself and handing every other undo
    /// record to `on_undo` in LIFO order. Cells created inside the popped
    /// frame are discarded.
    pub(crate) fn pop_level_with(&mut self, mut on_undo: impl FnMut(UndoOp)) {
        let frame = match self.frames.pop() {
            Some(f) => f,
            None => return,
        };
        while self.undo.len() > frame.undo_len {
            match self.undo.pop() {
                Some(UndoOp::Cell { cell, old }) => {
                    self.values[cell.0 as usize] = old;
                }
                Some(op) => on_undo(op),
                None => break,
            }
        }
        self.values.truncate(frame.cells_len);
        self.stamps.truncate(frame.cells_len);
        self.level -= 1;
        self.epoch += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restores_value_after_pop() {
        let mut t = Trail::new();
        let c = t.new_cell(3);
        t.push_level();
        t.set(c, 7);
        t.set(c, 9);
        assert_eq!(t.get(c), 9);
        t.pop_level_with(|_| {});
        assert_eq!(t.get(c), 3);
    }

    #[test]
    fn saves_once_per_level() {
        let mut t = Trail::new();
        let c = t.new_cell(0);
        t.push_level();
        t.set(c, 1);
        t.set(c, 2);
        assert_eq!(t.undo.len(), 1);
        t.push_level();
        t.set(c, 3);
        assert_eq!(t.undo.len(), 2);
        t.pop_level_with(|_| {});
        assert_eq!(t.get(c), 2);
        t.pop_level_with(|_| {});
        assert_eq!(t.get(c), 0);
    }

    #[test]
    fn root_writes_are_permanent() {
        let mut t = Trail::new();
        let c = t.new_cell(0);
        t.set(c, 5);
        t.push_level();
        t.pop_level_with(|_| {});
        assert_eq!(t.get(c), 5);
    }

    #[test]
    fn cells_created_in_frame_are_discarded() {
        let mut t = Trail::new();
        let _keep = t.new_cell(1);
        t.push_level();
        let temp = t.new_cell(2);
        assert_eq!(t.get(temp), 2);
        t.pop_level_with(|_| {});
        let again = t.new_cell(4);
        // The slot index was recycled.
        assert_eq!(temp.0, again.0);
        assert_eq!(t.get(again), 4);
    }

    #[test]
    fn reentered_level_saves_again() {
        let mut t = Trail::new();
        let c = t.new_cell(0);
        t.push_level();
        t.set(c, 1);
        t.pop_level_with(|_| {});
        t.push_level();
        t.set(c, 2);
        t.pop_level_with(|_| {});
        assert_eq!(t.get(c), 0);
    }
}
