//! Cumulative resource and no-overlap constraints.
//!
//! Time-table filtering: the profile of compulsory parts is swept once per
//! propagation; overloads fail, and tasks that cannot fit next to the
//! profile have their start windows tightened from both sides.

use crate::queue::{DemonPriority, PropId, VarEvent};
use crate::store::Store;
use crate::vars::VarId;
use crate::{Conflict, PropResult};

use super::{watch_all, Propagator};

#[derive(Debug, Clone, Copy)]
pub(crate) struct Task {
    pub start: VarId,
    pub duration: i64,
    pub demand: i64,
}

/// A maximal constant-height segment of the compulsory-part profile.
#[derive(Debug, Clone, Copy)]
struct Segment {
    from: i64,
    to: i64,
    height: i64,
}

pub(crate) struct Cumulative {
    tasks: Vec<Task>,
    capacity: i64,
}

impl Cumulative {
    pub fn new(tasks: Vec<Task>, capacity: i64) -> Self {
        Self { tasks, capacity }
    }

    /// Builds the compulsory-part profile by sweeping start/end events.
    fn profile(&self, s: &Store, skip: Option<usize>) -> Vec<Segment> {
        let mut events: Vec<(i64, i64)> = Vec::new();
        for (i, t) in self.tasks.iter().enumerate() {
            if Some(i) == skip || t.duration <= 0 || t.demand <= 0 {
                continue;
            }
            let lst = s.max(t.start);
            let ect = s.min(t.start) + t.duration;
            if lst < ect {
                events.push((lst, t.demand));
                events.push((ect, -t.demand));
            }
        }
        events.sort_unstable();
        let mut segments = Vec::new();
        let mut height = 0i64;
        let mut prev = i64::MIN;
        for (time, delta) in events {
            if height > 0 && time > prev {
                segments.push(Segment { from: prev, to: time, height });
            }
            if time > prev {
                prev = time;
            }
            height += delta;
        }
        segments
    }

    fn check_overload(&self, s: &Store) -> PropResult {
        for seg in self.profile(s, None) {
            if seg.height > self.capacity {
                return Err(Conflict);
            }
        }
        Ok(())
    }

    /// Pushes the earliest start of task `i` right past profile segments it
    /// cannot sit on, and its latest start left symmetrically.
    fn filter_task(&self, s: &mut Store, i: usize) -> PropResult {
        let task = self.tasks[i];
        if task.duration <= 0 || task.demand <= 0 {
            return Ok(());
        }
        let profile = self.profile(s, Some(i));
        // Forward pass on the earliest start.
        let mut est = s.min(task.start);
        let mut moved = true;
        while moved {
            moved = false;
            for seg in &profile {
                let overlaps = seg.from < est + task.duration && seg.to > est;
                if overlaps && seg.height + task.demand > self.capacity {
                    est = seg.to;
                    moved = true;
                }
            }
        }
        s.set_min(task.start, est)?;
        // Backward pass on the latest end.
        let mut lct = s.max(task.start) + task.duration;
        moved = true;
        while moved {
            moved = false;
            for seg in profile.iter().rev() {
                let overlaps = seg.from < lct && seg.to > lct - task.duration;
                if overlaps && seg.height + task.demand > self.capacity {
                    lct = seg.from;
                    moved = true;
                }
            }
        }
        s.set_max(task.start, lct - task.duration)
    }
}

impl Propagator for Cumulative {
    fn post(&mut self, s: &mut Store, id: PropId) -> PropResult {
        let starts: Vec<VarId> = self.tasks.iter().map(|t| t.start).collect();
        watch_all(s, id, 0, &starts, VarEvent::Range, DemonPriority::Delayed);
        Ok(())
    }

    fn initial_propagate(&mut self, s: &mut Store) -> PropResult {
        self.check_overload(s)?;
        for i in 0..self.tasks.len() {
            self.filter_task(s, i)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cumulative"
    }
}

/// No-overlap over intervals: cumulative with unit demands and capacity 1.
pub(crate) fn no_overlap(starts: Vec<VarId>, durations: Vec<i64>) -> Cumulative {
    let tasks = starts
        .into_iter()
        .zip(durations)
        .map(|(start, duration)| Task { start, duration, demand: 1 })
        .collect();
    Cumulative::new(tasks, 1)
}
