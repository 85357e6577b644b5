//! Integer variables, boolean literals and watcher lists.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::domain::Domain;
use crate::queue::{DemonId, VarEvent};

/// Stable identity of an integer variable. Variables are created by the
/// solver and live until the solver is dropped (or the creating search level
/// is popped, for variables created during search).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub(crate) u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for VarId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// A boolean literal: a 0/1 variable or its negation. Used for presence
/// literals of optional variables and for reified constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lit {
    pub(crate) var: VarId,
    pub(crate) negated: bool,
}

impl Lit {
    pub fn pos(var: VarId) -> Lit {
        Lit { var, negated: false }
    }

    pub fn neg(var: VarId) -> Lit {
        Lit { var, negated: true }
    }

    pub fn var(self) -> VarId {
        self.var
    }

    /// The value of the underlying variable that makes this literal true.
    pub fn true_value(self) -> i64 {
        if self.negated { 0 } else { 1 }
    }
}

impl std::ops::Not for Lit {
    type Output = Lit;

    fn not(self) -> Lit {
        Lit { var: self.var, negated: !self.negated }
    }
}

/// Watcher FIFO for one event class: demons notified immediately (at their
/// own priority) and demons whose execution is delayed behind cheap
/// propagation.
#[derive(Debug, Default)]
pub(crate) struct WatchList {
    pub immediate: SmallVec<[DemonId; 4]>,
    pub delayed: SmallVec<[DemonId; 4]>,
}

#[derive(Debug)]
pub(crate) struct VarData {
    pub name: String,
    pub dom: Domain,
    /// Watcher lists indexed by `VarEvent`.
    pub watchers: [WatchList; 3],
    /// Bound snapshots captured the first time the variable is touched in a
    /// propagation pass.
    pub old_min: i64,
    pub old_max: i64,
    /// Values removed from the interior of the domain during the pass
    /// stamped in `pass_stamp`; stale lists are cleared lazily.
    pub holes: Vec<i64>,
    pub pass_stamp: u64,
    /// Presence literal of an optional variable. When it is false the
    /// variable is absent and mutations are vacuous; a forced contradiction
    /// negates the literal instead of failing.
    pub presence: Option<Lit>,
    pub is_bool: bool,
}

impl VarData {
    pub(crate) fn watch_list(&mut self, event: VarEvent) -> &mut WatchList {
        &mut self.watchers[event as usize]
    }
}

/// Arena of all variables, owned by the solver.
#[derive(Debug, Default)]
pub(crate) struct VarStore {
    pub(crate) data: Vec<VarData>,
}

impl VarStore {
    pub fn push(&mut self, name: String, dom: Domain, old_min: i64, old_max: i64) -> VarId {
        let id = VarId(self.data.len() as u32);
        self.data.push(VarData {
            name,
            dom,
            watchers: Default::default(),
            old_min,
            old_max,
            holes: Vec::new(),
            pass_stamp: 0,
            presence: None,
            is_bool: false,
        });
        id
    }

    #[inline]
    pub fn get(&self, v: VarId) -> &VarData {
        &self.data[v.index()]
    }

    #[inline]
    pub fn get_mut(&mut self, v: VarId) -> &mut VarData {
        &mut self.data[v.index()]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }
}
