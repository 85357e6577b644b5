//! Search limits and restart monitors.
//!
//! Limits are search monitors that watch counters at every periodic check
//! and request a cooperative stop when crossed; the search unwinds at the
//! next safe point and runs `exit_search` for every monitor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::monitors::SearchMonitor;
use crate::solver::Solver;
use crate::vars::VarId;
use crate::Status;

/// A monitor that can report whether its threshold has been crossed; used
/// for OR-composition.
pub trait Limit: SearchMonitor {
    fn crossed(&mut self, s: &mut Solver) -> bool;
}

/// Time / branch / failure / solution limit. In cumulative mode the
/// counters carry over across repeated solves instead of resetting on each
/// `enter_search`.
pub struct RegularLimit {
    duration: Option<Duration>,
    branches: Option<u64>,
    failures: Option<u64>,
    solutions: Option<u64>,
    cumulative: bool,
    started: bool,
    start_time: Instant,
    base_branches: u64,
    base_failures: u64,
    base_solutions: u64,
}

impl RegularLimit {
    pub fn new(
        duration: Option<Duration>,
        branches: Option<u64>,
        failures: Option<u64>,
        solutions: Option<u64>,
    ) -> Self {
        Self {
            duration,
            branches,
            failures,
            solutions,
            cumulative: false,
            started: false,
            start_time: Instant::now(),
            base_branches: 0,
            base_failures: 0,
            base_solutions: 0,
        }
    }

    pub fn time_limit(d: Duration) -> Self {
        Self::new(Some(d), None, None, None)
    }

    pub fn branch_limit(n: u64) -> Self {
        Self::new(None, Some(n), None, None)
    }

    pub fn failure_limit(n: u64) -> Self {
        Self::new(None, None, Some(n), None)
    }

    pub fn solution_limit(n: u64) -> Self {
        Self::new(None, None, None, Some(n))
    }

    /// Keeps counting across repeated solves.
    pub fn cumulative(mut self) -> Self {
        self.cumulative = true;
        self
    }
}

impl SearchMonitor for RegularLimit {
    fn enter_search(&mut self, s: &mut Solver) {
        if !self.cumulative || !self.started {
            let stats = s.stats();
            self.start_time = Instant::now();
            self.base_branches = stats.branches;
            self.base_failures = stats.failures;
            self.base_solutions = stats.solutions;
        }
        self.started = true;
    }

    fn periodic_check(&mut self, s: &mut Solver) {
        if self.crossed(s) {
            s.request_stop(Status::LimitReached);
        }
    }

    fn at_solution(&mut self, s: &mut Solver) -> bool {
        // Solution limits must fire on the solution itself, not on the next
        // branch.
        if self.crossed(s) {
            s.request_stop(Status::LimitReached);
        }
        false
    }
}

impl Limit for RegularLimit {
    fn crossed(&mut self, s: &mut Solver) -> bool {
        let stats = s.stats();
        if let Some(d) = self.duration {
            if self.start_time.elapsed() >= d {
                return true;
            }
        }
        if let Some(n) = self.branches {
            if stats.branches - self.base_branches >= n {
                return true;
            }
        }
        if let Some(n) = self.failures {
            if stats.failures - self.base_failures >= n {
                return true;
            }
        }
        if let Some(n) = self.solutions {
            if stats.solutions - self.base_solutions >= n {
                return true;
            }
        }
        false
    }
}

/// Fires when either of its two sub-limits fires.
pub struct OrLimit {
    left: Box<dyn Limit>,
    right: Box<dyn Limit>,
}

impl OrLimit {
    pub fn new(left: Box<dyn Limit>, right: Box<dyn Limit>) -> Self {
        Self { left, right }
    }
}

impl SearchMonitor for OrLimit {
    fn enter_search(&mut self, s: &mut Solver) {
        self.left.enter_search(s);
        self.right.enter_search(s);
    }

    fn periodic_check(&mut self, s: &mut Solver) {
        if self.crossed(s) {
            s.request_stop(Status::LimitReached);
        }
    }

    fn at_solution(&mut self, s: &mut Solver) -> bool {
        let _ = self.left.at_solution(s);
        let _ = self.right.at_solution(s);
        false
    }
}

impl Limit for OrLimit {
    fn crossed(&mut self, s: &mut Solver) -> bool {
        self.left.crossed(s) || self.right.crossed(s)
    }
}

/// Stops the search when a user predicate returns true.
pub struct CustomLimit {
    check: Box<dyn FnMut(&mut Solver) -> bool>,
}

impl CustomLimit {
    pub fn new(check: Box<dyn FnMut(&mut Solver) -> bool>) -> Self {
        Self { check }
    }
}

impl SearchMonitor for CustomLimit {
    fn periodic_check(&mut self, s: &mut Solver) {
        if (self.check)(s) {
            s.request_stop(Status::LimitReached);
        }
    }
}

impl Limit for CustomLimit {
    fn crossed(&mut self, s: &mut Solver) -> bool {
        (self.check)(s)
    }
}

/// Stops when the objective stops improving fast enough: the average
/// improvement over a sliding window of accepted solutions falls below a
/// threshold.
pub struct ImprovementLimit {
    objective: VarId,
    maximize: bool,
    window: usize,
    min_average_improvement: f64,
    history: Vec<i64>,
}

impl ImprovementLimit {
    pub fn new(objective: VarId, maximize: bool, window: usize, min_average_improvement: f64) -> Self {
        Self {
            objective,
            maximize,
            window: window.max(2),
            min_average_improvement,
            history: Vec::new(),
        }
    }
}

impl SearchMonitor for ImprovementLimit {
    fn enter_search(&mut self, _s: &mut Solver) {
        self.history.clear();
    }

    fn at_solution(&mut self, s: &mut Solver) -> bool {
        let value = s.value(self.objective);
        let internal = if self.maximize { -value } else { value };
        self.history.push(internal);
        if self.history.len() > self.window {
            self.history.remove(0);
        }
        if self.history.len() == self.window {
            let first = self.history[0] as f64;
            let last = self.history[self.window - 1] as f64;
            let rate = (first - last) / (self.window as f64 - 1.0);
            if rate < self.min_average_improvement {
                s.request_stop(Status::LimitReached);
            }
        }
        false
    }
}

impl Limit for ImprovementLimit {
    fn crossed(&mut self, _s: &mut Solver) -> bool {
        false
    }
}

/// Cooperative interruption: a shared flag checked at every periodic check.
///
/// # Note
/// [`InterruptLimit::new`] installs a global Ctrl-C handler and can only be
/// constructed once per process; use [`InterruptLimit::from_flag`] for
/// programmatic interruption.
pub struct InterruptLimit {
    interrupted: Arc<AtomicBool>,
}

impl InterruptLimit {
    pub fn new() -> Self {
        let interrupted = Arc::new(AtomicBool::new(false));
        let handler_flag = interrupted.clone();
        ctrlc::set_handler(move || {
            handler_flag.store(true, Ordering::SeqCst);
        })
        .expect("Error setting Ctrl-C handler");
        Self { interrupted }
    }

    pub fn from_flag(interrupted: Arc<AtomicBool>) -> Self {
        Self { interrupted }
    }

    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn flag(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }
}

impl SearchMonitor for InterruptLimit {
    fn periodic_check(&mut self, s: &mut Solver) {
        if self.interrupted.load(Ordering::SeqCst) {
            s.request_stop(Status::Interrupted);
        }
    }
}

impl Limit for InterruptLimit {
    fn crossed(&mut self, _s: &mut Solver) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

// ---------- Restarts ----------

/// The Luby sequence: 1 1 2 1 1 2 4 1 1 2 1 1 2 4 8 ...
fn luby(mut i: u64) -> u64 {
    loop {
        let mut k = 1u64;
        while (1u64 << k) - 1 < i {
            k += 1;
        }
        if (1u64 << k) - 1 == i {
            return 1u64 << (k - 1);
        }
        i -= (1u64 << (k - 1)) - 1;
    }
}

/// Restarts the search from the top every time the fail count reaches the
/// next step of the Luby sequence times the scale factor.
pub struct LubyRestart {
    scale_factor: u64,
    iteration: u64,
    current_fails: u64,
    next_step: u64,
}

impl LubyRestart {
    pub fn new(scale_factor: u64) -> Self {
        debug_assert!(scale_factor >= 1);
        Self {
            scale_factor,
            iteration: 1,
            current_fails: 0,
            next_step: scale_factor,
        }
    }
}

impl SearchMonitor for LubyRestart {
    fn begin_fail(&mut self, s: &mut Solver) {
        self.current_fails += 1;
        if self.current_fails >= self.next_step {
            self.current_fails = 0;
            self.iteration += 1;
            self.next_step = luby(self.iteration) * self.scale_factor;
            s.restart_current_search();
        }
    }
}

/// Restarts the search every `frequency` failures.
pub struct ConstantRestart {
    frequency: u64,
    current_fails: u64,
}

impl ConstantRestart {
    pub fn new(frequency: u64) -> Self {
        debug_assert!(frequency >= 1);
        Self { frequency, current_fails: 0 }
    }
}

impl SearchMonitor for ConstantRestart {
    fn begin_fail(&mut self, s: &mut Solver) {
        self.current_fails += 1;
        if self.current_fails >= self.frequency {
            self.current_fails = 0;
            s.restart_current_search();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn luby_sequence_prefix() {
        let prefix: Vec<u64> = (1..=15).map(luby).collect();
        assert_eq!(prefix, vec![1, 1, 2, 1, 1, 2, 4, 1, 1, 2, 1, 1, 2, 4, 8]);
    }

    #[cfg(unix)]
    mod platform {
        pub fn send_sigint() {
            use nix::sys::signal::{self, Signal};
            use nix::unistd::Pid;

            let pid = std::process::id() as i32;
            signal::kill(Pid::from_raw(pid), Signal::SIGINT).expect("Failed to send SIGINT");
        }
    }

    #[cfg(unix)]
    #[test]
    fn interrupt_limit_sees_sigint() {
        let limit = InterruptLimit::new();
        std::thread::spawn(|| {
            std::thread::sleep(std::time::Duration::from_millis(200));
            platform::send_sigint();
        });
        loop {
            if limit.interrupted.load(Ordering::SeqCst) {
                break;
            }
        }
    }
}
