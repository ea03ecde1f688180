//! Simulation time model.
//!
//! # Design
//!
//! Time is a monotonically increasing `Step` counter owned by the external
//! scheduler.  The routing stack never keeps timers of its own: hello
//! cadence, retransmission windows, and event deadlines are all expressed as
//! modular arithmetic or comparisons on the step the caller supplies.
//!
//! Using an integer step as the canonical time unit means all protocol
//! arithmetic is exact (no floating-point drift) and comparisons are O(1).

use std::fmt;

// ── Step ─────────────────────────────────────────────────────────────────────

/// An absolute simulation step counter.
///
/// Stored as `u64`; at one step per simulated millisecond a u64 lasts far
/// longer than any conceivable mission.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Step(pub u64);

impl Step {
    pub const ZERO: Step = Step(0);

    /// Return the step `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Step {
        Step(self.0 + n)
    }

    /// Steps elapsed from `earlier` to `self`.
    ///
    /// # Panics
    /// Panics in debug mode if `earlier > self`.
    #[inline]
    pub fn since(self, earlier: Step) -> u64 {
        self.0 - earlier.0
    }

    /// `true` on steps that are a multiple of `interval` (interval 0 never
    /// matches — a disabled periodic action).
    #[inline]
    pub fn on_interval(self, interval: u64) -> bool {
        interval != 0 && self.0 % interval == 0
    }
}

impl std::ops::Add<u64> for Step {
    type Output = Step;
    #[inline]
    fn add(self, rhs: u64) -> Step {
        Step(self.0 + rhs)
    }
}

impl std::ops::Sub for Step {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Step) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

// ── StepClock ────────────────────────────────────────────────────────────────

/// The scheduler-owned clock.  Cheap to copy; holds no heap data.
#[derive(Clone, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StepClock {
    /// The current step — advanced by `StepClock::advance()` each iteration.
    pub current: Step,
}

impl StepClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by one step.
    #[inline]
    pub fn advance(&mut self) {
        self.current = Step(self.current.0 + 1);
    }
}
