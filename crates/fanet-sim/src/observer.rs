//! Swarm observer trait for progress reporting and data collection.

use fanet_core::{EventId, Step};
use fanet_protocol::Outcome;

/// Callbacks invoked by [`Swarm::run`][crate::Swarm::run] at key points in
/// the step loop.
///
/// All methods have default no-op implementations so implementors only need
/// to override what they care about.
///
/// # Example — progress printer
///
/// ```rust,ignore
/// struct ProgressPrinter { interval: u64 }
///
/// impl SwarmObserver for ProgressPrinter {
///     fn on_step_end(&mut self, step: Step, delivered: usize) {
///         if step.0 % self.interval == 0 {
///             println!("{step}: {delivered} deliveries");
///         }
///     }
/// }
/// ```
pub trait SwarmObserver {
    /// Called at the very start of each step, before any delivery.
    fn on_step_start(&mut self, _step: Step) {}

    /// Called at the end of each step.  `delivered` is the number of events
    /// that reached the depot during this step.
    fn on_step_end(&mut self, _step: Step, _delivered: usize) {}

    /// Called once per event when its fate is decided.  `delay` is the
    /// steps from injection to delivery; zero for expired events.
    fn on_event_resolved(&mut self, _event: EventId, _outcome: Outcome, _delay: u64) {}

    /// Called once after the final step completes.
    fn on_run_end(&mut self, _final_step: Step) {}
}

/// A [`SwarmObserver`] that does nothing.  Use when you need to call `run`
/// but don't want progress callbacks.
pub struct NoopObserver;

impl SwarmObserver for NoopObserver {}
