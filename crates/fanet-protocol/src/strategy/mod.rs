//! Pluggable relay-selection strategies.
//!
//! The routing engine holds a strategy value and invokes it once per buffered
//! data packet per send opportunity.  A strategy may decline to relay by
//! returning `None` — the packet stays buffered and the periodic send cycle
//! re-attempts next opportunity.

use fanet_core::{AgentId, EventId, Point, RoutingRng, Step};

use crate::node::Node;
use crate::packet::Packet;

mod geographic;
mod qlearning;
mod random;

pub use geographic::GeographicStrategy;
pub use qlearning::QLearningStrategy;
pub use random::RandomStrategy;

// ── Candidate ────────────────────────────────────────────────────────────────

/// One relay candidate, assembled from a non-stale hello.
#[derive(Clone, Debug)]
pub struct Candidate<'a> {
    pub id: AgentId,
    pub coords: Point,
    pub speed: f32,
    /// The candidate's advertised Q-table snapshot, when its hello carried one.
    pub qtable: Option<&'a [f64]>,
}

// ── Outcome ──────────────────────────────────────────────────────────────────

/// The fate of a tracked delivery episode, reported by the simulator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The packet reached the depot.
    Delivered,
    /// The event deadline passed without delivery.
    Expired,
}

// ── RelayStrategy ────────────────────────────────────────────────────────────

/// The relay-selection capability the engine plugs in.
///
/// Only [`choose_relay`][Self::choose_relay] is required; the feedback,
/// hello-payload, and sweep hooks have no-op defaults so stateless strategies
/// stay one-liners.
pub trait RelayStrategy {
    /// Pick a relay for `packet` from `candidates`, or `None` to keep it.
    ///
    /// `candidates` is never empty when the engine calls this.
    fn choose_relay(
        &mut self,
        node: &Node,
        candidates: &[Candidate<'_>],
        packet: &Packet,
        rng: &mut RoutingRng,
    ) -> Option<AgentId>;

    /// Delivery feedback for `event`, reported once its fate is known.
    ///
    /// `holder` is the agent that held the packet when the fate was decided.
    /// Feedback for an untracked event is a no-op.
    fn on_feedback(
        &mut self,
        _node: &Node,
        _holder: AgentId,
        _event: EventId,
        _delay: u64,
        _outcome: Outcome,
    ) {
    }

    /// Strategy-specific payload to attach to outgoing hellos.
    fn hello_payload(&self) -> Option<Vec<f64>> {
        None
    }

    /// Drop tracking state for episodes whose deadline passed without
    /// feedback, bounding memory growth.  Called once per step.
    fn sweep_expired(&mut self, _now: Step) {}
}
