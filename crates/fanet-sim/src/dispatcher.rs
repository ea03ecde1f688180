//! `NetworkDispatcher` — step-scheduled packet transport between agents.
//!
//! # Why this exists
//!
//! The protocol engine hands every outgoing packet to a [`Medium`] together
//! with its delivery step; nothing in the protocol crate ever moves a packet
//! between agents directly.  The dispatcher is the simulation-side
//! implementation of that trait: a sparse `BTreeMap<Step, Vec<Transmission>>`
//! queue drained once per step, so per-step work is O(due transmissions)
//! instead of O(everything in flight).
//!
//! An optional uniform drop probability models lossy transport *above* the
//! channel model — useful for stress-testing retransmission behavior without
//! touching the per-agent channel configuration.

use std::collections::BTreeMap;

use fanet_core::{AgentId, SimRng, Step};
use fanet_protocol::{Medium, Packet};

/// One in-flight packet: payload plus addressing and its scheduled delivery.
#[derive(Clone, Debug)]
pub struct Transmission {
    pub packet:     Packet,
    pub src:        AgentId,
    pub dst:        AgentId,
    pub deliver_at: Step,
}

// ── NetworkDispatcher ────────────────────────────────────────────────────────

/// The simulation's packet transport.
#[derive(Debug)]
pub struct NetworkDispatcher {
    queue: BTreeMap<Step, Vec<Transmission>>,
    /// Cached total entry count for O(1) `in_flight()`.
    total: usize,
    /// Probability that an accepted transmission is silently discarded.
    drop_prob: f64,
    rng: SimRng,
}

impl NetworkDispatcher {
    pub fn new(rng: SimRng) -> Self {
        Self {
            queue: BTreeMap::new(),
            total: 0,
            drop_prob: 0.0,
            rng,
        }
    }

    /// Discard each accepted transmission with probability `p`.
    pub fn with_drop_probability(mut self, p: f64) -> Self {
        self.drop_prob = p.clamp(0.0, 1.0);
        self
    }

    /// Remove and return every transmission due at or before `now`, in
    /// delivery-step order.
    ///
    /// Late entries (deliver_at < now) only exist if a step was skipped;
    /// draining them anyway keeps the queue from leaking.
    pub fn drain_due(&mut self, now: Step) -> Vec<Transmission> {
        let later = self.queue.split_off(&now.offset(1));
        let due = std::mem::replace(&mut self.queue, later);

        let drained: Vec<Transmission> = due.into_values().flatten().collect();
        self.total -= drained.len();
        drained
    }

    /// Total transmissions queued for future steps.
    pub fn in_flight(&self) -> usize {
        self.total
    }
}

impl Medium for NetworkDispatcher {
    fn send(&mut self, packet: Packet, src: AgentId, dst: AgentId, deliver_at: Step) {
        if self.drop_prob > 0.0 && self.rng.gen_bool(self.drop_prob) {
            return;
        }
        self.queue.entry(deliver_at).or_default().push(Transmission {
            packet,
            src,
            dst,
            deliver_at,
        });
        self.total += 1;
    }
}
