//! Adaptive relay selection via one-step off-policy Q-learning.
//!
//! # State and action model
//!
//! There is no state dimension: the Q-table is one scalar estimate per
//! possible relay, indexed by agent ID, sized to the full population at
//! construction and never resized.  The "action" is the relay chosen for one
//! delivery episode, self included (keeping the packet is a legal action).
//!
//! # Learning signal
//!
//! The simulator reports one feedback per episode when a packet's fate is
//! known (delivered to the depot, or expired).  The reward blends, in strict
//! priority order: direct delivery credit, a penalty for moving the packet
//! away from the depot, and a link-stability score combining smoothed
//! per-relay delivery quality (WMEWMA) with a speed-divergence term and the
//! best known hop count toward the depot.  The Q-update then bootstraps on
//! the chosen relay's own Q-table, as snapshotted from its most recent hello
//! at decision time:
//!
//!   Q[a] ← (1−α)·Q[a] + α·(reward + γ·max(snapshot))

use fanet_core::{AgentId, EventId, LearningConfig, Point, RoutingRng, Step};

use crate::error::{ProtocolError, ProtocolResult};
use crate::node::Node;
use crate::packet::Packet;
use crate::strategy::{Candidate, Outcome, RandomStrategy, RelayStrategy};
use crate::TableMap;

/// Floor on the speed ratio so the divergence term `exp(1/ratio)` stays
/// finite when one party hovers.
const MIN_SPEED_RATIO: f64 = 1e-3;

// ── Tracking records ─────────────────────────────────────────────────────────

/// Everything recorded at decision time, kept until feedback (or expiry).
#[derive(Clone, Debug)]
struct TakenAction {
    chosen: AgentId,
    /// Candidate-set size at decision time; bounds the quality window.
    n_candidates: usize,
    /// The chosen relay's own Q-table, from its hello payload (self if the
    /// action was "keep").
    relay_qtable: Vec<f64>,
    relay_speed: f32,
    relay_coords: Point,
    /// Sweep the record once `now` passes this without feedback.
    expires_after: Step,
}

/// Per-relay delivery counters feeding the link-quality estimator.
#[derive(Clone, Copy, Debug, Default)]
struct DeliveryCounters {
    attempts: u32,
    delivered: u32,
}

// ── QLearningStrategy ────────────────────────────────────────────────────────

pub struct QLearningStrategy {
    cfg: LearningConfig,
    depot_coords: Point,
    /// One scalar estimate per possible relay; length equals the population
    /// and is fixed for the lifetime of the strategy.
    qtable: Vec<f64>,
    taken_actions: TableMap<EventId, TakenAction>,
    delivery_ratio: TableMap<AgentId, DeliveryCounters>,
    /// WMEWMA sample history per relay.
    link_quality: TableMap<AgentId, Vec<f64>>,
    /// Exploration delegate.
    baseline: RandomStrategy,
    expiry_grace: u64,
}

impl QLearningStrategy {
    pub fn new(
        cfg: LearningConfig,
        n_agents: usize,
        depot_coords: Point,
        expiry_grace: u64,
    ) -> ProtocolResult<Self> {
        cfg.validate()?;
        if n_agents == 0 {
            return Err(ProtocolError::EmptyPopulation);
        }
        Ok(Self {
            cfg,
            depot_coords,
            qtable: vec![0.0; n_agents],
            taken_actions: TableMap::default(),
            delivery_ratio: TableMap::default(),
            link_quality: TableMap::default(),
            baseline: RandomStrategy,
            expiry_grace,
        })
    }

    /// Current Q-value estimate for `relay`.
    #[inline]
    pub fn q_value(&self, relay: AgentId) -> f64 {
        self.qtable[relay.index()]
    }

    /// Is a taken-action record live for `event`?
    pub fn tracks(&self, event: EventId) -> bool {
        self.taken_actions.contains_key(&event)
    }

    // ── Selection internals ───────────────────────────────────────────────

    /// Greedy pick over self plus all candidates.  Equal Q-values resolve to
    /// the lowest agent ID, making replayed runs deterministic.
    fn exploit(&self, node: &Node, candidates: &[Candidate<'_>]) -> AgentId {
        let mut best_id = node.id;
        let mut best_q = self.qtable[node.id.index()];
        for c in candidates {
            let q = self.qtable[c.id.index()];
            if q > best_q || (q == best_q && c.id < best_id) {
                best_id = c.id;
                best_q = q;
            }
        }
        best_id
    }

    /// Link stability toward the chosen relay, or `None` when the relay is
    /// absent from the deciding agent's neighbor table.
    fn link_stability(&mut self, node: &Node, act: &TakenAction, ratio: f64) -> Option<f64> {
        if !node.neighbors.contains_key(&act.chosen) {
            return None;
        }

        // WMEWMA: each sample folds the fresh delivery ratio into the
        // previous smoothed value.
        let alpha = self.cfg.link_quality_alpha;
        let hist = self.link_quality.entry(act.chosen).or_default();
        let next = match hist.last() {
            None => (1.0 - alpha) * ratio,
            Some(&prev) => prev * alpha + (1.0 - alpha) * ratio,
        };
        hist.push(next);

        // Average the history *before* this sample, truncated to the
        // candidate-set size recorded at decision time.
        let n = act.n_candidates.max(1);
        let prior = &hist[..hist.len() - 1];
        let window = if prior.len() > n {
            &prior[prior.len() - n..]
        } else {
            prior
        };
        let quality = window.iter().sum::<f64>() / n as f64;

        let w = self.cfg.quality_weight;
        let speed_term = if w < 1.0 {
            let (a, b) = (node.speed as f64, act.relay_speed as f64);
            let (lo, hi) = (a.min(b), a.max(b));
            let ratio = if hi > 0.0 { (lo / hi).max(MIN_SPEED_RATIO) } else { 1.0 };
            (1.0 / ratio).exp()
        } else {
            0.0
        };

        Some((1.0 - w) * speed_term + w * quality)
    }

    /// Reward assignment, in strict priority order.
    fn reward(
        &self,
        node: &Node,
        act: &TakenAction,
        holder: AgentId,
        outcome: Outcome,
        link_stability: Option<f64>,
    ) -> f64 {
        if outcome == Outcome::Delivered && act.chosen == holder {
            return self.cfg.max_reward;
        }

        // The packet moved away from the depot: penalise regardless of outcome.
        let own_distance = self.depot_coords.distance(node.coords);
        let relay_distance = self.depot_coords.distance(act.relay_coords);
        if own_distance < relay_distance {
            return self.cfg.min_reward;
        }

        match link_stability {
            Some(ls) => {
                let min_hops = node
                    .neighbors
                    .values()
                    .map(|info| info.hop_count_from_depot)
                    .min();
                let w = self.cfg.hop_weight;
                match min_hops {
                    None => (1.0 - w) * ls,
                    Some(h) => w * (1.0 / h.max(1) as f64).exp() + (1.0 - w) * ls,
                }
            }
            // No history toward this relay yet: optimistic default.
            None => self.cfg.max_reward,
        }
    }
}

impl RelayStrategy for QLearningStrategy {
    fn choose_relay(
        &mut self,
        node: &Node,
        candidates: &[Candidate<'_>],
        packet: &Packet,
        rng: &mut RoutingRng,
    ) -> Option<AgentId> {
        let event = packet.event_ref()?;

        let (chosen, pool_size) = if rng.draw() < self.cfg.exploration_prob {
            // Explore: prefer relays we know nothing about yet (Q still at
            // its initial 0), then delegate the pick to the baseline.
            let fresh: Vec<Candidate<'_>> = candidates
                .iter()
                .filter(|c| self.qtable[c.id.index()] == 0.0)
                .cloned()
                .collect();
            let pool: &[Candidate<'_>] = if fresh.is_empty() { candidates } else { &fresh };
            let picked = self.baseline.choose_relay(node, pool, packet, rng)?;
            (picked, pool.len())
        } else {
            (self.exploit(node, candidates), candidates.len())
        };

        // Snapshot the chosen relay's advertised state for the later update.
        let (relay_qtable, relay_speed, relay_coords) = if chosen == node.id {
            (self.qtable.clone(), node.speed, node.coords)
        } else {
            let c = candidates
                .iter()
                .find(|c| c.id == chosen)
                .expect("chosen relay comes from the candidate set");
            (
                c.qtable.map(<[f64]>::to_vec).unwrap_or_default(),
                c.speed,
                c.coords,
            )
        };

        self.taken_actions.insert(
            event.id,
            TakenAction {
                chosen,
                n_candidates: pool_size,
                relay_qtable,
                relay_speed,
                relay_coords,
                expires_after: event.deadline.offset(self.expiry_grace),
            },
        );

        if chosen == node.id {
            None
        } else {
            Some(chosen)
        }
    }

    fn on_feedback(
        &mut self,
        node: &Node,
        holder: AgentId,
        event: EventId,
        _delay: u64,
        outcome: Outcome,
    ) {
        // Missing record: already consumed, swept, or never tracked here.
        let Some(act) = self.taken_actions.remove(&event) else {
            return;
        };

        let counters = self.delivery_ratio.entry(act.chosen).or_default();
        counters.attempts += 1;
        if outcome == Outcome::Delivered {
            counters.delivered += 1;
        }
        // attempts >= 1 here, so the ratio is always well-defined.
        let ratio = counters.delivered as f64 / counters.attempts as f64;

        let link_stability = self.link_stability(node, &act, ratio);
        let reward = self.reward(node, &act, holder, outcome, link_stability);

        let bootstrap = act.relay_qtable.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let bootstrap = if bootstrap.is_finite() { bootstrap } else { 0.0 };

        let lr = self.cfg.learning_rate;
        let q = &mut self.qtable[act.chosen.index()];
        *q = (1.0 - lr) * *q + lr * (reward + self.cfg.discount_factor * bootstrap);
    }

    fn hello_payload(&self) -> Option<Vec<f64>> {
        Some(self.qtable.clone())
    }

    fn sweep_expired(&mut self, now: Step) {
        self.taken_actions.retain(|_, act| now <= act.expires_after);
    }
}
