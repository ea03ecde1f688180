//! The per-agent routing protocol state machine.
//!
//! # Per-step contract
//!
//! The external scheduler, once per step and per agent:
//!
//! 1. calls [`RoutingEngine::on_receive`] for every packet the medium
//!    delivered to this agent this step;
//! 2. calls [`RoutingEngine::routing`] — hello emission, the send cycle, and
//!    step close-out;
//! 3. calls [`RoutingEngine::feedback`] whenever the fate of a tracked
//!    delivery episode became known.
//!
//! The engine keeps only transient per-agent state (`hello_messages`, the
//! transmission counter, the one-step reception latch); everything an agent
//! persists across the run lives in [`Node`] or inside the strategy.

use fanet_core::{AgentId, EventId, Point, ProtocolConfig, RoutingRng, Step};

use crate::channel::ChannelModel;
use crate::depot::Depot;
use crate::medium::{broadcast, unicast, Medium};
use crate::node::{Node, PeerView};
use crate::packet::{
    AckPacket, DpackPacket, HelloPacket, LinkInfo, NeighborTablePacket, Packet,
};
use crate::strategy::{Candidate, Outcome, RelayStrategy};
use crate::TableMap;

// ── ProtoContext ─────────────────────────────────────────────────────────────

/// Read-only world facts shared by every routing call within one step.
#[derive(Clone, Debug)]
pub struct ProtoContext<'a> {
    pub depot_id: AgentId,
    pub depot_coords: Point,
    pub cfg: &'a ProtocolConfig,
}

// ── EngineStats ──────────────────────────────────────────────────────────────

/// Counters an observer can read after (or during) a run.
#[derive(Clone, Copy, Debug, Default)]
pub struct EngineStats {
    /// Relay transmissions attempted (one per buffered packet per send
    /// opportunity, whether or not the strategy declined).
    pub relay_attempts: u64,
    /// Sum and count of candidate-set sizes, for the mean-relays metric.
    pub candidate_sum: u64,
    pub candidate_samples: u64,
}

impl EngineStats {
    pub fn mean_candidates(&self) -> f64 {
        if self.candidate_samples == 0 {
            0.0
        } else {
            self.candidate_sum as f64 / self.candidate_samples as f64
        }
    }
}

// ── RoutingEngine ────────────────────────────────────────────────────────────

/// One agent's routing protocol instance.  Created once per agent for the
/// whole run; its strategy state persists and is never reset.
#[derive(Debug)]
pub struct RoutingEngine<S: RelayStrategy> {
    /// Most recent hello per known peer.  Overwritten on arrival; stale
    /// entries expire by age and are never explicitly deleted.
    hello_messages: TableMap<AgentId, HelloPacket>,

    /// Relay attempts since the buffer last drained completely.
    current_n_transmission: u32,

    /// One-step latch: set when a data packet was just received, so the agent
    /// does not also transmit in the same step.  Cleared at step close.
    no_transmission: bool,

    channel: ChannelModel,
    strategy: S,
    pub stats: EngineStats,
}

impl<S: RelayStrategy> RoutingEngine<S> {
    /// Build the engine for one agent.  The Gaussian bucket table is
    /// precomputed here, once, from the agent's communication range.
    pub fn new(cfg: &ProtocolConfig, comm_range: f32, strategy: S) -> Self {
        Self {
            hello_messages: TableMap::default(),
            current_n_transmission: 0,
            no_transmission: false,
            channel: ChannelModel::new(cfg, comm_range),
            strategy,
            stats: EngineStats::default(),
        }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn channel(&self) -> &ChannelModel {
        &self.channel
    }

    pub fn hello_count(&self) -> usize {
        self.hello_messages.len()
    }

    // ── Reception dispatch ────────────────────────────────────────────────

    /// React to one delivered packet.  Exhaustive over the packet set; every
    /// arm is a small, self-contained transition.
    #[allow(clippy::too_many_arguments)]
    pub fn on_receive<M: Medium>(
        &mut self,
        node: &mut Node,
        from: AgentId,
        packet: Packet,
        peers: &[PeerView],
        ctx: &ProtoContext<'_>,
        now: Step,
        medium: &mut M,
        rng: &mut RoutingRng,
    ) {
        match packet {
            Packet::Hello(hello) => {
                self.hello_messages.insert(hello.src, hello);
            }

            Packet::Data(data) => {
                // Latch: we just took custody, don't also send this step.
                self.no_transmission = true;
                let ack = AckPacket {
                    acked: data.id,
                    src: node.id,
                    created: now,
                };
                node.buffer.push(Packet::Data(data));
                unicast(
                    &self.channel, node.view(), from, peers,
                    Packet::Ack(ack), ctx.cfg, now, medium, rng,
                );
            }

            Packet::Ack(ack) => {
                node.remove_packet(ack.acked);
                if node.buffer_is_empty() {
                    self.current_n_transmission = 0;
                    node.routing_to_depot = false;
                }
            }

            Packet::Discovery(disc) => {
                self.on_discovery(node, from, disc, peers, ctx, now, medium, rng);
            }

            Packet::Dpack(dpack) => {
                // A DPACK about an expired event is a normal race between
                // propagation delay and event lifetime: ignore it.
                if dpack.event.expired(now) {
                    return;
                }
                node.temp_neighbors.insert(dpack.src, dpack.info);

                // Immediate forward-and-reply: everything accumulated so far
                // goes straight up to this event's forward parent.
                if let Some(&parent) = node.discovery_parent.get(&dpack.event.id) {
                    let table = NeighborTablePacket {
                        id: node.alloc_packet_id(),
                        sender: node.id,
                        event: dpack.event,
                        info: node.temp_neighbors.clone(),
                        resend: true,
                        created: now,
                    };
                    unicast(
                        &self.channel, node.view(), parent, peers,
                        Packet::NeighborTable(table), ctx.cfg, now, medium, rng,
                    );
                }
            }

            Packet::NeighborTable(table) => {
                for (agent, info) in &table.info {
                    node.neighbors.insert(*agent, *info);
                }
                if table.resend {
                    // Exactly one echo, flag cleared, so the chain terminates.
                    let reply = table.reply(
                        node.alloc_packet_id(),
                        node.id,
                        node.neighbors.clone(),
                        now,
                    );
                    unicast(
                        &self.channel, node.view(), table.sender, peers,
                        Packet::NeighborTable(reply), ctx.cfg, now, medium, rng,
                    );
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn on_discovery<M: Medium>(
        &mut self,
        node: &mut Node,
        from: AgentId,
        disc: crate::packet::DiscoveryPacket,
        peers: &[PeerView],
        ctx: &ProtoContext<'_>,
        now: Step,
        medium: &mut M,
        rng: &mut RoutingRng,
    ) {
        // At most once per agent per event.
        if !node.seen_events.insert(disc.event.id) {
            return;
        }
        node.discovery_parent.insert(disc.event.id, from);
        node.temp_neighbors.clear();

        // Stamp our hop on a fresh value; the instance other receivers got
        // stays untouched.
        let disc = disc.hopped();

        // Notify the sender of our link info — unless the sender is the
        // depot, which learns through the neighbor-table chain instead.
        if from != ctx.depot_id {
            let dpack = DpackPacket {
                src: node.id,
                event: disc.event,
                info: LinkInfo {
                    speed: node.speed,
                    location: node.coords,
                    hop_count_from_depot: disc.hop_count,
                },
                created: now,
            };
            unicast(
                &self.channel, node.view(), from, peers,
                Packet::Dpack(dpack), ctx.cfg, now, medium, rng,
            );
        }

        // Flood onward under our own name.
        let forwarded = disc.from_source(node.id);
        broadcast(
            &self.channel, node.view(), ctx.depot_id, peers,
            &Packet::Discovery(forwarded), ctx.cfg, now, medium, rng,
        );
    }

    // ── Per-step send cycle ───────────────────────────────────────────────

    /// One full routing pass: identify neighbors, attempt relay, close the
    /// step.
    #[allow(clippy::too_many_arguments)]
    pub fn routing<M: Medium>(
        &mut self,
        node: &mut Node,
        depot: &mut Depot,
        peers: &[PeerView],
        ctx: &ProtoContext<'_>,
        now: Step,
        medium: &mut M,
        rng: &mut RoutingRng,
    ) {
        self.identification(node, peers, ctx, now, medium, rng);
        self.send_packets(node, depot, peers, ctx, now, medium, rng);
        self.routing_close(now);
    }

    /// Periodic hello broadcast, carrying the strategy payload when the
    /// active strategy needs neighbor-side bookkeeping.
    fn identification<M: Medium>(
        &mut self,
        node: &Node,
        peers: &[PeerView],
        ctx: &ProtoContext<'_>,
        now: Step,
        medium: &mut M,
        rng: &mut RoutingRng,
    ) {
        if !now.on_interval(ctx.cfg.hello_interval) {
            return;
        }
        let hello = HelloPacket {
            src: node.id,
            position: node.coords,
            speed: node.speed,
            next_target: node.next_target,
            created: now,
            qtable: self.strategy.hello_payload(),
        };
        broadcast(
            &self.channel, node.view(), ctx.depot_id, peers,
            &Packet::Hello(hello), ctx.cfg, now, medium, rng,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn send_packets<M: Medium>(
        &mut self,
        node: &mut Node,
        depot: &mut Depot,
        peers: &[PeerView],
        ctx: &ProtoContext<'_>,
        now: Step,
        medium: &mut M,
        rng: &mut RoutingRng,
    ) {
        if self.no_transmission || node.buffer_is_empty() {
            return;
        }

        // Inside depot range: hand the whole buffer over and stop routing.
        if node.coords.distance(ctx.depot_coords) <= ctx.cfg.depot_comm_range {
            depot.accept_transfer(node.id, node.drain_buffer(), now);
            node.routing_to_depot = false;
            self.current_n_transmission = 0;
            return;
        }

        if !now.on_interval(ctx.cfg.retransmission_interval) {
            return;
        }

        // Relay candidates: peers with a sufficiently fresh hello.
        let candidates: Vec<Candidate<'_>> = self
            .hello_messages
            .values()
            .filter(|h| now.since(h.created) <= ctx.cfg.stale_hello_age)
            .map(|h| Candidate {
                id: h.src,
                coords: h.position,
                speed: h.speed,
                qtable: h.qtable.as_deref(),
            })
            .collect();
        if candidates.is_empty() {
            return;
        }

        // One strategy invocation per buffered packet; collect the sends so
        // the candidate borrows end before we transmit.
        let mut sends: Vec<(Packet, AgentId)> = Vec::new();
        for packet in &node.buffer {
            self.stats.candidate_sum += candidates.len() as u64;
            self.stats.candidate_samples += 1;
            self.stats.relay_attempts += 1;

            if let Some(relay) = self.strategy.choose_relay(node, &candidates, packet, rng) {
                sends.push((packet.clone(), relay));
            }
            self.current_n_transmission += 1;
        }
        drop(candidates);

        for (packet, relay) in sends {
            unicast(
                &self.channel, node.view(), relay, peers,
                packet, ctx.cfg, now, medium, rng,
            );
        }
    }

    /// Close the step: clear the reception latch and bound tracking state.
    fn routing_close(&mut self, now: Step) {
        self.no_transmission = false;
        self.strategy.sweep_expired(now);
    }

    // ── Feedback ──────────────────────────────────────────────────────────

    /// Forward delivery/expiry feedback to the strategy.
    pub fn feedback(
        &mut self,
        node: &Node,
        holder: AgentId,
        event: EventId,
        delay: u64,
        outcome: Outcome,
    ) {
        self.strategy.on_feedback(node, holder, event, delay, outcome);
    }
}
