//! The `Swarm` struct and its step loop.

use fanet_core::{AgentId, EventId, ProtocolConfig, RoutingRng, SimRng, Step, StepClock};
use fanet_protocol::{
    DataPacket, Depot, EventRef, Node, Outcome, Packet, PeerView, ProtoContext, RelayStrategy,
    RoutingEngine,
};

use crate::dispatcher::NetworkDispatcher;
use crate::metrics::{EventOutcomeRow, RoutingMetrics, RunSummary};
use crate::{SimError, SimResult, SwarmObserver};

// ── SwarmAgent ───────────────────────────────────────────────────────────────

/// One mobile agent: its protocol-visible state, its engine instance, and its
/// private RNG stream.
///
/// Mobility is external — update `node.coords` / `node.speed` /
/// `node.next_target` between steps; the step loop only reads them.
#[derive(Debug)]
pub struct SwarmAgent<S: RelayStrategy> {
    pub node:   Node,
    pub engine: RoutingEngine<S>,
    rng: RoutingRng,
}

/// One live delivery episode, tracked from injection until delivery or expiry.
#[derive(Clone, Copy, Debug)]
struct EventRecord {
    origin:  AgentId,
    event:   EventRef,
    created: Step,
}

// ── SwarmBuilder ─────────────────────────────────────────────────────────────

/// Fluent builder for [`Swarm<S>`].
///
/// # Required inputs
///
/// - [`ProtocolConfig`] — population size, seed, intervals, channel mode
/// - one `.agent(node, strategy)` call per mobile agent, in ascending ID order
/// - `.depot(node)` — the collection point, carrying the highest agent ID
///
/// # Example
///
/// ```rust,ignore
/// let mut swarm = SwarmBuilder::new(cfg)
///     .agent(node_a, RandomStrategy)
///     .agent(node_b, RandomStrategy)
///     .depot(depot_node)
///     .build()?;
/// swarm.run(2_000, &mut NoopObserver);
/// ```
pub struct SwarmBuilder<S: RelayStrategy> {
    cfg:       ProtocolConfig,
    agents:    Vec<(Node, S)>,
    depot:     Option<Node>,
    drop_prob: f64,
}

impl<S: RelayStrategy> SwarmBuilder<S> {
    pub fn new(cfg: ProtocolConfig) -> Self {
        Self {
            cfg,
            agents: Vec::new(),
            depot: None,
            drop_prob: 0.0,
        }
    }

    /// Add one mobile agent.  Agents must be added in ascending ID order,
    /// starting at ID 0.
    pub fn agent(mut self, node: Node, strategy: S) -> Self {
        self.agents.push((node, strategy));
        self
    }

    /// Set the depot node.  By convention it takes the highest ID in the
    /// population.
    pub fn depot(mut self, node: Node) -> Self {
        self.depot = Some(node);
        self
    }

    /// Have the dispatcher discard transmissions with probability `p`, on
    /// top of whatever the channel model rejects.
    pub fn drop_probability(mut self, p: f64) -> Self {
        self.drop_prob = p;
        self
    }

    /// Validate inputs and return a ready-to-run [`Swarm`].
    pub fn build(self) -> SimResult<Swarm<S>> {
        self.cfg.validate()?;

        let depot_node = self
            .depot
            .ok_or_else(|| SimError::Config("a depot node is required".into()))?;

        if self.agents.len() + 1 != self.cfg.n_agents {
            return Err(SimError::AgentCountMismatch {
                expected: self.cfg.n_agents,
                got:      self.agents.len() + 1,
                what:     "agents (depot included)",
            });
        }
        if depot_node.id.index() != self.cfg.n_agents - 1 {
            return Err(SimError::Config(format!(
                "depot must carry the highest agent ID {} (got {})",
                self.cfg.n_agents - 1,
                depot_node.id
            )));
        }
        for (i, (node, _)) in self.agents.iter().enumerate() {
            if node.id.index() != i {
                return Err(SimError::Config(format!(
                    "agent at position {i} carries ID {} — agents must be added in ascending ID order",
                    node.id
                )));
            }
        }

        let agents: Vec<SwarmAgent<S>> = self
            .agents
            .into_iter()
            .map(|(node, strategy)| SwarmAgent {
                engine: RoutingEngine::new(&self.cfg, node.comm_range, strategy),
                rng:    RoutingRng::new(self.cfg.seed, node.id),
                node,
            })
            .collect();

        let depot_rng = RoutingRng::new(self.cfg.seed, depot_node.id);
        let depot = Depot::new(&self.cfg, depot_node);

        // The dispatcher draws from its own child stream, so loss injection
        // never perturbs per-agent channel or exploration draws.
        let mut root = SimRng::new(self.cfg.seed);
        let dispatcher = NetworkDispatcher::new(root.child(1))
            .with_drop_probability(self.drop_prob);

        Ok(Swarm {
            cfg: self.cfg,
            clock: StepClock::new(),
            agents,
            depot,
            depot_rng,
            dispatcher,
            pending: Vec::new(),
            next_event_seq: 0,
            metrics: RoutingMetrics::default(),
        })
    }
}

// ── Swarm ────────────────────────────────────────────────────────────────────

/// The simulation runner: agents, depot, dispatcher, clock, and the event
/// registry.
///
/// # Step anatomy
///
/// 1. **Deliver** — drain due transmissions from the dispatcher into agent
///    engines (or the depot buffer).
/// 2. **Routing** — one [`RoutingEngine::routing`] pass per agent: hello
///    emission, relay attempts, depot hand-off, step close.
/// 3. **Depot** — one [`Depot::ad_hoc_routing`] pass: discovery flooding and
///    neighbor-table replies.
/// 4. **Resolve** — depot arrivals become `Delivered` outcomes, deadline
///    overruns become `Expired`; both fan feedback out to every agent.
/// 5. **Advance** the clock.
#[derive(Debug)]
pub struct Swarm<S: RelayStrategy> {
    cfg:        ProtocolConfig,
    clock:      StepClock,
    agents:     Vec<SwarmAgent<S>>,
    depot:      Depot,
    depot_rng:  RoutingRng,
    dispatcher: NetworkDispatcher,
    /// Live delivery episodes awaiting resolution.
    pending: Vec<EventRecord>,
    next_event_seq: u32,
    pub metrics: RoutingMetrics,
}

impl<S: RelayStrategy> Swarm<S> {
    // ── Public API ────────────────────────────────────────────────────────

    pub fn current_step(&self) -> Step {
        self.clock.current
    }

    pub fn agent(&self, id: AgentId) -> Option<&SwarmAgent<S>> {
        self.agents.get(id.index())
    }

    /// Mutable agent access, for external mobility updates between steps.
    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut SwarmAgent<S>> {
        self.agents.get_mut(id.index())
    }

    pub fn depot(&self) -> &Depot {
        &self.depot
    }

    /// Unresolved delivery episodes.
    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Originate one data packet at `origin` with a deadline `ttl` steps from
    /// now, and kick off the depot's path-discovery flood for the episode.
    pub fn inject_data(&mut self, origin: AgentId, ttl: u64) -> SimResult<EventId> {
        let now = self.clock.current;
        let event = EventRef {
            id:       EventId(self.next_event_seq),
            deadline: now.offset(ttl),
        };
        self.next_event_seq += 1;

        let agent = self
            .agents
            .get_mut(origin.index())
            .ok_or(SimError::UnknownAgent(origin))?;
        let data = DataPacket {
            id: agent.node.alloc_packet_id(),
            event,
            src: origin,
            created: now,
        };
        agent.node.buffer.push(Packet::Data(data));
        agent.node.routing_to_depot = true;

        self.pending.push(EventRecord {
            origin,
            event,
            created: now,
        });
        self.depot.start_discovery(event, now);
        Ok(event.id)
    }

    /// Run `steps` steps from the current position.
    pub fn run<O: SwarmObserver>(&mut self, steps: u64, observer: &mut O) {
        for _ in 0..steps {
            self.step(observer);
        }
        observer.on_run_end(self.clock.current);
    }

    /// Aggregate event outcomes and per-agent engine counters.
    pub fn summary(&self) -> RunSummary {
        let mut relay_attempts = 0u64;
        let mut candidate_sum = 0u64;
        let mut candidate_samples = 0u64;
        for agent in &self.agents {
            let stats = agent.engine.stats;
            relay_attempts += stats.relay_attempts;
            candidate_sum += stats.candidate_sum;
            candidate_samples += stats.candidate_samples;
        }
        RunSummary {
            delivered:       self.metrics.delivered,
            expired:         self.metrics.expired,
            delivery_ratio:  self.metrics.delivery_ratio(),
            mean_delay:      self.metrics.mean_delay(),
            relay_attempts,
            mean_candidates: if candidate_samples == 0 {
                0.0
            } else {
                candidate_sum as f64 / candidate_samples as f64
            },
        }
    }

    // ── Core step processing ──────────────────────────────────────────────

    /// Execute one full simulation step.
    pub fn step<O: SwarmObserver>(&mut self, observer: &mut O) {
        let now = self.clock.current;
        observer.on_step_start(now);

        let peers = self.peer_views();
        let ctx = ProtoContext {
            depot_id:     self.depot.node.id,
            depot_coords: self.depot.node.coords,
            cfg:          &self.cfg,
        };

        // ── Phase 1: deliver due transmissions ────────────────────────────
        for t in self.dispatcher.drain_due(now) {
            if t.dst == ctx.depot_id {
                self.depot.on_receive(t.packet);
                continue;
            }
            let Some(agent) = self.agents.get_mut(t.dst.index()) else {
                continue;
            };
            agent.engine.on_receive(
                &mut agent.node, t.src, t.packet, &peers, &ctx, now,
                &mut self.dispatcher, &mut agent.rng,
            );
        }

        // ── Phase 2: per-agent routing pass ───────────────────────────────
        for agent in &mut self.agents {
            agent.engine.routing(
                &mut agent.node, &mut self.depot, &peers, &ctx, now,
                &mut self.dispatcher, &mut agent.rng,
            );
        }

        // ── Phase 3: depot pass ───────────────────────────────────────────
        self.depot.ad_hoc_routing(&peers, &self.cfg, now, &mut self.dispatcher, &mut self.depot_rng);

        // ── Phase 4: resolve events ───────────────────────────────────────
        let delivered_now = self.resolve_arrivals(now, observer);
        self.resolve_expired(now, observer);

        observer.on_step_end(now, delivered_now);
        self.clock.advance();
    }

    /// Data packets that reached the depot this step close their episodes as
    /// delivered.  Returns the number of episodes closed.
    fn resolve_arrivals<O: SwarmObserver>(&mut self, now: Step, observer: &mut O) -> usize {
        let mut delivered = 0;
        for arrival in self.depot.drain_arrivals() {
            let event = arrival.packet.event;
            // Duplicate copies of an already-resolved episode end here.
            let Some(pos) = self.pending.iter().position(|r| r.event.id == event.id) else {
                continue;
            };
            let rec = self.pending.swap_remove(pos);
            let delay = now.since(rec.created);
            delivered += 1;

            self.metrics.record(EventOutcomeRow {
                event:    event.id,
                origin:   rec.origin,
                outcome:  Outcome::Delivered,
                created:  rec.created,
                resolved: now,
            });
            observer.on_event_resolved(event.id, Outcome::Delivered, delay);

            // Feedback fan-out: the holder is whoever handed the packet over.
            // Agents that never acted on this episode ignore the call.
            for agent in &mut self.agents {
                agent.engine.feedback(&agent.node, arrival.from, event.id, delay, Outcome::Delivered);
            }
        }
        delivered
    }

    /// Episodes whose deadline passed without delivery close as expired; the
    /// holder is whichever agent still buffers the packet (the origin if none
    /// does — the packet was lost in flight).
    fn resolve_expired<O: SwarmObserver>(&mut self, now: Step, observer: &mut O) {
        let (expired, live): (Vec<EventRecord>, Vec<EventRecord>) =
            std::mem::take(&mut self.pending)
                .into_iter()
                .partition(|r| r.event.expired(now));
        self.pending = live;

        for rec in expired {
            let holder = holder_of(&self.agents, rec.event.id, rec.origin);
            self.metrics.record(EventOutcomeRow {
                event:    rec.event.id,
                origin:   rec.origin,
                outcome:  Outcome::Expired,
                created:  rec.created,
                resolved: now,
            });
            observer.on_event_resolved(rec.event.id, Outcome::Expired, 0);
            for agent in &mut self.agents {
                agent.engine.feedback(&agent.node, holder, rec.event.id, 0, Outcome::Expired);
            }
        }
    }

    /// Snapshot of every agent's geometric view (depot included), rebuilt
    /// once per step and shared across all routing calls in that step.
    fn peer_views(&self) -> Vec<PeerView> {
        let mut peers: Vec<PeerView> = self.agents.iter().map(|a| a.node.view()).collect();
        peers.push(self.depot.node.view());
        peers
    }
}

/// The agent currently buffering the data packet for `event`, or `origin`.
fn holder_of<S: RelayStrategy>(
    agents: &[SwarmAgent<S>],
    event: EventId,
    origin: AgentId,
) -> AgentId {
    for agent in agents {
        let holds = agent
            .node
            .buffer
            .iter()
            .any(|p| matches!(p, Packet::Data(d) if d.event.id == event));
        if holds {
            return agent.node.id;
        }
    }
    origin
}
