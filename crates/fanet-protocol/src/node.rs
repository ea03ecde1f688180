//! Agent-side entity state the routing engine operates on.
//!
//! `Node` is the protocol's view of one mobile agent: identity, kinematics,
//! the packet buffer, and the discovery bookkeeping tables.  Mobility itself
//! is external — whoever owns the `Node` updates `coords`/`speed` between
//! steps; the engine only reads them.

use fanet_core::{AgentId, EventId, PacketId, Point};

use crate::packet::{LinkInfo, Packet};
use crate::{TableMap, TableSet};

// ── PeerView ─────────────────────────────────────────────────────────────────

/// The slice of agent state the geometric transmission gate needs.
///
/// A snapshot of every agent's view is built once per step by the scheduler
/// and shared across all routing calls in that step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PeerView {
    pub id: AgentId,
    pub coords: Point,
    pub comm_range: f32,
}

// ── Node ─────────────────────────────────────────────────────────────────────

/// One agent's externally owned routing state.
#[derive(Debug)]
pub struct Node {
    pub id: AgentId,
    pub coords: Point,
    pub speed: f32,
    /// Where the agent is heading next — advertised in hellos so neighbors
    /// can anticipate link lifetime.
    pub next_target: Point,
    pub comm_range: f32,

    /// Packets awaiting relay (data on agents; discovery traffic on the depot).
    pub buffer: Vec<Packet>,

    /// Discovery events already processed — subsequent copies are dropped.
    pub seen_events: TableSet<EventId>,

    /// Per-event forward parent: who to send the aggregated neighbor table to.
    pub discovery_parent: TableMap<EventId, AgentId>,

    /// In-progress neighbor table for the current discovery event.
    pub temp_neighbors: TableMap<AgentId, LinkInfo>,

    /// Persistent neighbor table (peer → link info), merged from every
    /// `NeighborTable` packet received.
    pub neighbors: TableMap<AgentId, LinkInfo>,

    /// Set while the agent is carrying its buffer toward the depot; cleared
    /// when the buffer drains.
    pub routing_to_depot: bool,

    next_packet_seq: u32,
}

impl Node {
    pub fn new(id: AgentId, coords: Point, speed: f32, comm_range: f32) -> Self {
        Self {
            id,
            coords,
            speed,
            next_target: coords,
            comm_range,
            buffer: Vec::new(),
            seen_events: TableSet::default(),
            discovery_parent: TableMap::default(),
            temp_neighbors: TableMap::default(),
            neighbors: TableMap::default(),
            routing_to_depot: false,
            next_packet_seq: 0,
        }
    }

    /// Allocate a packet ID unique across the swarm without coordination:
    /// the node ID occupies the high half, a local sequence the low half.
    pub fn alloc_packet_id(&mut self) -> PacketId {
        let id = PacketId::compose(self.id, self.next_packet_seq);
        self.next_packet_seq += 1;
        id
    }

    /// The gate-relevant snapshot of this node.
    #[inline]
    pub fn view(&self) -> PeerView {
        PeerView {
            id: self.id,
            coords: self.coords,
            comm_range: self.comm_range,
        }
    }

    // ── Buffer operations ─────────────────────────────────────────────────

    #[inline]
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn buffer_is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Remove the buffered packet with ID `id`, if present.
    pub fn remove_packet(&mut self, id: PacketId) {
        self.buffer.retain(|p| p.id() != Some(id));
    }

    /// Hand the whole buffer over (direct depot transfer).
    pub fn drain_buffer(&mut self) -> Vec<Packet> {
        std::mem::take(&mut self.buffer)
    }
}
