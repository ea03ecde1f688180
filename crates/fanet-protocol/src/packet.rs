//! The closed set of packet variants exchanged between agents.
//!
//! Packets are immutable value types: once dispatched, nothing mutates them.
//! Where the protocol conceptually "edits" a packet in flight — stamping a
//! hop, rewriting the declared source, clearing the resend flag — the
//! operation is a consuming builder method that returns a new value, so two
//! receivers of the same broadcast can never observe each other's edits.

use fanet_core::{AgentId, EventId, PacketId, Point, Step};

use crate::TableMap;

// ── EventRef ─────────────────────────────────────────────────────────────────

/// One delivery or discovery episode: a unique ID plus the step after which
/// the episode is considered expired.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EventRef {
    pub id: EventId,
    pub deadline: Step,
}

impl EventRef {
    #[inline]
    pub fn expired(&self, now: Step) -> bool {
        now >= self.deadline
    }
}

// ── Link info ────────────────────────────────────────────────────────────────

/// What one agent knows about a peer's link, learned through discovery.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkInfo {
    pub speed: f32,
    pub location: Point,
    /// Discovery-forwarding hops between the peer and the depot.
    pub hop_count_from_depot: u32,
}

// ── Variants ─────────────────────────────────────────────────────────────────

/// User payload awaiting delivery to the depot.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataPacket {
    pub id: PacketId,
    pub event: EventRef,
    pub src: AgentId,
    pub created: Step,
}

/// Periodic liveness/position broadcast.  `qtable` is the optional
/// strategy-specific payload (a snapshot of the sender's Q-table) that
/// neighbor-side bookkeeping needs under Q-learning.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HelloPacket {
    pub src: AgentId,
    pub position: Point,
    pub speed: f32,
    pub next_target: Point,
    pub created: Step,
    pub qtable: Option<Vec<f64>>,
}

/// Acknowledges reception of one `DataPacket`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AckPacket {
    pub acked: PacketId,
    pub src: AgentId,
    pub created: Step,
}

/// Depot-initiated probe flooding hop count and path info through the swarm.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiscoveryPacket {
    pub id: PacketId,
    pub event: EventRef,
    /// Hops travelled from the depot; incremented at every forwarding agent.
    pub hop_count: u32,
    /// The declared source — rewritten to the forwarding agent at each hop so
    /// the next receiver knows its discovery parent.
    pub src: AgentId,
    pub created: Step,
}

impl DiscoveryPacket {
    /// A copy with the hop count stamped for one more hop.
    #[must_use]
    pub fn hopped(&self) -> DiscoveryPacket {
        DiscoveryPacket {
            hop_count: self.hop_count + 1,
            ..self.clone()
        }
    }

    /// A copy with the declared source rewritten to `agent`.
    #[must_use]
    pub fn from_source(&self, agent: AgentId) -> DiscoveryPacket {
        DiscoveryPacket {
            src: agent,
            ..self.clone()
        }
    }
}

/// Per-hop reply to a `DiscoveryPacket` carrying the replier's link info.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DpackPacket {
    pub src: AgentId,
    pub event: EventRef,
    pub info: LinkInfo,
    pub created: Step,
}

/// Aggregated agent → link-info mapping sent back up the discovery tree.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NeighborTablePacket {
    pub id: PacketId,
    pub sender: AgentId,
    pub event: EventRef,
    pub info: TableMap<AgentId, LinkInfo>,
    /// When set, the receiver owes the sender exactly one reply copy with the
    /// flag cleared — the chain terminates after that single echo.
    pub resend: bool,
    pub created: Step,
}

impl NeighborTablePacket {
    /// A reply copy: fresh ID and sender, the receiver's merged table, and
    /// `resend` cleared so the echo chain terminates.
    #[must_use]
    pub fn reply(
        &self,
        id: PacketId,
        sender: AgentId,
        info: TableMap<AgentId, LinkInfo>,
        now: Step,
    ) -> NeighborTablePacket {
        NeighborTablePacket {
            id,
            sender,
            event: self.event,
            info,
            resend: false,
            created: now,
        }
    }
}

// ── Packet ───────────────────────────────────────────────────────────────────

/// The closed tagged-variant packet type.  The dispatcher matches this
/// exhaustively; adding a variant is a compile error at every match site
/// rather than a silent fallthrough.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Packet {
    Data(DataPacket),
    Hello(HelloPacket),
    Ack(AckPacket),
    Discovery(DiscoveryPacket),
    Dpack(DpackPacket),
    NeighborTable(NeighborTablePacket),
}

impl Packet {
    /// The delivery/discovery episode this packet belongs to, if any.
    pub fn event_ref(&self) -> Option<EventRef> {
        match self {
            Packet::Data(p) => Some(p.event),
            Packet::Discovery(p) => Some(p.event),
            Packet::Dpack(p) => Some(p.event),
            Packet::NeighborTable(p) => Some(p.event),
            Packet::Hello(_) | Packet::Ack(_) => None,
        }
    }

    /// The globally unique packet ID, for variants that carry one.
    pub fn id(&self) -> Option<fanet_core::PacketId> {
        match self {
            Packet::Data(p) => Some(p.id),
            Packet::Discovery(p) => Some(p.id),
            Packet::NeighborTable(p) => Some(p.id),
            Packet::Hello(_) | Packet::Ack(_) | Packet::Dpack(_) => None,
        }
    }

    /// Discovery traffic is scheduled with the larger medium delay.
    #[inline]
    pub fn is_discovery(&self) -> bool {
        matches!(self, Packet::Discovery(_))
    }
}
