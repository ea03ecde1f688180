//! Depot-side ad-hoc handling.
//!
//! The depot never originates data and runs a reduced protocol: it floods
//! discovery probes, merges incoming neighbor tables into its own view, and
//! answers each table with its updated aggregate.  Everything else that lands
//! in its buffer just sits there as delivered payload.

use fanet_core::{AgentId, ProtocolConfig, RoutingRng, Step};

use crate::channel::ChannelModel;
use crate::medium::{broadcast, unicast, Medium};
use crate::node::{Node, PeerView};
use crate::packet::{DataPacket, DiscoveryPacket, EventRef, Packet};
use crate::TableSet;

/// One data packet that reached the depot, recorded for feedback plumbing.
#[derive(Clone, Debug)]
pub struct Arrival {
    pub from: AgentId,
    pub packet: DataPacket,
    pub at: Step,
}

// ── Depot ────────────────────────────────────────────────────────────────────

/// The fixed collection point.
#[derive(Debug)]
pub struct Depot {
    pub node: Node,
    channel: ChannelModel,
    /// Buffered packets already shipped by `ad_hoc_routing` — same seen-set
    /// structure ordinary agents use for discovery events, keyed by packet ID.
    shipped: TableSet<fanet_core::PacketId>,
    arrivals: Vec<Arrival>,
}

impl Depot {
    pub fn new(cfg: &ProtocolConfig, node: Node) -> Self {
        let channel = ChannelModel::new(cfg, node.comm_range);
        Self {
            node,
            channel,
            shipped: TableSet::default(),
            arrivals: Vec::new(),
        }
    }

    /// Begin one discovery episode: enqueue a hop-zero probe under the
    /// depot's name.  `ad_hoc_routing` floods it on the next pass.
    pub fn start_discovery(&mut self, event: EventRef, now: Step) {
        let probe = DiscoveryPacket {
            id: self.node.alloc_packet_id(),
            event,
            hop_count: 0,
            src: self.node.id,
            created: now,
        };
        self.node.buffer.push(Packet::Discovery(probe));
    }

    /// A packet the medium delivered to the depot.
    pub fn on_receive(&mut self, packet: Packet) {
        self.node.buffer.push(packet);
    }

    /// Direct buffer hand-off from an agent inside depot range.
    pub fn accept_transfer(&mut self, from: AgentId, packets: Vec<Packet>, now: Step) {
        for packet in packets {
            if let Packet::Data(data) = packet {
                self.arrivals.push(Arrival {
                    from,
                    packet: data,
                    at: now,
                });
            }
        }
    }

    /// Drain data arrivals since the last call (the simulator turns these
    /// into delivery feedback).
    pub fn drain_arrivals(&mut self) -> Vec<Arrival> {
        std::mem::take(&mut self.arrivals)
    }

    /// The depot's reduced per-step protocol pass.
    ///
    /// Scans the buffer in reverse insertion order; each not-yet-shipped
    /// discovery probe is flooded to the swarm, each not-yet-shipped neighbor
    /// table is merged and answered with the depot's updated view.
    pub fn ad_hoc_routing<M: Medium>(
        &mut self,
        peers: &[PeerView],
        cfg: &ProtocolConfig,
        now: Step,
        medium: &mut M,
        rng: &mut RoutingRng,
    ) {
        for idx in (0..self.node.buffer.len()).rev() {
            let packet = self.node.buffer[idx].clone();
            match packet {
                Packet::Discovery(probe) => {
                    if !self.shipped.insert(probe.id) {
                        continue;
                    }
                    broadcast(
                        &self.channel, self.node.view(), self.node.id, peers,
                        &Packet::Discovery(probe), cfg, now, medium, rng,
                    );
                }

                Packet::NeighborTable(table) => {
                    if !self.shipped.insert(table.id) {
                        continue;
                    }
                    for (agent, info) in &table.info {
                        self.node.neighbors.insert(*agent, *info);
                    }
                    // Reply with the merged aggregate; resend stays clear so
                    // the exchange ends with the receiver's single echo.
                    let reply = table.reply(
                        self.node.alloc_packet_id(),
                        self.node.id,
                        self.node.neighbors.clone(),
                        now,
                    );
                    unicast(
                        &self.channel, self.node.view(), table.sender, peers,
                        Packet::NeighborTable(reply), cfg, now, medium, rng,
                    );
                }

                // Data, hellos, ACKs, and DPACKs terminate here.
                _ => {}
            }
        }
    }
}
