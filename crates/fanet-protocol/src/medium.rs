//! The external medium contract and the gated transmission front-end.
//!
//! The engine never delivers anything itself: every send is a scheduling
//! call handed to the [`Medium`], which owns delivery timing and tie-breaking
//! between packets scheduled for the same step.  Dropped packets are
//! legitimate — their fate surfaces through the feedback/expiry path, never
//! as an error.
//!
//! Before a packet reaches the medium it passes the geometric gate: the
//! parties must be within `min(range_a, range_b)` of each other and the
//! channel draw must succeed.  A transmission that fails the gate simply
//! never happens.

use fanet_core::{AgentId, ProtocolConfig, RoutingRng, Step};

use crate::channel::ChannelModel;
use crate::node::PeerView;
use crate::packet::Packet;

/// Schedules one delivery.  Must guarantee eventual single delivery to the
/// destination at or after `deliver_at` — or never.
pub trait Medium {
    fn send(&mut self, packet: Packet, src: AgentId, dst: AgentId, deliver_at: Step);
}

/// Gate a unicast through geometry and channel, then schedule it.
///
/// Unknown destinations (not present in `peers`) are silently dropped: the
/// sender's knowledge was stale, which the protocol treats as loss.
#[allow(clippy::too_many_arguments)]
pub fn unicast<M: Medium>(
    channel: &ChannelModel,
    src: PeerView,
    dst: AgentId,
    peers: &[PeerView],
    packet: Packet,
    cfg: &ProtocolConfig,
    now: Step,
    medium: &mut M,
    rng: &mut RoutingRng,
) {
    let Some(dst_view) = peers.iter().find(|p| p.id == dst) else {
        return;
    };

    let distance = src.coords.distance(dst_view.coords);
    if distance > src.comm_range.min(dst_view.comm_range) {
        return;
    }
    if !channel.success(distance, rng) {
        return;
    }

    // Discovery floods pay a larger scheduling latency than ordinary traffic.
    let delay = if packet.is_discovery() {
        cfg.discovery_delay
    } else {
        cfg.packet_delay
    };
    medium.send(packet, src.id, dst, now.offset(delay));
}

/// Broadcast to every peer except the sender itself and the depot (the depot
/// participates in the protocol only through unicasts addressed to it).
#[allow(clippy::too_many_arguments)]
pub fn broadcast<M: Medium>(
    channel: &ChannelModel,
    src: PeerView,
    depot: AgentId,
    peers: &[PeerView],
    packet: &Packet,
    cfg: &ProtocolConfig,
    now: Step,
    medium: &mut M,
    rng: &mut RoutingRng,
) {
    for peer in peers {
        if peer.id == src.id || peer.id == depot {
            continue;
        }
        unicast(channel, src, peer.id, peers, packet.clone(), cfg, now, medium, rng);
    }
}
