//! Greedy geographic forwarding: hand the packet to the candidate closest to
//! the depot, but only if that candidate actually improves on our own
//! position.  Declining beats moving a packet away from its destination.

use fanet_core::{AgentId, Point, RoutingRng};

use crate::node::Node;
use crate::packet::Packet;
use crate::strategy::{Candidate, RelayStrategy};

pub struct GeographicStrategy {
    depot_coords: Point,
}

impl GeographicStrategy {
    pub fn new(depot_coords: Point) -> Self {
        Self { depot_coords }
    }
}

impl RelayStrategy for GeographicStrategy {
    fn choose_relay(
        &mut self,
        node: &Node,
        candidates: &[Candidate<'_>],
        _packet: &Packet,
        _rng: &mut RoutingRng,
    ) -> Option<AgentId> {
        let own_distance = node.coords.distance(self.depot_coords);

        let mut best: Option<(AgentId, f32)> = None;
        for c in candidates {
            let d = c.coords.distance(self.depot_coords);
            if d >= own_distance {
                continue;
            }
            // Ties resolve to the lowest agent ID for determinism.
            match best {
                Some((id, bd)) if d > bd || (d == bd && c.id >= id) => {}
                _ => best = Some((c.id, d)),
            }
        }
        best.map(|(id, _)| id)
    }
}
