//! Baseline strategy: uniform random pick among the candidates.

use fanet_core::{AgentId, RoutingRng};

use crate::node::Node;
use crate::packet::Packet;
use crate::strategy::{Candidate, RelayStrategy};

/// Picks a relay uniformly at random.  Also serves as the exploration
/// delegate of the Q-learning strategy.
#[derive(Debug, Default)]
pub struct RandomStrategy;

impl RelayStrategy for RandomStrategy {
    fn choose_relay(
        &mut self,
        _node: &Node,
        candidates: &[Candidate<'_>],
        _packet: &Packet,
        rng: &mut RoutingRng,
    ) -> Option<AgentId> {
        rng.choose(candidates).map(|c| c.id)
    }
}
