//! `fanet-protocol` — the per-agent ad-hoc routing protocol engine.
//!
//! # Crate layout
//!
//! | Module       | Contents                                                      |
//! |--------------|---------------------------------------------------------------|
//! | [`packet`]   | `Packet` enum and its immutable variant types                 |
//! | [`node`]     | `Node` — agent-side buffer, seen-sets, and neighbor tables    |
//! | [`channel`]  | `ChannelModel` — distance-dependent success probability       |
//! | [`medium`]   | `Medium` trait plus the gated unicast/broadcast front-end     |
//! | [`engine`]   | `RoutingEngine` — reception dispatch and the send cycle       |
//! | [`depot`]    | `Depot` — reduced protocol run by the collection point        |
//! | [`strategy`] | `RelayStrategy` trait; random, geographic, Q-learning impls   |
//! | [`error`]    | `ProtocolError`, `ProtocolResult<T>`                          |
//!
//! # Design notes
//!
//! The engine is a pure reactive state machine: it holds no timers and spawns
//! nothing.  The external scheduler calls [`RoutingEngine::on_receive`] for
//! every packet the medium delivers this step and [`RoutingEngine::routing`]
//! once per agent per step; effects of a send become visible to the receiver
//! only at a later step, through the medium's delivery delay.
//!
//! All mutable state is owned by one agent's engine or `Node`; cross-agent
//! interaction happens only through packets, so no synchronisation exists
//! anywhere in this crate.

pub mod channel;
pub mod depot;
pub mod engine;
pub mod error;
pub mod medium;
pub mod node;
pub mod packet;
pub mod strategy;

#[cfg(test)]
mod tests;

// ── Hash containers ───────────────────────────────────────────────────────────

/// Map type for all per-agent tables.  The `fx-hash` feature swaps in
/// rustc-hash's faster integer hashing.
#[cfg(feature = "fx-hash")]
pub type TableMap<K, V> = rustc_hash::FxHashMap<K, V>;
#[cfg(not(feature = "fx-hash"))]
pub type TableMap<K, V> = std::collections::HashMap<K, V>;

/// Set type matching [`TableMap`].
#[cfg(feature = "fx-hash")]
pub type TableSet<K> = rustc_hash::FxHashSet<K>;
#[cfg(not(feature = "fx-hash"))]
pub type TableSet<K> = std::collections::HashSet<K>;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use channel::ChannelModel;
pub use depot::{Arrival, Depot};
pub use engine::{EngineStats, ProtoContext, RoutingEngine};
pub use error::{ProtocolError, ProtocolResult};
pub use medium::Medium;
pub use node::{Node, PeerView};
pub use packet::{
    AckPacket, DataPacket, DiscoveryPacket, DpackPacket, EventRef, HelloPacket, LinkInfo,
    NeighborTablePacket, Packet,
};
pub use strategy::{
    Candidate, GeographicStrategy, Outcome, QLearningStrategy, RandomStrategy, RelayStrategy,
};
