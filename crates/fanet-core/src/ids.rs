//! Strongly typed, zero-cost identifier wrappers.
//!
//! All IDs are `Copy + Ord + Hash` so they can be used as map keys and sorted
//! collection elements without ceremony.  The inner integer is `pub` to allow
//! direct indexing into per-agent `Vec`s via `id.0 as usize`, but callers
//! should prefer the `.index()` helpers for clarity.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID" — equivalent to the type's MAX.
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Index of an agent in the swarm.  The depot is an agent too — by
    /// convention it takes the highest ID in the population.
    pub struct AgentId(u32);
}

typed_id! {
    /// Identifier of one delivery/discovery episode.  Feedback, discovery
    /// deduplication, and taken-action records are all keyed by this.
    pub struct EventId(u32);
}

typed_id! {
    /// Globally unique packet identifier.  Allocated per node as
    /// `node_id << 32 | sequence` so no coordination is needed.
    pub struct PacketId(u64);
}

impl PacketId {
    /// Compose a packet ID from the originating agent and a local sequence.
    #[inline]
    pub fn compose(agent: AgentId, seq: u32) -> PacketId {
        PacketId(((agent.0 as u64) << 32) | seq as u64)
    }

    /// The agent that allocated this packet ID.
    #[inline]
    pub fn origin(self) -> AgentId {
        AgentId((self.0 >> 32) as u32)
    }
}
