//! `fanet-core` — foundational types for the fanet ad-hoc routing stack.
//!
//! This crate is a dependency of every other `fanet-*` crate.  It
//! intentionally has no `fanet-*` dependencies and minimal external ones
//! (only `rand` and `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module     | Contents                                            |
//! |------------|-----------------------------------------------------|
//! | [`ids`]    | `AgentId`, `EventId`, `PacketId`                    |
//! | [`point`]  | `Point`, Euclidean distance                         |
//! | [`time`]   | `Step`, `StepClock`                                 |
//! | [`rng`]    | `RoutingRng` (per-agent), `SimRng` (global)         |
//! | [`config`] | `ProtocolConfig`, `LearningConfig`, channel mode    |
//! | [`error`]  | `CoreError`, `CoreResult`                           |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                              |
//! |---------|-----------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types. |

pub mod config;
pub mod error;
pub mod ids;
pub mod point;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use config::{ChannelErrorMode, LearningConfig, ProtocolConfig};
pub use error::{CoreError, CoreResult};
pub use ids::{AgentId, EventId, PacketId};
pub use point::Point;
pub use rng::{RoutingRng, SimRng};
pub use time::{Step, StepClock};
