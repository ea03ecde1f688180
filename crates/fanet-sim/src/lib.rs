//! `fanet-sim` — step loop orchestrator for the fanet routing stack.
//!
//! # Step loop
//!
//! ```text
//! for step in 0..n:
//!   ① Deliver  — drain transmissions due this step from the dispatcher
//!                into the receiving agent's engine (or the depot buffer).
//!   ② Routing  — one RoutingEngine::routing pass per agent: hello cadence,
//!                relay attempts, depot hand-off, step close.
//!   ③ Depot    — Depot::ad_hoc_routing: discovery floods, table replies.
//!   ④ Resolve  — depot arrivals → Delivered, overrun deadlines → Expired;
//!                both fan feedback out to every agent's strategy.
//! ```
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use fanet_protocol::RandomStrategy;
//! use fanet_sim::{NoopObserver, SwarmBuilder};
//!
//! let mut swarm = SwarmBuilder::new(cfg)
//!     .agent(node_a, RandomStrategy)
//!     .agent(node_b, RandomStrategy)
//!     .depot(depot_node)
//!     .build()?;
//! let event = swarm.inject_data(node_a_id, 500)?;
//! swarm.run(2_000, &mut NoopObserver);
//! println!("{:?}", swarm.summary());
//! ```

pub mod dispatcher;
pub mod error;
pub mod export;
pub mod metrics;
pub mod observer;
pub mod swarm;


pub use dispatcher::{NetworkDispatcher, Transmission};
pub use error::{SimError, SimResult};
pub use export::MetricsCsvWriter;
pub use metrics::{EventOutcomeRow, RoutingMetrics, RunSummary};
pub use observer::{NoopObserver, SwarmObserver};
pub use swarm::{Swarm, SwarmAgent, SwarmBuilder};
