//! Run-level routing metrics.

use fanet_core::{AgentId, EventId, Step};
use fanet_protocol::Outcome;

/// The resolved fate of one delivery episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventOutcomeRow {
    pub event:    EventId,
    pub origin:   AgentId,
    pub outcome:  Outcome,
    pub created:  Step,
    pub resolved: Step,
}

impl EventOutcomeRow {
    /// Steps from injection to resolution.
    #[inline]
    pub fn delay(&self) -> u64 {
        self.resolved.since(self.created)
    }
}

// ── RoutingMetrics ───────────────────────────────────────────────────────────

/// Accumulates event outcomes over a run.  One per [`Swarm`][crate::Swarm];
/// the step loop feeds it as events resolve.
#[derive(Debug, Default)]
pub struct RoutingMetrics {
    pub delivered: u64,
    pub expired:   u64,
    delivery_delay_sum: u64,
    pub rows: Vec<EventOutcomeRow>,
}

impl RoutingMetrics {
    pub fn record(&mut self, row: EventOutcomeRow) {
        match row.outcome {
            Outcome::Delivered => {
                self.delivered += 1;
                self.delivery_delay_sum += row.delay();
            }
            Outcome::Expired => self.expired += 1,
        }
        self.rows.push(row);
    }

    /// Delivered events over all resolved events; 0 when nothing resolved.
    pub fn delivery_ratio(&self) -> f64 {
        let total = self.delivered + self.expired;
        if total == 0 {
            0.0
        } else {
            self.delivered as f64 / total as f64
        }
    }

    /// Mean injection-to-depot delay over delivered events, in steps.
    pub fn mean_delay(&self) -> f64 {
        if self.delivered == 0 {
            0.0
        } else {
            self.delivery_delay_sum as f64 / self.delivered as f64
        }
    }
}

// ── RunSummary ───────────────────────────────────────────────────────────────

/// One-line aggregate of a whole run: event outcomes plus the engine-side
/// relay counters summed over every agent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub delivered:       u64,
    pub expired:         u64,
    pub delivery_ratio:  f64,
    pub mean_delay:      f64,
    pub relay_attempts:  u64,
    /// Mean candidate-set size over all relay attempts.
    pub mean_candidates: f64,
}
