//! CSV metrics export.
//!
//! Creates two files in the configured output directory:
//! - `event_outcomes.csv` — one row per resolved delivery episode
//! - `run_summary.csv` — a single aggregate row

use std::fs::File;
use std::path::Path;

use csv::Writer;

use fanet_protocol::Outcome;

use crate::metrics::{EventOutcomeRow, RunSummary};
use crate::SimResult;

/// Writes routing metrics to two CSV files.
pub struct MetricsCsvWriter {
    events:   Writer<File>,
    summary:  Writer<File>,
    finished: bool,
}

impl MetricsCsvWriter {
    /// Open (or create) the two CSV files in `dir` and write the header rows.
    pub fn new(dir: &Path) -> SimResult<Self> {
        let mut events = Writer::from_path(dir.join("event_outcomes.csv"))?;
        events.write_record(["event_id", "origin", "outcome", "created_step", "resolved_step", "delay_steps"])?;

        let mut summary = Writer::from_path(dir.join("run_summary.csv"))?;
        summary.write_record([
            "delivered", "expired", "delivery_ratio", "mean_delay_steps",
            "relay_attempts", "mean_candidates",
        ])?;

        Ok(Self {
            events,
            summary,
            finished: false,
        })
    }

    pub fn write_events(&mut self, rows: &[EventOutcomeRow]) -> SimResult<()> {
        for row in rows {
            self.events.write_record(&[
                row.event.0.to_string(),
                row.origin.0.to_string(),
                outcome_label(row.outcome).to_string(),
                row.created.0.to_string(),
                row.resolved.0.to_string(),
                row.delay().to_string(),
            ])?;
        }
        Ok(())
    }

    pub fn write_summary(&mut self, summary: &RunSummary) -> SimResult<()> {
        self.summary.write_record(&[
            summary.delivered.to_string(),
            summary.expired.to_string(),
            summary.delivery_ratio.to_string(),
            summary.mean_delay.to_string(),
            summary.relay_attempts.to_string(),
            summary.mean_candidates.to_string(),
        ])?;
        Ok(())
    }

    /// Flush and close both files.  Idempotent — safe to call more than once.
    pub fn finish(&mut self) -> SimResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.events.flush()?;
        self.summary.flush()?;
        Ok(())
    }
}

fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Delivered => "delivered",
        Outcome::Expired   => "expired",
    }
}
