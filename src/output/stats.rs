//! Per-publication run summary
//!
//! Counts every work item by what happened to it so skips and failures are
//! reported at the end of a run instead of surfacing as errors.

use crate::crawler::Acceptance;
use std::time::Duration;

/// Outcome counts of one publication run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Publication name
    pub publication: String,

    /// URLs returned by discovery, after keyword exclusion
    pub candidates: usize,

    /// Work items actually scheduled (after dedup and the item cap)
    pub queued: usize,

    /// Posts materialized as artifacts
    pub accepted: usize,

    /// Successful fetches dropped because they were not newer than the watermark
    pub stale: usize,

    pub skipped_paywalled: usize,
    pub skipped_present: usize,

    /// Fetch or write failures
    pub failed: usize,

    /// URL and reason for every failure
    pub failures: Vec<(String, String)>,

    /// Whether the state file was written (always false outside continuous mode)
    pub state_committed: bool,

    pub duration: Duration,
}

impl RunSummary {
    /// Creates an empty summary for a publication
    pub fn new(publication: &str) -> Self {
        Self {
            publication: publication.to_string(),
            ..Default::default()
        }
    }

    /// Copies the outcome counts of a sorted result set
    ///
    /// `accepted` is not taken from the acceptance: it counts posts whose
    /// artifacts were actually written.
    pub fn record_acceptance(&mut self, acceptance: &Acceptance) {
        self.stale = acceptance.stale.len();
        self.skipped_paywalled = acceptance.skipped_paywalled.len();
        self.skipped_present = acceptance.skipped_present.len();
        for (item, reason) in &acceptance.failed {
            self.record_failure(&item.url, reason.to_string());
        }
    }

    pub fn record_failure(&mut self, url: &str, reason: String) {
        self.failed += 1;
        self.failures.push((url.to_string(), reason));
    }

    /// Total number of items that reached a terminal outcome
    pub fn total(&self) -> usize {
        self.accepted + self.stale + self.skipped_paywalled + self.skipped_present + self.failed
    }
}

/// Prints a run summary to stdout
///
/// # Arguments
///
/// * `summary` - The summary to display
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary: {} ===\n", summary.publication);

    println!("Overview:");
    println!("  Candidates discovered: {}", summary.candidates);
    println!("  Items queued: {}", summary.queued);
    println!("  Duration: {:.1}s", summary.duration.as_secs_f64());
    println!();

    println!("Outcomes:");
    for (label, count) in [
        ("Accepted", summary.accepted),
        ("Not newer than watermark", summary.stale),
        ("Skipped (paywalled)", summary.skipped_paywalled),
        ("Skipped (already present)", summary.skipped_present),
        ("Failed", summary.failed),
    ] {
        let percentage = if summary.queued > 0 {
            (count as f64 / summary.queued as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", label, count, percentage);
    }
    println!();

    if !summary.failures.is_empty() {
        println!("Failures:");
        for (url, reason) in &summary.failures {
            println!("  {} - {}", url, reason);
        }
        println!();
    }

    println!(
        "State committed: {}",
        if summary.state_committed { "yes" } else { "no" }
    );
    println!();
}
