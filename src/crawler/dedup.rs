//! Work-list construction and post-fetch acceptance
//!
//! Two filters bracket the fetch phase:
//! - [`filter`] runs before fetching and drops candidates already on disk
//!   (and, in continuous mode, already recorded in the state)
//! - [`accept`] runs after fetching and, in continuous mode, drops successes
//!   whose date is not strictly newer than the watermark
//!
//! Both are pure and order-independent over their inputs.

use crate::state::{DateKey, ExtractedPost, FailureReason, FetchOutcome, ScrapeState};
use crate::storage::ArtifactInventory;
use crate::url::slug_from_url;
use std::collections::HashSet;

/// How a run decides what is new
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Fetch everything not yet on disk; the state file is not consulted
    Full,

    /// Fetch only what is newer than the recorded state
    Continuous,
}

impl RunMode {
    pub fn from_continuous(continuous: bool) -> Self {
        if continuous {
            Self::Continuous
        } else {
            Self::Full
        }
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self, Self::Continuous)
    }
}

/// One post scheduled for fetching
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkItem {
    pub url: String,
    pub slug: String,
}

impl WorkItem {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            slug: slug_from_url(url),
        }
    }
}

/// Builds the work list for this run, preserving discovery order
///
/// A candidate is dropped when its slug already has an artifact (dated or
/// legacy), when it repeats an earlier candidate's slug, or, in continuous
/// mode, when its URL or slug is already in the state.
///
/// # Arguments
///
/// * `candidates` - Discovered post URLs
/// * `state` - State loaded at run start
/// * `inventory` - Artifacts found on disk at run start
/// * `mode` - Run mode
pub fn filter(
    candidates: &[String],
    state: &ScrapeState,
    inventory: &ArtifactInventory,
    mode: RunMode,
) -> Vec<WorkItem> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for url in candidates {
        let item = WorkItem::new(url);
        if item.slug.is_empty() || !seen.insert(item.slug.clone()) {
            continue;
        }
        if inventory.contains_slug(&item.slug) || inventory.has_legacy_file(&item.slug) {
            tracing::debug!(slug = %item.slug, "Already on disk, skipping");
            continue;
        }
        if mode.is_continuous() && state.is_processed(&item.url, &item.slug) {
            tracing::debug!(slug = %item.slug, "Already processed, skipping");
            continue;
        }
        items.push(item);
    }

    items
}

/// Outcomes of one run, sorted by what happens to them next
#[derive(Debug, Default)]
pub struct Acceptance {
    /// Successes to materialize and record
    pub accepted: Vec<(WorkItem, ExtractedPost)>,
    /// Successes dropped by the watermark
    pub stale: Vec<(WorkItem, DateKey)>,
    pub skipped_paywalled: Vec<WorkItem>,
    pub skipped_present: Vec<WorkItem>,
    pub failed: Vec<(WorkItem, FailureReason)>,
}

impl Acceptance {
    /// Newest date among accepted posts, ignoring undated ones
    pub fn newest_date(&self) -> Option<&DateKey> {
        self.accepted
            .iter()
            .map(|(_, post)| &post.date)
            .filter(|date| !date.is_sentinel())
            .max()
    }
}

/// Sorts fetch outcomes and applies the continuous-mode watermark
///
/// In continuous mode a success is kept only if its date is strictly newer
/// than `state.latest_processed_date`; with no watermark everything is kept.
/// Undated posts carry the sentinel and so never pass an existing watermark.
pub fn accept(
    results: Vec<(WorkItem, FetchOutcome)>,
    state: &ScrapeState,
    mode: RunMode,
) -> Acceptance {
    let watermark = match mode {
        RunMode::Continuous => state.latest_processed_date.as_ref(),
        RunMode::Full => None,
    };

    let mut acceptance = Acceptance::default();
    for (item, outcome) in results {
        match outcome {
            FetchOutcome::Success(post) => match watermark {
                Some(mark) if post.date <= *mark => {
                    tracing::debug!(
                        slug = %item.slug,
                        "Dropping post dated {} (not newer than {})",
                        post.date,
                        mark
                    );
                    acceptance.stale.push((item, post.date));
                }
                _ => acceptance.accepted.push((item, post)),
            },
            FetchOutcome::SkippedPaywalled => acceptance.skipped_paywalled.push(item),
            FetchOutcome::SkippedAlreadyPresent => acceptance.skipped_present.push(item),
            FetchOutcome::Failed { reason } => acceptance.failed.push((item, reason)),
        }
    }
    acceptance
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn post(date: &str) -> ExtractedPost {
        ExtractedPost {
            title: "T".to_string(),
            subtitle: String::new(),
            raw_date: date.to_string(),
            date: DateKey::parse(date).unwrap_or_else(DateKey::sentinel),
            like_count: "0".to_string(),
            content_html: "<p>x</p>".to_string(),
        }
    }

    fn inventory_with(files: &[&str]) -> (TempDir, ArtifactInventory) {
        let dir = TempDir::new().unwrap();
        for name in files {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let inventory = ArtifactInventory::scan(dir.path());
        (dir, inventory)
    }

    #[test]
    fn test_full_mode_skips_inventory_slugs() {
        let (_dir, inventory) = inventory_with(&["20240102-b.md"]);
        let candidates = urls(&["https://x.com/p/a", "https://x.com/p/b", "https://x.com/p/c"]);

        let items = filter(&candidates, &ScrapeState::new(), &inventory, RunMode::Full);

        let slugs: Vec<_> = items.iter().map(|i| i.slug.as_str()).collect();
        assert_eq!(slugs, vec!["a", "c"]);
    }

    #[test]
    fn test_full_mode_skips_legacy_files() {
        let (_dir, inventory) = inventory_with(&["a.md"]);
        let candidates = urls(&["https://x.com/p/a", "https://x.com/p/b"]);

        let items = filter(&candidates, &ScrapeState::new(), &inventory, RunMode::Full);

        assert_eq!(items, vec![WorkItem::new("https://x.com/p/b")]);
    }

    #[test]
    fn test_full_mode_ignores_state() {
        let (_dir, inventory) = inventory_with(&[]);
        let mut state = ScrapeState::new();
        state.record("https://x.com/p/a", &DateKey::parse("20240101").unwrap());

        let items = filter(&urls(&["https://x.com/p/a"]), &state, &inventory, RunMode::Full);
        assert_eq!(items.len(), 1);

        let items = filter(
            &urls(&["https://x.com/p/a"]),
            &state,
            &inventory,
            RunMode::Continuous,
        );
        assert!(items.is_empty());
    }

    #[test]
    fn test_continuous_mode_matches_slug_across_hosts() {
        let (_dir, inventory) = inventory_with(&[]);
        let mut state = ScrapeState::new();
        state.record("https://old.example.com/p/a", &DateKey::sentinel());

        let items = filter(
            &urls(&["https://x.com/p/a"]),
            &state,
            &inventory,
            RunMode::Continuous,
        );
        assert!(items.is_empty());
    }

    #[test]
    fn test_duplicate_slugs_collapse() {
        let (_dir, inventory) = inventory_with(&[]);
        let candidates = urls(&["https://x.com/p/a", "https://x.com/p/a/", "https://x.com/p/b"]);

        let items = filter(&candidates, &ScrapeState::new(), &inventory, RunMode::Full);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://x.com/p/a");
    }

    #[test]
    fn test_accept_drops_posts_not_newer_than_watermark() {
        let mut state = ScrapeState::new();
        state.record("https://x.com/p/old", &DateKey::parse("20240101").unwrap());

        let results = vec![
            (WorkItem::new("https://x.com/p/a"), FetchOutcome::Success(post("20231215"))),
            (WorkItem::new("https://x.com/p/b"), FetchOutcome::Success(post("20240101"))),
            (WorkItem::new("https://x.com/p/c"), FetchOutcome::Success(post("20240102"))),
            (WorkItem::new("https://x.com/p/d"), FetchOutcome::Success(post("unknown"))),
        ];

        let acceptance = accept(results, &state, RunMode::Continuous);

        assert_eq!(acceptance.accepted.len(), 1);
        assert_eq!(acceptance.accepted[0].0.slug, "c");
        assert_eq!(acceptance.stale.len(), 3);
    }

    #[test]
    fn test_accept_without_watermark_keeps_everything() {
        let results = vec![
            (WorkItem::new("https://x.com/p/a"), FetchOutcome::Success(post("20231215"))),
            (WorkItem::new("https://x.com/p/b"), FetchOutcome::Success(post("unknown"))),
        ];

        let acceptance = accept(results, &ScrapeState::new(), RunMode::Continuous);

        assert_eq!(acceptance.accepted.len(), 2);
        assert_eq!(acceptance.newest_date(), DateKey::parse("20231215").as_ref());
    }

    #[test]
    fn test_accept_full_mode_ignores_watermark() {
        let mut state = ScrapeState::new();
        state.record("https://x.com/p/old", &DateKey::parse("20240101").unwrap());
        let results = vec![(
            WorkItem::new("https://x.com/p/a"),
            FetchOutcome::Success(post("20231215")),
        )];

        let acceptance = accept(results, &state, RunMode::Full);
        assert_eq!(acceptance.accepted.len(), 1);
    }

    #[test]
    fn test_accept_sorts_non_success() {
        let results = vec![
            (WorkItem::new("https://x.com/p/a"), FetchOutcome::SkippedPaywalled),
            (WorkItem::new("https://x.com/p/b"), FetchOutcome::SkippedAlreadyPresent),
            (
                WorkItem::new("https://x.com/p/c"),
                FetchOutcome::Failed {
                    reason: FailureReason::SessionLost,
                },
            ),
        ];

        let acceptance = accept(results, &ScrapeState::new(), RunMode::Continuous);

        assert_eq!(acceptance.skipped_paywalled.len(), 1);
        assert_eq!(acceptance.skipped_present.len(), 1);
        assert_eq!(acceptance.failed[0].1, FailureReason::SessionLost);
        assert!(acceptance.accepted.is_empty());
    }
}
