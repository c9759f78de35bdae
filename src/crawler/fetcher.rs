//! Per-item fetch worker
//!
//! This module turns one work item into exactly one [`FetchOutcome`]:
//! - Skipping items whose artifact appeared on disk since the run started
//! - Rendering the post in a borrowed browser session
//! - Resolving paywalls through the auth protocol
//! - Extracting the post fields
//! - Retrying once, after a backoff, when the browser session is lost
//!
//! Nothing escapes this boundary: every error becomes a `Failed` outcome.

use super::dedup::WorkItem;
use super::parser::Extractor;
use super::retry::RetryPolicy;
use crate::auth::paywall::{resolve_access, AccessVerdict};
use crate::session::SessionManager;
use crate::state::{FailureReason, FetchOutcome};
use crate::storage::artifact_exists;
use crate::SessionError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Fetches and extracts single posts
#[derive(Clone)]
pub struct FetchWorker {
    extractor: Arc<dyn Extractor>,
    settle: Duration,
    retry: RetryPolicy,
}

impl FetchWorker {
    /// Creates a new worker
    ///
    /// # Arguments
    ///
    /// * `extractor` - Pulls post fields out of rendered HTML
    /// * `settle` - Wait after navigation for client-side rendering
    /// * `retry` - Backoff applied after a lost session
    pub fn new(extractor: Arc<dyn Extractor>, settle: Duration, retry: RetryPolicy) -> Self {
        Self {
            extractor,
            settle,
            retry,
        }
    }

    /// Fetches one item using the given session
    ///
    /// # Fetch Flow
    ///
    /// 1. If an artifact for the slug already exists in `artifact_dir`, skip
    /// 2. Make the session healthy, navigate, and wait for rendering
    /// 3. Resolve paywall access; an unbypassable gate is a skip
    /// 4. Extract the post
    ///
    /// A lost session is retried once (the session is rebuilt by the next
    /// health check). A second loss, or any timeout, fails the item.
    pub async fn fetch(
        &self,
        item: &WorkItem,
        artifact_dir: &Path,
        session: &mut SessionManager,
    ) -> FetchOutcome {
        if artifact_exists(artifact_dir, &item.slug) {
            tracing::debug!(slug = %item.slug, "Artifact appeared since run start, skipping");
            return FetchOutcome::SkippedAlreadyPresent;
        }

        let mut retries = 0;
        loop {
            match self.attempt(item, session).await {
                Ok(outcome) => return outcome,
                Err(e) if e.is_connection_lost() && self.retry.should_retry(retries) => {
                    retries += 1;
                    let delay = self.retry.delay_for(retries);
                    tracing::warn!(
                        url = %item.url,
                        "Session lost ({}), retrying in {:?}",
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(url = %item.url, "Fetch failed: {}", e);
                    return FetchOutcome::Failed {
                        reason: failure_reason(&e),
                    };
                }
            }
        }
    }

    async fn attempt(
        &self,
        item: &WorkItem,
        session: &mut SessionManager,
    ) -> Result<FetchOutcome, SessionError> {
        let mut handle = session.ensure_healthy().await?;
        handle.navigate(&item.url).await?;
        handle.settle(self.settle).await;

        let page = match resolve_access(&mut handle, &item.url, self.settle).await? {
            AccessVerdict::Unbypassable { .. } => return Ok(FetchOutcome::SkippedPaywalled),
            AccessVerdict::Open { trail, page } => {
                tracing::debug!(url = %item.url, ?trail, "Post readable");
                page
            }
        };

        match self.extractor.extract(&item.url, &page.html) {
            Ok(post) => {
                tracing::info!(url = %item.url, date = %post.date, "Extracted \"{}\"", post.title);
                Ok(FetchOutcome::Success(post))
            }
            Err(e) => {
                tracing::warn!(url = %item.url, "Extraction failed: {}", e);
                Ok(FetchOutcome::Failed {
                    reason: FailureReason::Extraction(e.to_string()),
                })
            }
        }
    }
}

fn failure_reason(error: &SessionError) -> FailureReason {
    match error {
        SessionError::Disconnected(_) | SessionError::Unrecoverable { .. } => {
            FailureReason::SessionLost
        }
        SessionError::Timeout { operation, .. } => FailureReason::Timeout {
            operation: operation.to_string(),
        },
        SessionError::Navigation(msg) => FailureReason::Navigation(msg.clone()),
        other => FailureReason::Other(other.to_string()),
    }
}
