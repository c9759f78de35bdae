//! Harvest coordinator - per-publication orchestration
//!
//! This module contains the run sequence that ties every component together:
//! - Loading the publication's state and artifact inventory
//! - Discovering candidates and building the work list
//! - Fanning fetches out over the session pool under a concurrency bound
//! - Applying the continuous-mode watermark to the outcomes
//! - Writing artifacts, committing state and appending aggregated results
//! - Repeating the whole harvest on an interval until cancelled

use super::dedup::{self, RunMode, WorkItem};
use super::fetcher::FetchWorker;
use super::parser::{Extractor, PostExtractor};
use super::retry::RetryPolicy;
use super::scheduler::Scheduler;
use crate::auth::Authenticator;
use crate::config::Config;
use crate::discovery::{build_http_client, discover};
use crate::output::{print_summary, FileOutputHandler, OutputHandler, RunSummary};
use crate::session::{BrowserLauncher, SessionPool};
use crate::state::{FailureReason, FetchOutcome};
use crate::storage::{ArtifactInventory, JsonStateStore, StateStore};
use crate::url::{publication_name, publication_root};
use crate::HarvestError;
use reqwest::Client;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Main harvest coordinator structure
///
/// One coordinator, and so one session pool, lives for the whole process and
/// is reused by every publication and every interval iteration.
pub struct Coordinator {
    config: Arc<Config>,
    client: Client,
    pool: Arc<SessionPool>,
    scheduler: Scheduler,
    worker: FetchWorker,
}

impl Coordinator {
    /// Creates a new coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `pool` - Browser sessions used for fetching
    /// * `extractor` - Pulls post fields out of rendered pages
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(HarvestError)` - The discovery HTTP client could not be built
    pub fn new(
        config: Config,
        pool: SessionPool,
        extractor: Arc<dyn Extractor>,
    ) -> Result<Self, HarvestError> {
        let client = build_http_client(
            Duration::from_secs(config.discovery.timeout_secs),
            config.session.user_agent.as_deref(),
        )?;
        let scheduler = Scheduler::from_config(&config.harvest);
        let worker = FetchWorker::new(
            extractor,
            Duration::from_millis(config.session.settle_delay_ms),
            RetryPolicy::default(),
        );

        Ok(Self {
            config: Arc::new(config),
            client,
            pool: Arc::new(pool),
            scheduler,
            worker,
        })
    }

    /// Creates a coordinator with a session pool built from the configuration
    pub fn from_config(
        config: Config,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> Result<Self, HarvestError> {
        let settle = Duration::from_millis(config.session.settle_delay_ms);
        let authenticator = Arc::new(Authenticator::from_config(&config.auth, settle));
        let pool = SessionPool::from_config(&config.session, launcher, authenticator);
        Self::new(config, pool, Arc::new(PostExtractor))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The session pool, for logging in before the first run
    pub fn pool(&self) -> &SessionPool {
        &self.pool
    }

    /// Harvests one publication
    ///
    /// # Run Flow
    ///
    /// 1. Load the state file and scan existing artifacts
    /// 2. Discover candidates and filter them into work items (capped at `max-items`)
    /// 3. Fetch every item through the session pool
    /// 4. Sort outcomes, dropping successes not newer than the watermark in continuous mode
    /// 5. Write artifacts and record each written post in the state
    /// 6. Commit the state (continuous mode only)
    /// 7. Merge the new records into the aggregated results file
    ///
    /// Per-item problems end up in the summary; only an unusable publication
    /// URL is an error.
    pub async fn run_publication(&self, root: &str) -> Result<RunSummary, HarvestError> {
        let started = Instant::now();
        let root = publication_root(root);
        let name = publication_name(root)?;
        let mode = RunMode::from_continuous(self.config.harvest.continuous);
        tracing::info!(publication = %name, ?mode, "Starting harvest of {}", root);

        let output = FileOutputHandler::for_publication(&self.config.output, &name);
        let store = JsonStateStore::in_dir(output.markdown_dir());
        let mut state = store.load();
        let inventory = ArtifactInventory::scan(output.markdown_dir());

        let candidates = discover(
            &self.client,
            root,
            &self.config.discovery,
            &self.config.harvest.exclude_keywords,
        )
        .await;
        let mut items = dedup::filter(&candidates, &state, &inventory, mode);
        let max_items = self.config.harvest.max_items;
        if max_items > 0 && items.len() > max_items {
            tracing::info!("Limiting run to {} of {} new posts", max_items, items.len());
            items.truncate(max_items);
        }

        let mut summary = RunSummary::new(&name);
        summary.candidates = candidates.len();
        summary.queued = items.len();
        tracing::info!(
            publication = %name,
            "{} candidate(s), {} queued for fetching",
            summary.candidates,
            summary.queued
        );

        let results = self
            .fetch_all(items, output.markdown_dir().to_path_buf())
            .await;
        let acceptance = dedup::accept(results, &state, mode);
        summary.record_acceptance(&acceptance);

        let mut records = Vec::with_capacity(acceptance.accepted.len());
        for (item, post) in &acceptance.accepted {
            match output.write_post(item, post) {
                Ok(record) => {
                    state.record(&item.url, &post.date);
                    records.push(record);
                }
                Err(e) => {
                    tracing::error!(url = %item.url, "Failed to write artifacts: {}", e);
                    summary.record_failure(&item.url, FailureReason::Output(e.to_string()).to_string());
                }
            }
        }
        summary.accepted = records.len();

        if mode.is_continuous() {
            state.touch();
            match store.commit(&state) {
                Ok(()) => summary.state_committed = true,
                Err(e) => {
                    // Artifacts are on disk; the inventory recovers them next run
                    tracing::error!(publication = %name, "Failed to commit state: {}", e);
                }
            }
        }

        if !records.is_empty() {
            if let Err(e) = output.append_results(&records) {
                tracing::error!(publication = %name, "Failed to update results file: {}", e);
            }
        }

        summary.duration = started.elapsed();
        tracing::info!(
            publication = %name,
            accepted = summary.accepted,
            failed = summary.failed,
            "Harvest finished in {:?}, watermark {}",
            summary.duration,
            state
                .latest_processed_date
                .as_ref()
                .map(|d| d.as_str())
                .unwrap_or("none")
        );
        Ok(summary)
    }

    /// Harvests every configured publication once
    ///
    /// A publication that fails is logged and skipped; the rest still run.
    pub async fn run_all(&self) -> Vec<RunSummary> {
        let mut summaries = Vec::with_capacity(self.config.publications.len());
        for root in &self.config.publications {
            match self.run_publication(root).await {
                Ok(summary) => {
                    print_summary(&summary);
                    summaries.push(summary);
                }
                Err(e) => tracing::error!("Harvest of {} failed: {}", root, e),
            }
        }
        summaries
    }

    /// Runs [`run_all`](Self::run_all) once, or repeatedly when an interval is set
    ///
    /// Each iteration is followed by a sleep for the remainder of the
    /// interval. A shutdown signal is only observed between iterations: an
    /// iteration in flight always completes, a pending sleep ends at once.
    pub async fn run_forever(&self, mut shutdown: watch::Receiver<bool>) {
        let interval = Duration::from_secs(self.config.harvest.interval_minutes * 60);
        let mut iteration = 0u64;

        loop {
            iteration += 1;
            let started = Instant::now();
            tracing::info!(iteration, "Starting harvest iteration");
            self.run_all().await;

            if interval.is_zero() {
                break;
            }
            if *shutdown.borrow() {
                tracing::info!("Shutdown requested, not starting another iteration");
                break;
            }

            let remaining = interval.saturating_sub(started.elapsed());
            tracing::info!("Next iteration in {:?}", remaining);
            if wait_or_cancel(remaining, &mut shutdown).await {
                tracing::info!("Shutdown requested during interval sleep");
                break;
            }
        }
    }

    /// Closes every browser session
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }

    /// Fetches every item and pairs it with its outcome, in completion order
    async fn fetch_all(
        &self,
        items: Vec<WorkItem>,
        artifact_dir: PathBuf,
    ) -> Vec<(WorkItem, FetchOutcome)> {
        let submitted = items.clone();
        let pool = Arc::clone(&self.pool);
        let worker = self.worker.clone();
        let artifact_dir = Arc::new(artifact_dir);

        let joined = self
            .scheduler
            .run_all(items, move |item: WorkItem| {
                let pool = Arc::clone(&pool);
                let worker = worker.clone();
                let artifact_dir = Arc::clone(&artifact_dir);
                async move {
                    let outcome = match pool.checkout().await {
                        Ok(mut lease) => worker.fetch(&item, &artifact_dir, &mut lease).await,
                        Err(e) => FetchOutcome::Failed {
                            reason: FailureReason::Other(e.to_string()),
                        },
                    };
                    (item, outcome)
                }
            })
            .await;

        let mut results: Vec<(WorkItem, FetchOutcome)> =
            joined.into_iter().filter_map(Result::ok).collect();

        // A panicked task loses its item; recover it from the submitted list
        if results.len() < submitted.len() {
            let finished: HashSet<String> =
                results.iter().map(|(item, _)| item.slug.clone()).collect();
            for item in submitted {
                if !finished.contains(&item.slug) {
                    results.push((
                        item,
                        FetchOutcome::Failed {
                            reason: FailureReason::Other("worker task panicked".to_string()),
                        },
                    ));
                }
            }
        }
        results
    }
}

/// Sleeps for `remaining`, returning true early if shutdown is signalled
async fn wait_or_cancel(remaining: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let deadline = tokio::time::Instant::now() + remaining;
    let signalled = match tokio::time::timeout(remaining, shutdown.wait_for(|stop| *stop)).await {
        Ok(Ok(_)) => Some(true),
        Ok(Err(_)) => None,
        Err(_) => Some(false),
    };
    match signalled {
        Some(cancelled) => cancelled,
        None => {
            // Nobody can signal any more; sit out the interval
            tokio::time::sleep_until(deadline).await;
            false
        }
    }
}
