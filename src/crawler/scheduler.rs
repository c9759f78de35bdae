//! Bounded-concurrency task runner
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - A randomized delay before each task, inside its permit, to bound the request rate
//! - Collecting results in completion order

use crate::config::HarvestConfig;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

/// Runs a batch of tasks with at most `max_concurrent` in flight
#[derive(Debug, Clone)]
pub struct Scheduler {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    delay_min: f64,
    delay_max: f64,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `max_concurrent` - Upper bound on tasks running at once (at least 1)
    /// * `delay_min` / `delay_max` - Range of the per-task delay, in seconds
    pub fn new(max_concurrent: usize, delay_min: f64, delay_max: f64) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            delay_min: delay_min.max(0.0),
            delay_max: delay_max.max(delay_min).max(0.0),
        }
    }

    pub fn from_config(config: &HarvestConfig) -> Self {
        Self::new(config.max_concurrent, config.delay_min, config.delay_max)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Picks the delay applied before the next task
    pub fn next_delay(&self) -> Duration {
        if self.delay_max <= self.delay_min {
            return Duration::from_secs_f64(self.delay_min);
        }
        let secs = rand::thread_rng().gen_range(self.delay_min..=self.delay_max);
        Duration::from_secs_f64(secs)
    }

    /// Runs `task` once per item and returns every result
    ///
    /// Results come back in completion order, not submission order. A task
    /// that panics is reported as a `JoinError` and does not affect the others.
    pub async fn run_all<T, R, F, Fut>(&self, items: Vec<T>, task: F) -> Vec<Result<R, JoinError>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let task = Arc::new(task);
        let mut set = JoinSet::new();

        for item in items {
            let semaphore = Arc::clone(&self.semaphore);
            let task = Arc::clone(&task);
            let delay = self.next_delay();
            set.spawn(async move {
                // The semaphore is never closed while a batch runs
                let _permit = semaphore.acquire_owned().await.ok();
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                task(item).await
            });
        }

        let mut results = Vec::new();
        while let Some(result) = set.join_next().await {
            if let Err(e) = &result {
                tracing::error!("Worker task failed: {}", e);
            }
            results.push(result);
        }
        results
    }
}
