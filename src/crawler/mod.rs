//! Crawler module for harvesting publication posts
//!
//! This module contains the core harvesting logic, including:
//! - Work-list construction and watermark acceptance (`dedup`)
//! - Post extraction from rendered pages (`parser`)
//! - Per-item fetching with session-loss retry (`fetcher`, `retry`)
//! - Bounded-concurrency scheduling (`scheduler`)
//! - Overall run coordination (`coordinator`)

mod coordinator;
pub mod dedup;
mod fetcher;
mod parser;
mod retry;
mod scheduler;

pub use coordinator::Coordinator;
pub use dedup::{accept, filter, Acceptance, RunMode, WorkItem};
pub use fetcher::FetchWorker;
pub use parser::{normalize_date, normalize_date_at, Extractor, PostExtractor, DATE_NOT_FOUND};
pub use retry::RetryPolicy;
pub use scheduler::Scheduler;
